use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use marketplace_payment_engine::{ReconcilerApi, SqliteDatabase};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    routes::{health, payment_webhook, subscription_status},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let api = ReconcilerApi::new(db.clone(), config.ledger_lease);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("mpg::access_log"))
            .app_data(web::Data::new(api))
            .app_data(web::Data::new(config.webhook.clone()))
            .service(health)
            .route("/webhook/payments", web::post().to(payment_webhook::<SqliteDatabase>))
            .service(
                web::scope("/api")
                    .route("/subscription/{company_id}", web::get().to(subscription_status::<SqliteDatabase>)),
            )
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
