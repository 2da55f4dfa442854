use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, App};
use chrono::Duration;
use marketplace_payment_engine::{db_types::SubscriptionStatus, ReconcilerApi};

use crate::{
    endpoint_tests::mocks::{test_company, MockBackend},
    routes::subscription_status,
};

async fn get_subscription(backend: MockBackend, company_id: i64) -> (StatusCode, String) {
    let _ = env_logger::try_init().ok();
    let api = ReconcilerApi::new(backend, Duration::minutes(5));
    let app = App::new()
        .app_data(web::Data::new(api))
        .route("/api/subscription/{company_id}", web::get().to(subscription_status::<MockBackend>));
    let service = test::init_service(app).await;
    let req = TestRequest::get().uri(&format!("/api/subscription/{company_id}")).to_request();
    let res = test::call_service(&service, req).await;
    let (_, res) = res.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}

#[actix_web::test]
async fn subscription_status_for_a_known_company() {
    let mut backend = MockBackend::new();
    backend.expect_fetch_company().returning(|id| {
        let mut company = test_company(id);
        company.subscription_status = SubscriptionStatus::Active;
        Ok(Some(company))
    });
    let (status, body) = get_subscription(backend, 42).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""company_id":42"#), "unexpected body: {body}");
    assert!(body.contains(r#""status":"Active""#), "unexpected body: {body}");
}

#[actix_web::test]
async fn subscription_status_for_an_unknown_company_is_a_404() {
    let mut backend = MockBackend::new();
    backend.expect_fetch_company().returning(|_| Ok(None));
    let (status, body) = get_subscription(backend, 999).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Company 999 not found."), "unexpected body: {body}");
}
