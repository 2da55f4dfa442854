//! Route handlers for the payment server.
//!
//! The webhook handler is deliberately generic over the backend so that the endpoint tests can
//! drive it with a mocked store and ledger. `server.rs` instantiates it with `SqliteDatabase`.

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use bytes::Bytes;
use chrono::Utc;
use log::*;
use marketplace_payment_engine::{
    helpers::{verify_event, VerificationError},
    EventLedger,
    EventOutcome,
    MarketplaceStore,
    ReconcilerApi,
};

use crate::{
    config::WebhookConfig,
    data_objects::{JsonResponse, SubscriptionStatusResponse},
    errors::ServerError,
};

pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";
pub const TIMESTAMP_HEADER: &str = "X-Webhook-Timestamp";

#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

/// POST /webhook/payments
///
/// Verifies the delivery's signature and timestamp against the raw body, then hands the decoded
/// event to the reconciliation engine. Responses are chosen for the provider's retry loop:
/// anything the provider could fix by retrying gets a 5xx, a bad signature gets a 400, and
/// everything else (applied, duplicate, ignored, or permanently unprocessable) gets a 200 so
/// the provider stops redelivering.
pub async fn payment_webhook<B>(
    req: HttpRequest,
    body: Bytes,
    api: web::Data<ReconcilerApi<B>>,
    config: web::Data<WebhookConfig>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceStore + EventLedger,
{
    trace!("💳️ Received webhook request: {}", req.uri());
    let signature = header_str(&req, SIGNATURE_HEADER)?;
    let timestamp = header_str(&req, TIMESTAMP_HEADER)?;
    let event =
        match verify_event(&body, signature, timestamp, config.secret.reveal(), config.tolerance, Utc::now()) {
            Ok(event) => event,
            Err(VerificationError::DecodeError(e)) => {
                // Authentic but undecodable. Redelivery will not fix it, so acknowledge.
                warn!("💳️ Verified event could not be decoded. {e}");
                return Ok(HttpResponse::Ok().json(JsonResponse::failure(e)));
            },
            Err(e) => {
                warn!("💳️ Rejecting webhook delivery. {e}");
                return Err(ServerError::VerificationFailed(e.to_string()));
            },
        };
    let event_id = event.id.clone();
    debug!("💳️ Verified event {event_id} ({})", event.kind.family());
    let result = match api.process_event(event).await {
        Ok(EventOutcome::Applied) => {
            info!("💳️ Event {event_id} applied.");
            JsonResponse::success("Event applied.")
        },
        Ok(EventOutcome::Duplicate) => {
            info!("💳️ Event {event_id} is a duplicate delivery.");
            JsonResponse::success("Event already processed.")
        },
        Ok(EventOutcome::Ignored) => {
            debug!("💳️ Event {event_id} acknowledged without changes.");
            JsonResponse::success("Event acknowledged.")
        },
        Err(e) if e.is_retryable() => {
            error!("💳️ Could not process event {event_id}. {e}");
            return Err(ServerError::BackendError(e.to_string()));
        },
        Err(e) => {
            // References an entity we do not have. A retry would hit the same wall, so answer
            // 200 with a failure body and let the provider close the delivery out.
            warn!("💳️ Event {event_id} is permanently unprocessable. {e}");
            JsonResponse::failure(e)
        },
    };
    Ok(HttpResponse::Ok().json(result))
}

/// GET /api/subscription/{company_id}
pub async fn subscription_status<B>(
    path: web::Path<i64>,
    api: web::Data<ReconcilerApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceStore + EventLedger,
{
    let company_id = path.into_inner();
    debug!("🏢️ GET subscription status for company {company_id}");
    let company = api
        .db()
        .fetch_company(company_id)
        .await
        .map_err(|e| ServerError::BackendError(e.to_string()))?;
    match company {
        Some(company) => Ok(HttpResponse::Ok().json(SubscriptionStatusResponse::from(&company))),
        None => Ok(HttpResponse::NotFound().json(JsonResponse::failure(format!("Company {company_id} not found.")))),
    }
}

fn header_str<'a>(req: &'a HttpRequest, name: &'static str) -> Result<&'a str, ServerError> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(ServerError::MissingHeader(name))
}
