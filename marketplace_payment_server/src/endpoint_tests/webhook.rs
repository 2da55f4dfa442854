use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, App};
use chrono::{Duration, Utc};
use marketplace_payment_engine::{helpers::sign_payload, ClaimOutcome, ReconcilerApi};
use mpg_common::Secret;

use crate::{
    config::WebhookConfig,
    endpoint_tests::mocks::{test_company, MockBackend},
    routes::{payment_webhook, SIGNATURE_HEADER, TIMESTAMP_HEADER},
};

const SECRET: &str = "whsec_test_0001";

fn webhook_config() -> WebhookConfig {
    WebhookConfig { secret: Secret::new(SECRET.to_string()), tolerance: Duration::minutes(5) }
}

fn subscription_checkout_body() -> String {
    format!(
        r#"{{"id":"evt_100","type":"checkout.session.completed","created":{},"data":{{"object":{{"customer":"cus_1","subscription":"sub_1","metadata":{{"type":"SUBSCRIPTION","companyId":"42"}}}}}}}}"#,
        Utc::now().timestamp()
    )
}

fn signed_headers(body: &str) -> Vec<(&'static str, String)> {
    let timestamp = Utc::now().timestamp().to_string();
    let signature = sign_payload(SECRET, &timestamp, body.as_bytes());
    vec![(SIGNATURE_HEADER, signature), (TIMESTAMP_HEADER, timestamp)]
}

/// Runs the webhook route against a mocked backend and returns (status, body).
async fn post_event(backend: MockBackend, body: &str, headers: Vec<(&'static str, String)>) -> (StatusCode, String) {
    let _ = env_logger::try_init().ok();
    let api = ReconcilerApi::new(backend, Duration::minutes(5));
    let app = App::new()
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(webhook_config()))
        .route("/webhook/payments", web::post().to(payment_webhook::<MockBackend>));
    let service = test::init_service(app).await;
    let mut req = TestRequest::post().uri("/webhook/payments").set_payload(body.to_string());
    for (name, value) in headers {
        req = req.insert_header((name, value));
    }
    let res = test::call_service(&service, req.to_request()).await;
    let (_, res) = res.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}

#[actix_web::test]
async fn missing_headers_are_rejected() {
    // No expectations set: any call on the backend fails the test.
    let backend = MockBackend::new();
    let (status, body) = post_event(backend, &subscription_checkout_body(), vec![]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Missing required header"), "unexpected body: {body}");
}

#[actix_web::test]
async fn tampered_body_is_rejected_before_touching_the_backend() {
    let backend = MockBackend::new();
    let body = subscription_checkout_body();
    let headers = signed_headers(&body);
    let tampered = body.replace("\"companyId\":\"42\"", "\"companyId\":\"43\"");
    let (status, body) = post_event(backend, &tampered, headers).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Webhook verification failed"), "unexpected body: {body}");
}

#[actix_web::test]
async fn stale_timestamp_is_rejected() {
    let backend = MockBackend::new();
    let body = subscription_checkout_body();
    let timestamp = (Utc::now() - Duration::hours(1)).timestamp().to_string();
    let signature = sign_payload(SECRET, &timestamp, body.as_bytes());
    let headers = vec![(SIGNATURE_HEADER, signature), (TIMESTAMP_HEADER, timestamp)];
    let (status, _) = post_event(backend, &body, headers).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn valid_subscription_checkout_is_applied() {
    let mut backend = MockBackend::new();
    backend.expect_try_claim().returning(|_, _| Ok(ClaimOutcome::Claimed));
    backend.expect_fetch_company().returning(|id| Ok(Some(test_company(id))));
    backend.expect_update_company_subscription().returning(|_, _, _| Ok(true));
    backend.expect_commit().times(1).returning(|_| Ok(()));
    let body = subscription_checkout_body();
    let headers = signed_headers(&body);
    let (status, body) = post_event(backend, &body, headers).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Event applied."), "unexpected body: {body}");
}

#[actix_web::test]
async fn duplicate_delivery_is_acknowledged() {
    let mut backend = MockBackend::new();
    backend.expect_try_claim().returning(|_, _| Ok(ClaimOutcome::AlreadyProcessed));
    let body = subscription_checkout_body();
    let headers = signed_headers(&body);
    let (status, body) = post_event(backend, &body, headers).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Event already processed."), "unexpected body: {body}");
}

#[actix_web::test]
async fn unknown_checkout_type_is_acknowledged_with_a_failure_body() {
    let backend = MockBackend::new();
    let body = format!(
        r#"{{"id":"evt_101","type":"checkout.session.completed","created":{},"data":{{"object":{{"metadata":{{"type":"GIFT_CARD"}}}}}}}}"#,
        Utc::now().timestamp()
    );
    let headers = signed_headers(&body);
    let (status, body) = post_event(backend, &body, headers).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#""success":false"#), "unexpected body: {body}");
}

#[actix_web::test]
async fn backend_failure_yields_a_retryable_status() {
    use marketplace_payment_engine::StoreError;
    let mut backend = MockBackend::new();
    backend.expect_try_claim().returning(|_, _| Ok(ClaimOutcome::Claimed));
    backend.expect_fetch_company().returning(|_| Err(StoreError::DatabaseError("disk I/O error".to_string())));
    backend.expect_release().times(1).returning(|_| Ok(()));
    let body = subscription_checkout_body();
    let headers = signed_headers(&body);
    let (status, _) = post_event(backend, &body, headers).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
