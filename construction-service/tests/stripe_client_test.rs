//! Stripe REST client against a mock Stripe API.

use construction_service::{
    config::StripeConfig,
    models::Plan,
    services::stripe::{CheckoutParams, StripeClient, StripeError},
};
use secrecy::Secret;
use service_core::error::AppError;
use uuid::Uuid;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(api_base: &str, secret_key: &str) -> StripeClient {
    StripeClient::new(StripeConfig {
        secret_key: Secret::new(secret_key.to_string()),
        webhook_secret: Secret::new("whsec_test".to_string()),
        price_starter: Some("price_starter".to_string()),
        price_pro: Some("price_pro".to_string()),
        api_base: api_base.to_string(),
    })
}

#[tokio::test]
async fn create_customer_sends_company_metadata() {
    let server = MockServer::start().await;
    let company_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/customers"))
        .and(header("authorization", "Bearer sk_test_123"))
        .and(body_string_contains("name=Acme+Builders"))
        .and(body_string_contains(&company_id.to_string()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "cus_123" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let customer = client(&server.uri(), "sk_test_123")
        .create_customer("Acme Builders", company_id)
        .await
        .unwrap();

    assert_eq!(customer.id, "cus_123");
}

#[tokio::test]
async fn checkout_session_uses_subscription_mode() {
    let server = MockServer::start().await;
    let company_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/checkout/sessions"))
        .and(body_string_contains("mode=subscription"))
        .and(body_string_contains("price_pro"))
        .and(body_string_contains("PRO"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "cs_test_1",
            "url": "https://checkout.stripe.com/c/pay/cs_test_1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let stripe = client(&server.uri(), "sk_test_123");
    let price_id = stripe.price_for(Plan::Pro).unwrap().to_string();
    let session = stripe
        .create_checkout_session(&CheckoutParams {
            customer_id: "cus_123",
            price_id: &price_id,
            success_url: "http://localhost:3000/billing/success",
            cancel_url: "http://localhost:3000/billing/cancel",
            company_id,
            plan: Plan::Pro,
        })
        .await
        .unwrap();

    assert_eq!(session.id, "cs_test_1");
    assert_eq!(
        session.url.as_deref(),
        Some("https://checkout.stripe.com/c/pay/cs_test_1")
    );
}

#[tokio::test]
async fn retrieve_subscription_returns_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/sub_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "sub_1",
            "status": "past_due"
        })))
        .mount(&server)
        .await;

    let subscription = client(&server.uri(), "sk_test_123")
        .retrieve_subscription("sub_1")
        .await
        .unwrap();

    assert_eq!(subscription.id, "sub_1");
    assert_eq!(subscription.status, "past_due");
}

#[tokio::test]
async fn api_error_maps_to_bad_gateway() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(402).set_body_json(serde_json::json!({
            "error": { "message": "Your card was declined." }
        })))
        .mount(&server)
        .await;

    let err = client(&server.uri(), "sk_test_123")
        .create_customer("Acme Builders", Uuid::new_v4())
        .await
        .unwrap_err();

    match &err {
        StripeError::Api { status, message } => {
            assert_eq!(*status, 402);
            assert_eq!(message, "Your card was declined.");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(matches!(AppError::from(err), AppError::BadGateway(_)));
}

#[tokio::test]
async fn unconfigured_client_never_calls_stripe() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let stripe = client(&server.uri(), "");
    assert!(!stripe.is_configured());

    let err = stripe
        .create_customer("Acme Builders", Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, StripeError::NotConfigured));
}
