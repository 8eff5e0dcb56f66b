//! Stripe client: customers, checkout sessions, subscriptions and webhook
//! verification.
//!
//! Stripe's API takes form-encoded bodies and bearer auth with the secret key.
//! Webhooks are signed as `Stripe-Signature: t=<unix>,v1=<hex hmac>` over
//! `"{t}.{raw body}"`.

use crate::config::StripeConfig;
use crate::models::{
    Plan, SubscriptionUpdate, SUBSCRIPTION_ACTIVE, SUBSCRIPTION_CANCELED, SUBSCRIPTION_PAST_DUE,
};
use chrono::Utc;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use service_core::error::AppError;
use service_core::utils::verify_payload;
use thiserror::Error;
use uuid::Uuid;

/// Maximum age of a webhook signature timestamp.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error)]
pub enum StripeError {
    #[error("Stripe is not configured. Please set STRIPE_SECRET_KEY in environment variables.")]
    NotConfigured,

    #[error("Missing webhook signature or secret")]
    MissingSignature,

    #[error("Webhook signature verification failed: {0}")]
    InvalidSignature(&'static str),

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("Stripe request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Stripe API error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl From<StripeError> for AppError {
    fn from(err: StripeError) -> Self {
        match err {
            StripeError::NotConfigured
            | StripeError::MissingSignature
            | StripeError::InvalidSignature(_)
            | StripeError::InvalidPayload(_) => AppError::BadRequest(anyhow::anyhow!("{}", err)),
            StripeError::Http(_) | StripeError::Api { .. } => AppError::BadGateway(err.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// Parameters for a subscription checkout.
#[derive(Debug, Clone)]
pub struct CheckoutParams<'a> {
    pub customer_id: &'a str,
    pub price_id: &'a str,
    pub success_url: &'a str,
    pub cancel_url: &'a str,
    pub company_id: Uuid,
    pub plan: Plan,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

/// How a webhook event identifies its company.
#[derive(Debug, Clone, PartialEq)]
pub enum CompanyRef {
    Id(Uuid),
    Subscription(String),
}

/// The subscription change a webhook event asks for.
#[derive(Debug, Clone)]
pub struct SubscriptionChange {
    pub company: CompanyRef,
    pub update: SubscriptionUpdate,
}

fn str_field<'a>(object: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    object.get(key).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
}

impl StripeEvent {
    /// Map the event onto a company subscription change. Events that are not
    /// handled, or that lack the ids needed to find the company, yield `None`.
    pub fn subscription_change(&self) -> Option<SubscriptionChange> {
        let object = &self.data.object;

        match self.event_type.as_str() {
            "checkout.session.completed" => {
                let metadata = object.get("metadata")?;
                let company_id = str_field(metadata, "companyId")?.parse().ok()?;
                let plan = str_field(metadata, "planId")
                    .map(Plan::from_string)
                    .unwrap_or(Plan::Starter);

                Some(SubscriptionChange {
                    company: CompanyRef::Id(company_id),
                    update: SubscriptionUpdate {
                        status: Some(SUBSCRIPTION_ACTIVE.to_string()),
                        plan: Some(plan),
                        stripe_customer_id: str_field(object, "customer").map(str::to_string),
                        stripe_subscription_id: str_field(object, "subscription")
                            .map(|s| Some(s.to_string())),
                    },
                })
            }
            "customer.subscription.updated" => Some(SubscriptionChange {
                company: CompanyRef::Subscription(str_field(object, "id")?.to_string()),
                update: SubscriptionUpdate {
                    status: Some(str_field(object, "status")?.to_uppercase()),
                    ..Default::default()
                },
            }),
            "customer.subscription.deleted" => Some(SubscriptionChange {
                company: CompanyRef::Subscription(str_field(object, "id")?.to_string()),
                update: SubscriptionUpdate {
                    status: Some(SUBSCRIPTION_CANCELED.to_string()),
                    stripe_subscription_id: Some(None),
                    ..Default::default()
                },
            }),
            "invoice.payment_failed" => Some(SubscriptionChange {
                company: CompanyRef::Subscription(
                    str_field(object, "subscription")?.to_string(),
                ),
                update: SubscriptionUpdate {
                    status: Some(SUBSCRIPTION_PAST_DUE.to_string()),
                    ..Default::default()
                },
            }),
            _ => None,
        }
    }
}

/// Check a `Stripe-Signature` header against the raw body at time `now`.
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    now: i64,
) -> Result<(), StripeError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(StripeError::InvalidSignature("missing timestamp"))?;
    if signatures.is_empty() {
        return Err(StripeError::InvalidSignature("missing v1 signature"));
    }
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(StripeError::InvalidSignature("timestamp outside tolerance"));
    }

    let mut signed = format!("{}.", timestamp).into_bytes();
    signed.extend_from_slice(payload);

    if signatures
        .iter()
        .any(|signature| verify_payload(secret, &signed, signature))
    {
        Ok(())
    } else {
        Err(StripeError::InvalidSignature("no matching signature"))
    }
}

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    config: StripeConfig,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.secret_key.expose_secret().is_empty()
    }

    /// Configured price for a plan. ENTERPRISE is not sold through checkout.
    pub fn price_for(&self, plan: Plan) -> Option<&str> {
        let price = match plan {
            Plan::Starter => self.config.price_starter.as_deref(),
            Plan::Pro => self.config.price_pro.as_deref(),
            Plan::Enterprise => None,
        };
        price.filter(|price| !price.is_empty())
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<T, StripeError> {
        if !self.is_configured() {
            return Err(StripeError::NotConfigured);
        }

        let response = self
            .client
            .post(format!("{}{}", self.config.api_base, path))
            .bearer_auth(self.config.secret_key.expose_secret())
            .form(form)
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StripeError> {
        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, "Stripe response");

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(|b| b.error.message)
            .unwrap_or(body);

        tracing::error!(status = %status, message = %message, "Stripe API error");
        Err(StripeError::Api {
            status: status.as_u16(),
            message,
        })
    }

    pub async fn create_customer(
        &self,
        name: &str,
        company_id: Uuid,
    ) -> Result<StripeCustomer, StripeError> {
        let customer: StripeCustomer = self
            .post_form(
                "/customers",
                &[
                    ("name", name.to_string()),
                    ("metadata[companyId]", company_id.to_string()),
                ],
            )
            .await?;

        tracing::info!(company_id = %company_id, customer_id = %customer.id, "Stripe customer created");
        Ok(customer)
    }

    pub async fn create_checkout_session(
        &self,
        params: &CheckoutParams<'_>,
    ) -> Result<CheckoutSession, StripeError> {
        let session: CheckoutSession = self
            .post_form(
                "/checkout/sessions",
                &[
                    ("customer", params.customer_id.to_string()),
                    ("mode", "subscription".to_string()),
                    ("payment_method_types[0]", "card".to_string()),
                    ("line_items[0][price]", params.price_id.to_string()),
                    ("line_items[0][quantity]", "1".to_string()),
                    ("success_url", params.success_url.to_string()),
                    ("cancel_url", params.cancel_url.to_string()),
                    ("metadata[companyId]", params.company_id.to_string()),
                    ("metadata[planId]", params.plan.as_str().to_string()),
                ],
            )
            .await?;

        tracing::info!(
            company_id = %params.company_id,
            session_id = %session.id,
            plan = params.plan.as_str(),
            "Stripe checkout session created"
        );
        Ok(session)
    }

    pub async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, StripeError> {
        if !self.is_configured() {
            return Err(StripeError::NotConfigured);
        }

        let response = self
            .client
            .get(format!(
                "{}/subscriptions/{}",
                self.config.api_base, subscription_id
            ))
            .bearer_auth(self.config.secret_key.expose_secret())
            .send()
            .await?;

        Self::decode(response).await
    }

    /// Verify the webhook signature and parse the event.
    pub fn verify_and_parse(
        &self,
        signature_header: Option<&str>,
        payload: &[u8],
    ) -> Result<StripeEvent, StripeError> {
        let secret = self.config.webhook_secret.expose_secret();
        let header = signature_header
            .filter(|h| !h.is_empty())
            .ok_or(StripeError::MissingSignature)?;
        if secret.is_empty() {
            return Err(StripeError::MissingSignature);
        }

        verify_signature(secret, header, payload, Utc::now().timestamp())?;
        Ok(serde_json::from_slice(payload)?)
    }
}
