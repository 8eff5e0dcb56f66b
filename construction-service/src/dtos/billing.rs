use crate::models::{Company, UsageCounts};
use crate::services::plan_limits::PlanLimits;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatusResponse {
    pub plan: String,
    pub status: String,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
}

impl From<Company> for SubscriptionStatusResponse {
    fn from(company: Company) -> Self {
        Self {
            plan: company.plan().as_str().to_string(),
            status: company.subscription_status,
            trial_ends_at: company.trial_ends_at,
            stripe_customer_id: company.stripe_customer_id,
            stripe_subscription_id: company.stripe_subscription_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimitsResponse {
    pub plan: String,
    pub limits: PlanLimits,
    pub usage: UsageCounts,
    pub can_add_user: bool,
    pub can_add_project: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub plan_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub message: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}
