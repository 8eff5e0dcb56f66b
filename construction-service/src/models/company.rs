//! Company (tenant) model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Subscription plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Plan {
    Starter,
    Pro,
    Enterprise,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Starter => "STARTER",
            Plan::Pro => "PRO",
            Plan::Enterprise => "ENTERPRISE",
        }
    }

    /// Unknown plans fall back to STARTER.
    pub fn from_string(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "PRO" => Plan::Pro,
            "ENTERPRISE" => Plan::Enterprise,
            _ => Plan::Starter,
        }
    }
}

pub const SUBSCRIPTION_ACTIVE: &str = "ACTIVE";
pub const SUBSCRIPTION_TRIALING: &str = "TRIALING";
pub const SUBSCRIPTION_PAST_DUE: &str = "PAST_DUE";
pub const SUBSCRIPTION_CANCELED: &str = "CANCELED";

/// Whether a subscription status grants access to business routes.
/// A missing status counts as TRIALING.
pub fn subscription_allows_access(status: Option<&str>) -> bool {
    matches!(
        status.unwrap_or(SUBSCRIPTION_TRIALING),
        SUBSCRIPTION_ACTIVE | SUBSCRIPTION_TRIALING
    )
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Company {
    pub company_id: Uuid,
    pub name: String,
    pub display_name: Option<String>,
    pub logo_url: Option<String>,
    pub primary_color: Option<String>,
    pub accent_color: Option<String>,
    pub email_from_name: Option<String>,
    pub email_from_address: Option<String>,
    pub plan: String,
    pub subscription_status: String,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Company {
    pub fn plan(&self) -> Plan {
        Plan::from_string(&self.plan)
    }
}

/// A field change in a partial branding update. `Some(None)` clears the column.
pub type FieldUpdate = Option<Option<String>>;

/// Input for a partial branding update.
#[derive(Debug, Clone, Default)]
pub struct UpdateBranding {
    pub display_name: FieldUpdate,
    pub logo_url: FieldUpdate,
    pub primary_color: FieldUpdate,
    pub accent_color: FieldUpdate,
    pub email_from_name: FieldUpdate,
    pub email_from_address: FieldUpdate,
}

/// Subscription fields written by Stripe webhooks and sync.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionUpdate {
    pub status: Option<String>,
    pub plan: Option<Plan>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: FieldUpdate,
}

/// Current usage counted against plan limits.
#[derive(Debug, Clone, Copy, Default, Serialize, FromRow)]
pub struct UsageCounts {
    pub users: i64,
    pub projects: i64,
    pub documents: i64,
    pub tasks: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_plan_falls_back_to_starter() {
        assert_eq!(Plan::from_string("gold"), Plan::Starter);
        assert_eq!(Plan::from_string("pro"), Plan::Pro);
        assert_eq!(Plan::from_string("ENTERPRISE"), Plan::Enterprise);
    }

    #[test]
    fn test_subscription_access() {
        assert!(subscription_allows_access(None));
        assert!(subscription_allows_access(Some("ACTIVE")));
        assert!(subscription_allows_access(Some("TRIALING")));
        assert!(!subscription_allows_access(Some("PAST_DUE")));
        assert!(!subscription_allows_access(Some("CANCELED")));
    }
}
