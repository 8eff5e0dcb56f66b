use super::customers::{NamedRef, StatementDocument};
use crate::finance::LedgerTotals;
use crate::models::{Project, ProjectStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    pub customer_id: Uuid,

    pub status: Option<ProjectStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQuery {
    pub customer_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFinancials {
    pub total_estimated_value: Decimal,
    pub total_invoiced_value: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_paid: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_outstanding: Option<Decimal>,
}

impl From<&LedgerTotals> for ProjectFinancials {
    fn from(totals: &LedgerTotals) -> Self {
        Self {
            total_estimated_value: totals.estimates_value,
            total_invoiced_value: totals.invoices_value,
            total_paid: Some(totals.total_paid),
            total_outstanding: Some(totals.total_outstanding),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: Uuid,
    pub name: String,
    pub status: String,
    pub customer_id: Uuid,
    #[serde(flatten)]
    pub financials: ProjectFinancials,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectResponse {
    pub fn new(project: Project, financials: ProjectFinancials) -> Self {
        Self {
            id: project.project_id,
            name: project.name,
            status: project.status,
            customer_id: project.customer_id,
            financials,
            created_at: project.created_utc,
            updated_at: project.updated_utc,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummaryRef {
    pub id: Uuid,
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFinancialSummary {
    pub project: ProjectSummaryRef,
    pub customer: NamedRef,
    pub documents: Vec<StatementDocument>,
    pub financials: ProjectFinancials,
    pub generated_at: DateTime<Utc>,
}
