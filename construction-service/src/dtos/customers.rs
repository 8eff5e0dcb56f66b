use crate::finance::LedgerTotals;
use crate::models::{Address, ContactEmails, ContactPhones, Customer, DocumentListing};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidateEmail, ValidationError};

fn validate_emails(emails: &ContactEmails) -> Result<(), ValidationError> {
    if !emails.work.validate_email() {
        let mut err = ValidationError::new("email");
        err.message = Some("Invalid work email".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[validate(custom(function = "validate_emails"))]
    pub emails: ContactEmails,

    pub phones: ContactPhones,

    #[serde(default)]
    pub addresses: Vec<Address>,

    pub lead_source: Option<String>,

    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,

    #[validate(custom(function = "validate_emails"))]
    pub emails: Option<ContactEmails>,

    pub phones: Option<ContactPhones>,

    pub addresses: Option<Vec<Address>>,

    pub lead_source: Option<String>,

    pub notes: Option<String>,
}

/// Derived per-customer figures. Paid and outstanding are hidden from SALES.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerFinancials {
    pub total_estimates_value: Decimal,
    pub total_invoices_value: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_paid: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_outstanding: Option<Decimal>,
    pub documents_count: i64,
    pub projects_count: i64,
}

impl CustomerFinancials {
    pub fn new(totals: &LedgerTotals, projects_count: i64) -> Self {
        Self {
            total_estimates_value: totals.estimates_value,
            total_invoices_value: totals.invoices_value,
            total_paid: Some(totals.total_paid),
            total_outstanding: Some(totals.total_outstanding),
            documents_count: totals.documents_count,
            projects_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerResponse {
    pub id: Uuid,
    pub name: String,
    pub emails: ContactEmails,
    pub phones: ContactPhones,
    pub addresses: Vec<Address>,
    pub lead_source: Option<String>,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub financials: CustomerFinancials,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomerResponse {
    pub fn new(customer: Customer, financials: CustomerFinancials) -> Self {
        Self {
            id: customer.customer_id,
            name: customer.name,
            emails: customer.emails.0,
            phones: customer.phones.0,
            addresses: customer.addresses.0,
            lead_source: customer.lead_source,
            notes: customer.notes,
            financials,
            created_at: customer.created_utc,
            updated_at: customer.updated_utc,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementCustomer {
    pub id: Uuid,
    pub name: String,
    pub emails: ContactEmails,
    pub phones: ContactPhones,
    pub address: Option<String>,
}

/// `{id, name}` reference to a related record.
#[derive(Debug, Clone, Serialize)]
pub struct NamedRef {
    pub id: Uuid,
    pub name: String,
}

/// A document line on a statement or project summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementDocument {
    pub id: Uuid,
    pub number: String,
    #[serde(rename = "type")]
    pub document_type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_due: Option<Decimal>,
    pub sent_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<NamedRef>,
}

impl From<DocumentListing> for StatementDocument {
    fn from(row: DocumentListing) -> Self {
        let project = match (row.project_id, row.project_name) {
            (Some(id), Some(name)) => Some(NamedRef { id, name }),
            _ => None,
        };

        Self {
            id: row.document_id,
            number: row.number,
            document_type: row.document_type,
            status: row.status,
            total_value: Some(row.total_value),
            balance_due: Some(row.balance_due),
            sent_date: row.sent_date,
            due_date: row.due_date,
            project,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementTotals {
    pub total_invoiced: Decimal,
    pub total_paid: Decimal,
    pub total_outstanding: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerStatement {
    pub customer: StatementCustomer,
    pub documents: Vec<StatementDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totals: Option<StatementTotals>,
    pub generated_at: DateTime<Utc>,
}
