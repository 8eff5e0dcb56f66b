//! Document model: estimates, invoices and change orders.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    Estimate,
    Invoice,
    ChangeOrder,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Estimate => "ESTIMATE",
            DocumentType::Invoice => "INVOICE",
            DocumentType::ChangeOrder => "CHANGE_ORDER",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "INVOICE" => DocumentType::Invoice,
            "CHANGE_ORDER" => DocumentType::ChangeOrder,
            _ => DocumentType::Estimate,
        }
    }

    /// Number prefix used in `{PREFIX}-{year}-{sequence}`.
    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentType::Estimate => "EST",
            DocumentType::Invoice => "INV",
            DocumentType::ChangeOrder => "CO",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Draft,
    Pending,
    Accepted,
    Paid,
    Overdue,
}

impl DocumentStatus {
    pub const ALL: [DocumentStatus; 5] = [
        DocumentStatus::Draft,
        DocumentStatus::Pending,
        DocumentStatus::Accepted,
        DocumentStatus::Paid,
        DocumentStatus::Overdue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "DRAFT",
            DocumentStatus::Pending => "PENDING",
            DocumentStatus::Accepted => "ACCEPTED",
            DocumentStatus::Paid => "PAID",
            DocumentStatus::Overdue => "OVERDUE",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "PENDING" => DocumentStatus::Pending,
            "ACCEPTED" => DocumentStatus::Accepted,
            "PAID" => DocumentStatus::Paid,
            "OVERDUE" => DocumentStatus::Overdue,
            _ => DocumentStatus::Draft,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineItemType {
    Labor,
    Material,
    OtherCost,
}

fn default_visible() -> i32 {
    1
}

/// One line of a sectioned estimate. `company_cost` is internal and never printed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateLineItem {
    #[serde(rename = "type")]
    pub item_type: LineItemType,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub company_cost: Decimal,
    #[serde(default)]
    pub customer_price: Decimal,
    /// Tax percentage; falls back to the document tax rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax: Option<Decimal>,
    /// Explicit tax amount; takes precedence over `tax`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_amount: Option<Decimal>,
    /// 0 hides the item from the customer.
    #[serde(default = "default_visible")]
    pub visible: i32,
}

impl EstimateLineItem {
    pub fn is_visible(&self) -> bool {
        self.visible != 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateSection {
    pub name: String,
    #[serde(default)]
    pub items: Vec<EstimateLineItem>,
}

/// Flat breakdown row from the legacy format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyItem {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labor: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materials: Option<Decimal>,
    #[serde(default)]
    pub cost: Decimal,
}

/// Cost breakdown. A document carries at most one of the two formats.
#[derive(Debug, Clone, PartialEq)]
pub enum Breakdown {
    Sections(Vec<EstimateSection>),
    Legacy(Vec<LegacyItem>),
}

impl Breakdown {
    pub fn is_empty(&self) -> bool {
        match self {
            Breakdown::Sections(sections) => sections.is_empty(),
            Breakdown::Legacy(items) => items.is_empty(),
        }
    }
}

/// Column values for the `sections` and `legacy_items` JSONB pair.
pub type BreakdownColumns = (
    Option<Json<Vec<EstimateSection>>>,
    Option<Json<Vec<LegacyItem>>>,
);

pub fn breakdown_columns(breakdown: Option<&Breakdown>) -> BreakdownColumns {
    match breakdown {
        Some(Breakdown::Sections(sections)) => (Some(Json(sections.clone())), None),
        Some(Breakdown::Legacy(items)) => (None, Some(Json(items.clone()))),
        None => (None, None),
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Document {
    pub document_id: Uuid,
    pub company_id: Uuid,
    pub customer_id: Uuid,
    pub project_id: Option<Uuid>,
    pub document_type: String,
    pub status: String,
    pub number: String,
    pub total_value: Decimal,
    pub balance_due: Decimal,
    pub tax_rate: Option<Decimal>,
    pub sections: Option<Json<Vec<EstimateSection>>>,
    pub legacy_items: Option<Json<Vec<LegacyItem>>>,
    pub sent_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub estimate_date: Option<NaiveDate>,
    pub validity_days: Option<i32>,
    pub project_dates: Option<String>,
    pub prepared_by: Option<String>,
    pub notes: Option<String>,
    pub introduction: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Document {
    pub fn doc_type(&self) -> DocumentType {
        DocumentType::from_string(&self.document_type)
    }

    pub fn doc_status(&self) -> DocumentStatus {
        DocumentStatus::from_string(&self.status)
    }

    pub fn breakdown(&self) -> Option<Breakdown> {
        if let Some(Json(sections)) = &self.sections {
            return Some(Breakdown::Sections(sections.clone()));
        }
        self.legacy_items
            .as_ref()
            .map(|Json(items)| Breakdown::Legacy(items.clone()))
    }
}

/// Fully resolved values for a new document row.
#[derive(Debug, Clone)]
pub struct CreateDocument {
    pub company_id: Uuid,
    pub customer_id: Uuid,
    pub project_id: Option<Uuid>,
    pub document_type: DocumentType,
    pub status: DocumentStatus,
    /// Explicit number; allocated from the sequence when absent.
    pub number: Option<String>,
    pub total_value: Decimal,
    pub balance_due: Decimal,
    pub tax_rate: Option<Decimal>,
    pub breakdown: Option<Breakdown>,
    pub sent_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub estimate_date: Option<NaiveDate>,
    pub validity_days: Option<i32>,
    pub project_dates: Option<String>,
    pub prepared_by: Option<String>,
    pub notes: Option<String>,
    pub introduction: Option<String>,
}

/// Fully merged values written back on update.
#[derive(Debug, Clone)]
pub struct UpdateDocument {
    pub status: DocumentStatus,
    pub number: String,
    pub total_value: Decimal,
    pub balance_due: Decimal,
    pub tax_rate: Option<Decimal>,
    pub breakdown: Option<Breakdown>,
    pub sent_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub estimate_date: Option<NaiveDate>,
    pub validity_days: Option<i32>,
    pub project_dates: Option<String>,
    pub prepared_by: Option<String>,
    pub notes: Option<String>,
    pub introduction: Option<String>,
}

/// Money columns of a document, used for aggregation.
#[derive(Debug, Clone, FromRow)]
pub struct DocumentFigureRow {
    pub customer_id: Uuid,
    pub project_id: Option<Uuid>,
    pub document_type: String,
    pub status: String,
    pub total_value: Decimal,
    pub balance_due: Decimal,
    pub updated_utc: DateTime<Utc>,
}

/// Document line for statements and project summaries, joined with its project name.
#[derive(Debug, Clone, FromRow)]
pub struct DocumentListing {
    pub document_id: Uuid,
    pub number: String,
    pub document_type: String,
    pub status: String,
    pub total_value: Decimal,
    pub balance_due: Decimal,
    pub sent_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub updated_utc: DateTime<Utc>,
    pub project_id: Option<Uuid>,
    pub project_name: Option<String>,
}

/// Filter parameters for listing documents.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub customer_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub document_type: Option<DocumentType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_item_defaults() {
        let item: EstimateLineItem =
            serde_json::from_str(r#"{"type":"LABOR","name":"Framing","customerPrice":100}"#)
                .unwrap();
        assert_eq!(item.item_type, LineItemType::Labor);
        assert_eq!(item.company_cost, Decimal::ZERO);
        assert_eq!(item.customer_price, Decimal::new(100, 0));
        assert!(item.is_visible());
    }

    #[test]
    fn test_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&DocumentType::ChangeOrder).unwrap(),
            "\"CHANGE_ORDER\""
        );
        assert_eq!(DocumentType::ChangeOrder.prefix(), "CO");
        assert_eq!(DocumentStatus::from_string("OVERDUE"), DocumentStatus::Overdue);
    }
}
