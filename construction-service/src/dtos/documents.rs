use super::deserialize_optional_date;
use crate::finance::{MAX_AMOUNT, MAX_TAX_RATE};
use crate::models::{
    Breakdown, Document, DocumentStatus, DocumentType, EstimateSection, LegacyItem,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn out_of_range(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn check_amount(value: Decimal) -> Result<(), ValidationError> {
    if value.abs() > MAX_AMOUNT {
        return Err(out_of_range("amount", "Amount is out of range"));
    }
    Ok(())
}

fn check_rate(value: Decimal) -> Result<(), ValidationError> {
    if value.abs() > MAX_TAX_RATE {
        return Err(out_of_range("tax_rate", "Tax rate is out of range"));
    }
    Ok(())
}

fn validate_amount(value: &Decimal) -> Result<(), ValidationError> {
    check_amount(*value)
}

fn validate_tax_rate(value: &Decimal) -> Result<(), ValidationError> {
    check_rate(*value)
}

fn validate_sections(sections: &[EstimateSection]) -> Result<(), ValidationError> {
    for item in sections.iter().flat_map(|s| s.items.iter()) {
        let amounts = [Some(item.company_cost), Some(item.customer_price), item.tax_amount];
        let quantities = [item.hours, item.quantity];
        for value in amounts.into_iter().chain(quantities).flatten() {
            check_amount(value)?;
        }
        if let Some(rate) = item.tax {
            check_rate(rate)?;
        }
    }
    Ok(())
}

fn validate_legacy_items(items: &[LegacyItem]) -> Result<(), ValidationError> {
    for item in items {
        for value in [Some(item.cost), item.labor, item.materials].into_iter().flatten() {
            check_amount(value)?;
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    #[serde(rename = "type")]
    pub document_type: DocumentType,
    pub customer_id: Uuid,
    pub project_id: Option<Uuid>,
    #[validate(custom(function = "validate_amount"))]
    pub total_value: Option<Decimal>,
    #[validate(custom(function = "validate_amount"))]
    pub balance_due: Option<Decimal>,
    pub status: DocumentStatus,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub sent_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub due_date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 50, message = "Number must be 1-50 characters"))]
    pub number: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub estimate_date: Option<NaiveDate>,
    pub project_dates: Option<String>,
    pub prepared_by: Option<String>,
    #[validate(range(min = 0, message = "Validity days cannot be negative"))]
    pub validity_days: Option<i32>,
    pub notes: Option<String>,
    pub introduction: Option<String>,
    #[validate(custom(function = "validate_tax_rate"))]
    pub tax_rate: Option<Decimal>,
    #[validate(custom(function = "validate_legacy_items"))]
    pub items: Option<Vec<LegacyItem>>,
    #[validate(custom(function = "validate_sections"))]
    pub sections: Option<Vec<EstimateSection>>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentRequest {
    #[validate(custom(function = "validate_amount"))]
    pub total_value: Option<Decimal>,
    #[validate(custom(function = "validate_amount"))]
    pub balance_due: Option<Decimal>,
    pub status: Option<DocumentStatus>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub sent_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub due_date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 50, message = "Number must be 1-50 characters"))]
    pub number: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub estimate_date: Option<NaiveDate>,
    pub project_dates: Option<String>,
    pub prepared_by: Option<String>,
    #[validate(range(min = 0, message = "Validity days cannot be negative"))]
    pub validity_days: Option<i32>,
    pub notes: Option<String>,
    pub introduction: Option<String>,
    #[validate(custom(function = "validate_tax_rate"))]
    pub tax_rate: Option<Decimal>,
    #[validate(custom(function = "validate_legacy_items"))]
    pub items: Option<Vec<LegacyItem>>,
    #[validate(custom(function = "validate_sections"))]
    pub sections: Option<Vec<EstimateSection>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentQuery {
    pub customer_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub document_type: Option<DocumentType>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub document_type: DocumentType,
    pub status: DocumentStatus,
    pub number: String,
    pub customer_id: Uuid,
    pub project_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_due: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<EstimateSection>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<LegacyItem>>,
    pub sent_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub estimate_date: Option<NaiveDate>,
    pub validity_days: Option<i32>,
    pub project_dates: Option<String>,
    pub prepared_by: Option<String>,
    pub notes: Option<String>,
    pub introduction: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        let (sections, items) = match doc.breakdown() {
            Some(Breakdown::Sections(sections)) => (Some(sections), None),
            Some(Breakdown::Legacy(items)) => (None, Some(items)),
            None => (None, None),
        };

        Self {
            id: doc.document_id,
            document_type: doc.doc_type(),
            status: doc.doc_status(),
            number: doc.number,
            customer_id: doc.customer_id,
            project_id: doc.project_id,
            total_value: Some(doc.total_value),
            balance_due: Some(doc.balance_due),
            tax_rate: doc.tax_rate,
            sections,
            items,
            sent_date: doc.sent_date,
            due_date: doc.due_date,
            estimate_date: doc.estimate_date,
            validity_days: doc.validity_days,
            project_dates: doc.project_dates,
            prepared_by: doc.prepared_by,
            notes: doc.notes,
            introduction: doc.introduction,
            created_at: doc.created_utc,
            updated_at: doc.updated_utc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_request(body: serde_json::Value) -> CreateDocumentRequest {
        serde_json::from_value(body).unwrap()
    }

    fn estimate_with_item(item: serde_json::Value) -> CreateDocumentRequest {
        create_request(json!({
            "type": "ESTIMATE",
            "customerId": Uuid::new_v4(),
            "status": "DRAFT",
            "sections": [{ "name": "Framing", "items": [item] }]
        }))
    }

    #[test]
    fn test_amounts_within_column_bounds_pass() {
        let req = estimate_with_item(json!({
            "type": "LABOR",
            "companyCost": 999999999999.5,
            "customerPrice": 100,
            "tax": 999.5
        }));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_oversized_line_item_is_rejected() {
        let req = estimate_with_item(json!({
            "type": "LABOR",
            "companyCost": 0.01,
            "customerPrice": 1e27,
            "taxAmount": 0
        }));
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("sections"));
    }

    #[test]
    fn test_oversized_item_tax_rate_is_rejected() {
        let req = estimate_with_item(json!({
            "type": "MATERIAL",
            "companyCost": 10,
            "customerPrice": 20,
            "tax": 1000
        }));
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_oversized_document_fields_are_rejected() {
        let req = create_request(json!({
            "type": "INVOICE",
            "customerId": Uuid::new_v4(),
            "status": "DRAFT",
            "totalValue": 1e13,
            "taxRate": 5000,
            "items": [{ "cost": -1e13 }]
        }));
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert_eq!(fields.len(), 3);
        assert!(fields.contains_key("items"));
    }

    #[test]
    fn test_update_checks_balance() {
        let req: UpdateDocumentRequest =
            serde_json::from_value(json!({ "balanceDue": 2e12 })).unwrap();
        assert!(req.validate().is_err());
    }
}
