use super::{company_branding, pdf_attachment, render_pdf, template_error};
use crate::dtos::documents::{
    CreateDocumentRequest, DocumentQuery, DocumentResponse, UpdateDocumentRequest,
};
use crate::dtos::MessageResponse;
use crate::finance::{
    calculate_balance_due, ensure_transition, estimate_financials, round_money,
    total_from_breakdown, validate_financial_rules, EstimateFinancials, FinancialRuleError,
};
use crate::middleware::AuthUser;
use crate::models::{
    Breakdown, CreateDocument, Document, DocumentFilter, DocumentType, EstimateSection,
    LegacyItem, Role, UpdateDocument,
};
use crate::projection::RoleProjection;
use crate::services::metrics::record_document_operation;
use crate::services::plan_limits::{enforce_plan_limit, LimitKind};
use crate::services::PdfOptions;
use crate::templates::render_estimate;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    Json,
};
use rust_decimal::Decimal;
use service_core::error::AppError;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

/// Validity printed on estimates when none is given.
pub const DEFAULT_VALIDITY_DAYS: i32 = 30;

const READ_ROLES: &[Role] = &[Role::Admin, Role::Manager, Role::Sales];
const WRITE_ROLES: &[Role] = &[Role::Admin, Role::Manager];

/// The breakdown carried by a request. Sending both formats is rejected.
fn requested_breakdown(
    sections: Option<Vec<EstimateSection>>,
    items: Option<Vec<LegacyItem>>,
) -> Result<Option<Breakdown>, FinancialRuleError> {
    match (sections, items) {
        (Some(_), Some(_)) => Err(FinancialRuleError::ConflictingBreakdown),
        (Some(sections), None) => Ok(Some(Breakdown::Sections(sections))),
        (None, Some(items)) => Ok(Some(Breakdown::Legacy(items))),
        (None, None) => Ok(None),
    }
}

/// Total for a new document: taken from the breakdown when the client
/// sent none (or zero).
fn initial_total(
    total_value: Option<Decimal>,
    breakdown: Option<&Breakdown>,
    tax_rate: Option<Decimal>,
) -> Result<Decimal, FinancialRuleError> {
    let provided = total_value.filter(|t| !t.is_zero());
    match (provided, breakdown) {
        (Some(total), _) => Ok(round_money(total)),
        (None, Some(breakdown)) if !breakdown.is_empty() => {
            total_from_breakdown(breakdown, tax_rate.unwrap_or_default())
        }
        (None, _) => Ok(Decimal::ZERO),
    }
}

/// Merge a partial update onto the stored document and re-derive the money fields.
fn merge_update(
    existing: &Document,
    req: UpdateDocumentRequest,
) -> Result<UpdateDocument, FinancialRuleError> {
    let current_status = existing.doc_status();
    let status = req.status.unwrap_or(current_status);
    ensure_transition(current_status, status)?;

    let tax_rate = req.tax_rate.or(existing.tax_rate);
    let new_breakdown = requested_breakdown(req.sections, req.items)?;

    let total_value = match &new_breakdown {
        Some(breakdown) if !breakdown.is_empty() => {
            total_from_breakdown(breakdown, tax_rate.unwrap_or_default())?
        }
        _ => round_money(req.total_value.unwrap_or(existing.total_value)),
    };

    let balance_due = calculate_balance_due(
        total_value,
        req.balance_due.unwrap_or(existing.balance_due),
        status,
    );
    validate_financial_rules(total_value, balance_due, status)?;

    Ok(UpdateDocument {
        status,
        number: req.number.unwrap_or_else(|| existing.number.clone()),
        total_value,
        balance_due,
        tax_rate,
        breakdown: new_breakdown.or_else(|| existing.breakdown()),
        sent_date: req.sent_date.or(existing.sent_date),
        due_date: req.due_date.or(existing.due_date),
        estimate_date: req.estimate_date.or(existing.estimate_date),
        validity_days: req.validity_days.or(existing.validity_days),
        project_dates: req.project_dates.or_else(|| existing.project_dates.clone()),
        prepared_by: req.prepared_by.or_else(|| existing.prepared_by.clone()),
        notes: req.notes.or_else(|| existing.notes.clone()),
        introduction: req.introduction.or_else(|| existing.introduction.clone()),
    })
}

async fn load_document(
    state: &AppState,
    company_id: Uuid,
    document_id: Uuid,
) -> Result<Document, AppError> {
    state
        .db
        .get_document(company_id, document_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Document not found")))
}

#[instrument(skip_all, fields(company_id = %user.company_id))]
pub async fn create_document(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentResponse>), AppError> {
    user.require_role(READ_ROLES)?;
    payload.validate()?;

    if user.role == Role::Sales && payload.document_type != DocumentType::Estimate {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "SALES role can only create estimates"
        )));
    }

    let breakdown = requested_breakdown(payload.sections, payload.items)?;

    let customer = state
        .db
        .get_customer(user.company_id, payload.customer_id)
        .await?
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Customer not found")))?;

    if let Some(project_id) = payload.project_id {
        let project = state
            .db
            .get_project(user.company_id, project_id)
            .await?
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Project not found")))?;
        if project.customer_id != customer.customer_id {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Project does not belong to this customer"
            )));
        }
    }

    enforce_plan_limit(&state.db, user.company_id, LimitKind::Documents).await?;

    let total_value = initial_total(payload.total_value, breakdown.as_ref(), payload.tax_rate)?;
    let balance_due = calculate_balance_due(
        total_value,
        payload.balance_due.unwrap_or(total_value),
        payload.status,
    );
    validate_financial_rules(total_value, balance_due, payload.status)?;

    let validity_days = payload.validity_days.or(
        (payload.document_type == DocumentType::Estimate).then_some(DEFAULT_VALIDITY_DAYS),
    );

    let input = CreateDocument {
        company_id: user.company_id,
        customer_id: customer.customer_id,
        project_id: payload.project_id,
        document_type: payload.document_type,
        status: payload.status,
        number: payload.number,
        total_value,
        balance_due,
        tax_rate: payload.tax_rate,
        breakdown,
        sent_date: payload.sent_date,
        due_date: payload.due_date,
        estimate_date: payload.estimate_date,
        validity_days,
        project_dates: payload.project_dates,
        prepared_by: payload.prepared_by,
        notes: payload.notes,
        introduction: payload.introduction,
    };

    let document = state.db.create_document(&input).await?;

    record_document_operation(
        &user.company_id.to_string(),
        input.document_type.as_str(),
        "create",
    );
    tracing::info!(
        document_id = %document.document_id,
        number = %document.number,
        total_value = %document.total_value,
        "Document created"
    );

    Ok((
        StatusCode::CREATED,
        Json(DocumentResponse::from(document).project_for(user.role)),
    ))
}

#[instrument(skip_all, fields(company_id = %user.company_id))]
pub async fn list_documents(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DocumentQuery>,
) -> Result<Json<Vec<DocumentResponse>>, AppError> {
    user.require_role(READ_ROLES)?;

    let filter = DocumentFilter {
        customer_id: query.customer_id,
        project_id: query.project_id,
        document_type: query.document_type,
    };
    let documents = state.db.list_documents(user.company_id, &filter).await?;

    let response = documents
        .into_iter()
        .map(DocumentResponse::from)
        .collect::<Vec<_>>()
        .project_for(user.role);

    Ok(Json(response))
}

#[instrument(skip_all, fields(company_id = %user.company_id, document_id = %document_id))]
pub async fn get_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DocumentResponse>, AppError> {
    user.require_role(READ_ROLES)?;

    let document = load_document(&state, user.company_id, document_id).await?;
    Ok(Json(DocumentResponse::from(document).project_for(user.role)))
}

#[instrument(skip_all, fields(company_id = %user.company_id, document_id = %document_id))]
pub async fn update_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(document_id): Path<Uuid>,
    Json(payload): Json<UpdateDocumentRequest>,
) -> Result<Json<DocumentResponse>, AppError> {
    user.require_role(WRITE_ROLES)?;
    payload.validate()?;

    let existing = load_document(&state, user.company_id, document_id).await?;
    let update = merge_update(&existing, payload)?;

    let document = state
        .db
        .update_document(user.company_id, document_id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Document not found")))?;

    record_document_operation(
        &user.company_id.to_string(),
        document.doc_type().as_str(),
        "update",
    );

    Ok(Json(DocumentResponse::from(document).project_for(user.role)))
}

#[instrument(skip_all, fields(company_id = %user.company_id, document_id = %document_id))]
pub async fn delete_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(document_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    user.require_role(WRITE_ROLES)?;

    let document = load_document(&state, user.company_id, document_id).await?;
    if !state.db.delete_document(user.company_id, document_id).await? {
        return Err(AppError::NotFound(anyhow::anyhow!("Document not found")));
    }

    record_document_operation(
        &user.company_id.to_string(),
        document.doc_type().as_str(),
        "delete",
    );

    Ok(Json(MessageResponse::new("Document deleted successfully")))
}

/// Estimate PDF download.
#[instrument(skip_all, fields(company_id = %user.company_id, document_id = %document_id))]
pub async fn document_pdf(
    State(state): State<AppState>,
    user: AuthUser,
    Path(document_id): Path<Uuid>,
) -> Result<Response, AppError> {
    user.require_role(READ_ROLES)?;

    let document = load_document(&state, user.company_id, document_id).await?;
    if document.doc_type() != DocumentType::Estimate {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "PDF generation is only available for estimates"
        )));
    }

    let customer = state
        .db
        .get_customer(user.company_id, document.customer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Customer not found")))?;

    let project = match document.project_id {
        Some(project_id) => state.db.get_project(user.company_id, project_id).await?,
        None => None,
    };

    let branding = company_branding(&state, user.company_id).await?;
    let html = render_estimate(&document, &customer, project.as_ref(), &branding)
        .map_err(template_error)?;

    let bytes = render_pdf(&state, "estimate", &html, &PdfOptions::estimate()).await?;

    record_document_operation(&user.company_id.to_string(), DocumentType::Estimate.as_str(), "pdf");
    tracing::info!(number = %document.number, size = bytes.len(), "Estimate PDF generated");

    Ok(pdf_attachment(bytes, &format!("estimate-{}.pdf", document.number)))
}

/// Internal cost, customer price and profit view of an estimate.
#[instrument(skip_all, fields(company_id = %user.company_id, document_id = %document_id))]
pub async fn document_financials(
    State(state): State<AppState>,
    user: AuthUser,
    Path(document_id): Path<Uuid>,
) -> Result<Json<EstimateFinancials>, AppError> {
    user.require_role(WRITE_ROLES)?;

    let document = load_document(&state, user.company_id, document_id).await?;
    Ok(Json(estimate_financials(&document)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentStatus, EstimateLineItem, LineItemType};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use sqlx::types::Json as SqlJson;

    fn section(price: Decimal) -> EstimateSection {
        EstimateSection {
            name: "Framing".to_string(),
            items: vec![EstimateLineItem {
                item_type: LineItemType::Labor,
                name: "Crew".to_string(),
                hours: None,
                quantity: None,
                company_cost: dec!(50),
                customer_price: price,
                tax: None,
                tax_amount: None,
                visible: 1,
            }],
        }
    }

    fn stored(status: DocumentStatus, total: Decimal, balance: Decimal) -> Document {
        let now = Utc::now();
        Document {
            document_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            project_id: None,
            document_type: "INVOICE".to_string(),
            status: status.as_str().to_string(),
            number: "INV-2024-001".to_string(),
            total_value: total,
            balance_due: balance,
            tax_rate: Some(dec!(10)),
            sections: Some(SqlJson(vec![section(total)])),
            legacy_items: None,
            sent_date: None,
            due_date: None,
            estimate_date: None,
            validity_days: None,
            project_dates: None,
            prepared_by: None,
            notes: Some("keep".to_string()),
            introduction: None,
            created_utc: now,
            updated_utc: now,
        }
    }

    #[test]
    fn test_both_breakdown_formats_rejected() {
        let result = requested_breakdown(Some(vec![]), Some(vec![]));
        assert_eq!(result, Err(FinancialRuleError::ConflictingBreakdown));
    }

    #[test]
    fn test_initial_total_from_breakdown_when_zero() {
        let breakdown = Breakdown::Sections(vec![section(dec!(100))]);
        assert_eq!(
            initial_total(Some(Decimal::ZERO), Some(&breakdown), Some(dec!(10))),
            Ok(dec!(110))
        );
        assert_eq!(
            initial_total(Some(dec!(75)), Some(&breakdown), Some(dec!(10))),
            Ok(dec!(75))
        );
        assert_eq!(initial_total(None, None, None), Ok(Decimal::ZERO));
    }

    #[test]
    fn test_merge_marks_paid_and_clears_balance() {
        let existing = stored(DocumentStatus::Accepted, dec!(500), dec!(500));
        let update = merge_update(
            &existing,
            UpdateDocumentRequest {
                status: Some(DocumentStatus::Paid),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(update.status, DocumentStatus::Paid);
        assert_eq!(update.balance_due, Decimal::ZERO);
        assert_eq!(update.total_value, dec!(500));
        assert_eq!(update.notes.as_deref(), Some("keep"));
        assert!(matches!(update.breakdown, Some(Breakdown::Sections(_))));
    }

    #[test]
    fn test_merge_rejects_invalid_transition() {
        let existing = stored(DocumentStatus::Paid, dec!(500), dec!(0));
        let result = merge_update(
            &existing,
            UpdateDocumentRequest {
                status: Some(DocumentStatus::Draft),
                ..Default::default()
            },
        );

        assert!(matches!(
            result,
            Err(FinancialRuleError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_merge_recomputes_total_with_stored_tax_rate() {
        let existing = stored(DocumentStatus::Pending, dec!(100), dec!(100));
        let update = merge_update(
            &existing,
            UpdateDocumentRequest {
                sections: Some(vec![section(dec!(200))]),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(update.total_value, dec!(220));
        assert_eq!(update.balance_due, dec!(220));
    }

    #[test]
    fn test_legacy_items_replace_sections() {
        let existing = stored(DocumentStatus::Draft, dec!(100), dec!(100));
        let update = merge_update(
            &existing,
            UpdateDocumentRequest {
                items: Some(vec![LegacyItem {
                    category: "Roof".to_string(),
                    description: "Shingles".to_string(),
                    labor: None,
                    materials: None,
                    cost: dec!(80),
                }]),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(matches!(update.breakdown, Some(Breakdown::Legacy(_))));
        assert_eq!(update.total_value, dec!(80));
        assert_eq!(update.balance_due, dec!(80));
    }
}
