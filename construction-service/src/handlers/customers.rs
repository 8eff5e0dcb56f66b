use super::{company_branding, file_slug, pdf_attachment, render_pdf, send_email, template_error};
use crate::dtos::customers::{
    CreateCustomerRequest, CustomerFinancials, CustomerResponse, CustomerStatement,
    StatementCustomer, StatementDocument, StatementTotals, UpdateCustomerRequest,
};
use crate::dtos::MessageResponse;
use crate::finance::{DocumentFigures, LedgerTotals};
use crate::middleware::AuthUser;
use crate::models::{CreateCustomer, Customer, Role, UpdateCustomer};
use crate::projection::RoleProjection;
use crate::services::{EmailAttachment, EmailMessage, PdfOptions};
use crate::templates::{render_customer_statement, statement_email};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

const CUSTOMER_ROLES: &[Role] = &[Role::Admin, Role::Manager, Role::Sales];

/// Statement PDFs and emails carry money columns only for these roles.
fn includes_financials(role: Role) -> bool {
    matches!(role, Role::Admin | Role::Manager)
}

async fn load_customer(
    state: &AppState,
    company_id: Uuid,
    customer_id: Uuid,
) -> Result<Customer, AppError> {
    state
        .db
        .get_customer(company_id, customer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Customer not found")))
}

/// Derived figures for one customer.
async fn customer_financials(
    state: &AppState,
    company_id: Uuid,
    customer_id: Uuid,
) -> Result<CustomerFinancials, AppError> {
    let rows = state
        .db
        .document_figures(company_id, Some(customer_id), None)
        .await?;
    let figures: Vec<DocumentFigures> = rows.iter().map(DocumentFigures::from).collect();

    let projects = state
        .db
        .project_counts(company_id, Some(customer_id))
        .await?
        .get(&customer_id)
        .copied()
        .unwrap_or(0);

    Ok(CustomerFinancials::new(
        &LedgerTotals::from_figures(&figures),
        projects,
    ))
}

#[instrument(skip_all, fields(company_id = %user.company_id))]
pub async fn list_customers(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<CustomerResponse>>, AppError> {
    user.require_role(CUSTOMER_ROLES)?;

    let customers = state.db.list_customers(user.company_id).await?;
    let rows = state.db.document_figures(user.company_id, None, None).await?;
    let project_counts = state.db.project_counts(user.company_id, None).await?;

    let mut figures_by_customer: HashMap<Uuid, Vec<DocumentFigures>> = HashMap::new();
    for row in &rows {
        figures_by_customer
            .entry(row.customer_id)
            .or_default()
            .push(DocumentFigures::from(row));
    }

    let response = customers
        .into_iter()
        .map(|customer| {
            let totals = figures_by_customer
                .get(&customer.customer_id)
                .map(|figures| LedgerTotals::from_figures(figures))
                .unwrap_or_default();
            let projects = project_counts
                .get(&customer.customer_id)
                .copied()
                .unwrap_or(0);
            CustomerResponse::new(customer, CustomerFinancials::new(&totals, projects))
        })
        .collect::<Vec<_>>()
        .project_for(user.role);

    Ok(Json(response))
}

#[instrument(skip_all, fields(company_id = %user.company_id, customer_id = %customer_id))]
pub async fn get_customer(
    State(state): State<AppState>,
    user: AuthUser,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<CustomerResponse>, AppError> {
    user.require_role(CUSTOMER_ROLES)?;

    let customer = load_customer(&state, user.company_id, customer_id).await?;
    let financials = customer_financials(&state, user.company_id, customer_id).await?;

    Ok(Json(
        CustomerResponse::new(customer, financials).project_for(user.role),
    ))
}

#[instrument(skip_all, fields(company_id = %user.company_id))]
pub async fn create_customer(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<CustomerResponse>), AppError> {
    user.require_role(CUSTOMER_ROLES)?;
    payload.validate()?;

    let input = CreateCustomer {
        company_id: user.company_id,
        name: payload.name.trim().to_string(),
        emails: payload.emails,
        phones: payload.phones,
        addresses: payload.addresses,
        lead_source: payload.lead_source,
        notes: payload.notes,
    };

    let customer = state.db.create_customer(&input).await?;
    tracing::info!(customer_id = %customer.customer_id, "Customer created");

    let financials = CustomerFinancials::new(&LedgerTotals::default(), 0);
    Ok((
        StatusCode::CREATED,
        Json(CustomerResponse::new(customer, financials).project_for(user.role)),
    ))
}

#[instrument(skip_all, fields(company_id = %user.company_id, customer_id = %customer_id))]
pub async fn update_customer(
    State(state): State<AppState>,
    user: AuthUser,
    Path(customer_id): Path<Uuid>,
    Json(payload): Json<UpdateCustomerRequest>,
) -> Result<Json<CustomerResponse>, AppError> {
    user.require_role(CUSTOMER_ROLES)?;
    payload.validate()?;

    let update = UpdateCustomer {
        name: payload.name.map(|n| n.trim().to_string()),
        emails: payload.emails,
        phones: payload.phones,
        addresses: payload.addresses,
        lead_source: payload.lead_source,
        notes: payload.notes,
    };

    let customer = state
        .db
        .update_customer(user.company_id, customer_id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Customer not found")))?;
    let financials = customer_financials(&state, user.company_id, customer_id).await?;

    tracing::info!("Customer updated");
    Ok(Json(
        CustomerResponse::new(customer, financials).project_for(user.role),
    ))
}

/// Full, unredacted statement for a customer.
async fn build_statement(
    state: &AppState,
    company_id: Uuid,
    customer_id: Uuid,
) -> Result<CustomerStatement, AppError> {
    let customer = load_customer(state, company_id, customer_id).await?;
    let listings = state
        .db
        .document_listings(company_id, Some(customer_id), None)
        .await?;

    let figures: Vec<DocumentFigures> = listings.iter().map(DocumentFigures::from).collect();
    let totals = LedgerTotals::from_figures(&figures);

    Ok(CustomerStatement {
        customer: StatementCustomer {
            id: customer.customer_id,
            address: customer.primary_address(),
            name: customer.name,
            emails: customer.emails.0,
            phones: customer.phones.0,
        },
        documents: listings.into_iter().map(StatementDocument::from).collect(),
        totals: Some(StatementTotals {
            total_invoiced: totals.invoices_value,
            total_paid: totals.total_paid,
            total_outstanding: totals.total_outstanding,
        }),
        generated_at: Utc::now(),
    })
}

/// Statement rendered to PDF for the caller's role.
async fn statement_pdf_bytes(
    state: &AppState,
    user: &AuthUser,
    statement: &CustomerStatement,
) -> Result<Vec<u8>, AppError> {
    let branding = company_branding(state, user.company_id).await?;
    let html = render_customer_statement(statement, &branding, includes_financials(user.role))
        .map_err(template_error)?;
    render_pdf(state, "customer_statement", &html, &PdfOptions::report()).await
}

#[instrument(skip_all, fields(company_id = %user.company_id, customer_id = %customer_id))]
pub async fn customer_statement(
    State(state): State<AppState>,
    user: AuthUser,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<CustomerStatement>, AppError> {
    user.require_role(CUSTOMER_ROLES)?;

    let statement = build_statement(&state, user.company_id, customer_id).await?;
    Ok(Json(statement.project_for(user.role)))
}

#[instrument(skip_all, fields(company_id = %user.company_id, customer_id = %customer_id))]
pub async fn customer_statement_pdf(
    State(state): State<AppState>,
    user: AuthUser,
    Path(customer_id): Path<Uuid>,
) -> Result<Response, AppError> {
    user.require_role(CUSTOMER_ROLES)?;

    let statement = build_statement(&state, user.company_id, customer_id)
        .await?
        .project_for(user.role);
    let bytes = statement_pdf_bytes(&state, &user, &statement).await?;

    tracing::info!(size = bytes.len(), "Customer statement PDF generated");
    Ok(pdf_attachment(
        bytes,
        &format!("statement-{}.pdf", file_slug(&statement.customer.name)),
    ))
}

#[instrument(skip_all, fields(company_id = %user.company_id, customer_id = %customer_id))]
pub async fn email_customer_statement(
    State(state): State<AppState>,
    user: AuthUser,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    user.require_role(CUSTOMER_ROLES)?;

    let statement = build_statement(&state, user.company_id, customer_id)
        .await?
        .project_for(user.role);

    let recipient = statement
        .customer
        .emails
        .preferred()
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Customer has no email address")))?;

    let bytes = statement_pdf_bytes(&state, &user, &statement).await?;
    let branding = company_branding(&state, user.company_id).await?;
    let bodies = statement_email(&statement.customer.name, &branding).map_err(template_error)?;

    let message = EmailMessage {
        to: recipient.clone(),
        subject: format!("Statement - {}", statement.customer.name),
        body_html: bodies.html,
        body_text: bodies.text,
        from_name: branding.email_from_name,
        from_address: branding.email_from_address,
        attachments: vec![EmailAttachment::pdf(
            format!("statement-{}.pdf", file_slug(&statement.customer.name)),
            bytes,
        )],
    };
    send_email(&state, "customer_statement", &message).await?;

    Ok(Json(MessageResponse::new(format!(
        "Statement sent to {}",
        recipient
    ))))
}
