use super::{company_branding, file_slug, pdf_attachment, render_pdf, send_email, template_error};
use crate::dtos::customers::{NamedRef, StatementDocument};
use crate::dtos::projects::{
    CreateProjectRequest, ProjectFinancialSummary, ProjectFinancials, ProjectQuery,
    ProjectResponse, ProjectSummaryRef,
};
use crate::dtos::MessageResponse;
use crate::finance::{DocumentFigures, LedgerTotals};
use crate::middleware::AuthUser;
use crate::models::{CreateProject, Customer, Project, ProjectStatus, Role};
use crate::projection::RoleProjection;
use crate::services::plan_limits::{enforce_plan_limit, LimitKind};
use crate::services::{EmailAttachment, EmailMessage, PdfOptions};
use crate::templates::{project_financials_email, render_project_financials};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
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

const PROJECT_ROLES: &[Role] = &[Role::Admin, Role::Manager, Role::Sales];

async fn load_project(
    state: &AppState,
    company_id: Uuid,
    project_id: Uuid,
) -> Result<Project, AppError> {
    state
        .db
        .get_project(company_id, project_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Project not found")))
}

async fn project_totals(
    state: &AppState,
    company_id: Uuid,
    project_id: Uuid,
) -> Result<LedgerTotals, AppError> {
    let rows = state
        .db
        .document_figures(company_id, None, Some(project_id))
        .await?;
    let figures: Vec<DocumentFigures> = rows.iter().map(DocumentFigures::from).collect();
    Ok(LedgerTotals::from_figures(&figures))
}

#[instrument(skip_all, fields(company_id = %user.company_id))]
pub async fn list_projects(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<Vec<ProjectResponse>>, AppError> {
    user.require_role(PROJECT_ROLES)?;

    let projects = state
        .db
        .list_projects(user.company_id, query.customer_id)
        .await?;
    let rows = state
        .db
        .document_figures(user.company_id, query.customer_id, None)
        .await?;

    let mut figures_by_project: HashMap<Uuid, Vec<DocumentFigures>> = HashMap::new();
    for row in &rows {
        if let Some(project_id) = row.project_id {
            figures_by_project
                .entry(project_id)
                .or_default()
                .push(DocumentFigures::from(row));
        }
    }

    let response = projects
        .into_iter()
        .map(|project| {
            let totals = figures_by_project
                .get(&project.project_id)
                .map(|figures| LedgerTotals::from_figures(figures))
                .unwrap_or_default();
            ProjectResponse::new(project, ProjectFinancials::from(&totals))
        })
        .collect::<Vec<_>>()
        .project_for(user.role);

    Ok(Json(response))
}

#[instrument(skip_all, fields(company_id = %user.company_id, project_id = %project_id))]
pub async fn get_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectResponse>, AppError> {
    user.require_role(PROJECT_ROLES)?;

    let project = load_project(&state, user.company_id, project_id).await?;
    let totals = project_totals(&state, user.company_id, project_id).await?;

    Ok(Json(
        ProjectResponse::new(project, ProjectFinancials::from(&totals)).project_for(user.role),
    ))
}

#[instrument(skip_all, fields(company_id = %user.company_id))]
pub async fn create_project(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectResponse>), AppError> {
    user.require_role(PROJECT_ROLES)?;
    payload.validate()?;

    state
        .db
        .get_customer(user.company_id, payload.customer_id)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!(
                "Customer not found or does not belong to your company"
            ))
        })?;

    enforce_plan_limit(&state.db, user.company_id, LimitKind::Projects).await?;

    let input = CreateProject {
        company_id: user.company_id,
        customer_id: payload.customer_id,
        name: payload.name.trim().to_string(),
        status: payload.status.unwrap_or(ProjectStatus::Pending),
    };
    let project = state.db.create_project(&input).await?;

    tracing::info!(project_id = %project.project_id, "Project created");

    Ok((
        StatusCode::CREATED,
        Json(
            ProjectResponse::new(project, ProjectFinancials::from(&LedgerTotals::default()))
                .project_for(user.role),
        ),
    ))
}

/// Project, its customer, and the unredacted financial summary.
async fn build_summary(
    state: &AppState,
    company_id: Uuid,
    project_id: Uuid,
) -> Result<(ProjectFinancialSummary, Customer), AppError> {
    let project = load_project(state, company_id, project_id).await?;
    let customer = state
        .db
        .get_customer(company_id, project.customer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Customer not found")))?;

    let listings = state
        .db
        .document_listings(company_id, None, Some(project_id))
        .await?;
    let figures: Vec<DocumentFigures> = listings.iter().map(DocumentFigures::from).collect();
    let totals = LedgerTotals::from_figures(&figures);

    let summary = ProjectFinancialSummary {
        project: ProjectSummaryRef {
            id: project.project_id,
            name: project.name,
            status: project.status,
        },
        customer: NamedRef {
            id: customer.customer_id,
            name: customer.name.clone(),
        },
        documents: listings.into_iter().map(StatementDocument::from).collect(),
        financials: ProjectFinancials::from(&totals),
        generated_at: Utc::now(),
    };

    Ok((summary, customer))
}

async fn summary_pdf_bytes(
    state: &AppState,
    user: &AuthUser,
    summary: &ProjectFinancialSummary,
) -> Result<Vec<u8>, AppError> {
    let branding = company_branding(state, user.company_id).await?;
    let include_financials = matches!(user.role, Role::Admin | Role::Manager);
    let html = render_project_financials(summary, &branding, include_financials)
        .map_err(template_error)?;
    render_pdf(state, "project_financials", &html, &PdfOptions::report()).await
}

#[instrument(skip_all, fields(company_id = %user.company_id, project_id = %project_id))]
pub async fn project_financials(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectFinancialSummary>, AppError> {
    user.require_role(PROJECT_ROLES)?;

    let (summary, _) = build_summary(&state, user.company_id, project_id).await?;
    Ok(Json(summary.project_for(user.role)))
}

#[instrument(skip_all, fields(company_id = %user.company_id, project_id = %project_id))]
pub async fn project_financials_pdf(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<Response, AppError> {
    user.require_role(PROJECT_ROLES)?;

    let (summary, _) = build_summary(&state, user.company_id, project_id).await?;
    let summary = summary.project_for(user.role);
    let bytes = summary_pdf_bytes(&state, &user, &summary).await?;

    tracing::info!(size = bytes.len(), "Project financials PDF generated");
    Ok(pdf_attachment(
        bytes,
        &format!("project-financials-{}.pdf", file_slug(&summary.project.name)),
    ))
}

#[instrument(skip_all, fields(company_id = %user.company_id, project_id = %project_id))]
pub async fn email_project_financials(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    user.require_role(PROJECT_ROLES)?;

    let (summary, customer) = build_summary(&state, user.company_id, project_id).await?;
    let summary = summary.project_for(user.role);

    let recipient = customer
        .emails
        .preferred()
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Customer has no email address")))?;

    let bytes = summary_pdf_bytes(&state, &user, &summary).await?;
    let branding = company_branding(&state, user.company_id).await?;
    let bodies = project_financials_email(&customer.name, &summary.project.name, &branding)
        .map_err(template_error)?;

    let message = EmailMessage {
        to: recipient.clone(),
        subject: format!("Project Financial Summary - {}", summary.project.name),
        body_html: bodies.html,
        body_text: bodies.text,
        from_name: branding.email_from_name,
        from_address: branding.email_from_address,
        attachments: vec![EmailAttachment::pdf(
            format!("project-financials-{}.pdf", file_slug(&summary.project.name)),
            bytes,
        )],
    };
    send_email(&state, "project_financials", &message).await?;

    Ok(Json(MessageResponse::new(format!(
        "Project financial summary sent to {}",
        recipient
    ))))
}
