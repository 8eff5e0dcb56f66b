use crate::finance::{DashboardSummary, DocumentFigures};
use crate::middleware::AuthUser;
use crate::models::Role;
use crate::projection::RoleProjection;
use crate::AppState;
use axum::{extract::State, Json};
use chrono::Utc;
use service_core::error::AppError;
use tracing::instrument;

/// Document counts and money totals for the caller's company.
#[instrument(skip_all, fields(company_id = %user.company_id))]
pub async fn dashboard_summary(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<DashboardSummary>, AppError> {
    user.require_role(&[Role::Admin, Role::Manager, Role::Sales])?;

    let rows = state.db.document_figures(user.company_id, None, None).await?;
    let figures: Vec<DocumentFigures> = rows.iter().map(DocumentFigures::from).collect();

    let summary = DashboardSummary::build(&figures, Utc::now());
    tracing::debug!(documents = figures.len(), "Dashboard summary built");

    Ok(Json(summary.project_for(user.role)))
}
