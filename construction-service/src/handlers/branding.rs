use crate::dtos::branding::{BrandingResponse, UpdateBrandingRequest};
use crate::middleware::AuthUser;
use crate::models::Role;
use crate::services::branding::{branding_defaults, branding_update_from_request, resolve_branding};
use crate::AppState;
use axum::{extract::State, Json};
use service_core::error::AppError;
use tracing::instrument;

#[instrument(skip_all, fields(company_id = %user.company_id))]
pub async fn get_branding(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<BrandingResponse>, AppError> {
    let company = state.db.get_company(user.company_id).await?;
    Ok(Json(resolve_branding(
        company.as_ref(),
        &state.config.email_from,
    )))
}

/// Partial branding update. Invalid colors are dropped, empty strings clear.
#[instrument(skip_all, fields(company_id = %user.company_id))]
pub async fn update_branding(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateBrandingRequest>,
) -> Result<Json<BrandingResponse>, AppError> {
    user.require_role(&[Role::Admin])?;

    let update = branding_update_from_request(&payload);
    let company = state
        .db
        .update_branding(user.company_id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company not found")))?;

    tracing::info!("Branding updated");
    Ok(Json(resolve_branding(Some(&company), &state.config.email_from)))
}

/// Fill unset branding fields with defaults.
#[instrument(skip_all, fields(company_id = %user.company_id))]
pub async fn seed_branding(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<BrandingResponse>, AppError> {
    user.require_role(&[Role::Admin])?;

    let defaults = branding_defaults(&state.config.email_from);
    let company = state
        .db
        .seed_branding(user.company_id, &defaults)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company not found")))?;

    Ok(Json(resolve_branding(Some(&company), &state.config.email_from)))
}
