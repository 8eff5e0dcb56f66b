use super::AuthUser;
use crate::models::subscription_allows_access;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

/// Blocks business routes unless the caller's company is ACTIVE or TRIALING.
/// Must run after [`super::auth_middleware`].
pub async fn subscription_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Authentication required")))?;

    let status = state
        .db
        .get_company(user.company_id)
        .await?
        .map(|company| company.subscription_status)
        .filter(|status| !status.is_empty());

    if !subscription_allows_access(status.as_deref()) {
        let status = status.unwrap_or_default();
        tracing::warn!(company_id = %user.company_id, status = %status, "Subscription blocks access");
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Subscription is {}. Please update your subscription.",
            status.to_lowercase()
        )));
    }

    Ok(next.run(req).await)
}
