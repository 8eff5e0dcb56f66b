use crate::models::Role;
use crate::services::Claims;
use crate::AppState;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;
use uuid::Uuid;

/// Validates the bearer token and stores the caller in request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("Missing or invalid Authorization header"))
        })?;

    let claims = state.jwt.validate(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected access token");
        AppError::Unauthorized(anyhow::anyhow!("Invalid or expired token"))
    })?;

    req.extensions_mut().insert(AuthUser::from(claims));

    Ok(next.run(req).await)
}

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub company_id: Uuid,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
            company_id: claims.company_id,
        }
    }
}

impl AuthUser {
    /// 403 unless the caller holds one of `roles`.
    pub fn require_role(&self, roles: &[Role]) -> Result<(), AppError> {
        if roles.contains(&self.role) {
            return Ok(());
        }

        tracing::warn!(
            user_id = %self.user_id,
            role = self.role.as_str(),
            "Role not permitted"
        );
        Err(AppError::Forbidden(anyhow::anyhow!(
            "Insufficient permissions for this operation"
        )))
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Authentication required")))?;

        let span = tracing::Span::current();
        span.record("user_id", tracing::field::display(user.user_id));
        span.record("company_id", tracing::field::display(user.company_id));

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            email: "a@example.com".to_string(),
            role,
            company_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_require_role() {
        assert!(user(Role::Admin)
            .require_role(&[Role::Admin, Role::Manager])
            .is_ok());
        assert!(matches!(
            user(Role::Sales).require_role(&[Role::Admin, Role::Manager]),
            Err(AppError::Forbidden(_))
        ));
    }
}
