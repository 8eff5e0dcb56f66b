use crate::dtos::auth::{CreateUserRequest, UserResponse};
use crate::middleware::AuthUser;
use crate::models::{CreateUser, Role};
use crate::services::password::hash_password;
use crate::services::plan_limits::{enforce_plan_limit, LimitKind};
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;
use tracing::instrument;
use validator::Validate;

#[instrument(skip_all, fields(company_id = %user.company_id))]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    user.require_role(&[Role::Admin, Role::Manager])?;

    let users = state.db.list_users(user.company_id).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Add a user to the caller's company.
#[instrument(skip_all, fields(company_id = %user.company_id))]
pub async fn create_user(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    user.require_role(&[Role::Admin])?;
    payload.validate()?;

    enforce_plan_limit(&state.db, user.company_id, LimitKind::Users).await?;

    let input = CreateUser {
        company_id: user.company_id,
        email: payload.email.trim().to_lowercase(),
        name: payload.name.trim().to_string(),
        password_hash: hash_password(&payload.password)?,
        role: payload.role,
    };
    let created = state.db.create_user(&input).await?;

    tracing::info!(
        user_id = %created.user_id,
        role = %created.role,
        "User created"
    );

    Ok((StatusCode::CREATED, Json(UserResponse::from(created))))
}
