use crate::dtos::auth::{AuthResponse, LoginRequest, RegisterRequest, UserResponse};
use crate::middleware::AuthUser;
use crate::models::{CreateUser, Role, User};
use crate::services::password::{hash_password, verify_password};
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

fn auth_response(state: &AppState, user: User, role: Role) -> Result<AuthResponse, AppError> {
    let access_token = state.jwt.issue(&user, role)?;
    Ok(AuthResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.expires_in(),
        user: UserResponse::from(user),
    })
}

/// Create a company on a trial and its first ADMIN.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    payload.validate()?;

    let email = payload.email.trim().to_lowercase();
    if state.db.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(anyhow::anyhow!("Email already registered")));
    }

    let password_hash = hash_password(&payload.password)?;
    let admin = CreateUser {
        company_id: Uuid::new_v4(),
        email,
        name: payload.name.trim().to_string(),
        password_hash,
        role: Role::Admin,
    };

    let (company, user) = state
        .db
        .create_company_with_admin(admin.company_id, payload.company_name.trim(), &admin)
        .await?;

    tracing::info!(
        company_id = %company.company_id,
        user_id = %user.user_id,
        "Company registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(auth_response(&state, user, Role::Admin)?),
    ))
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate()?;

    let invalid = || AppError::Unauthorized(anyhow::anyhow!("Invalid email or password"));

    let user = state
        .db
        .find_user_by_email(&payload.email.trim().to_lowercase())
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password_hash) {
        tracing::warn!(user_id = %user.user_id, "Failed login attempt");
        return Err(invalid());
    }

    let role = user.role().ok_or_else(|| {
        tracing::error!(user_id = %user.user_id, role = %user.role, "User has unknown role");
        AppError::InternalError(anyhow::anyhow!("User has an invalid role"))
    })?;

    tracing::info!(user_id = %user.user_id, company_id = %user.company_id, "User logged in");
    Ok(Json(auth_response(&state, user, role)?))
}

#[instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let current = state
        .db
        .get_user(user.company_id, user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    Ok(Json(UserResponse::from(current)))
}
