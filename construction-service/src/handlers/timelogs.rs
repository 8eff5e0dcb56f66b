use crate::dtos::timelogs::{CreateTimeLogRequest, TimeLogQuery, TimeLogResponse};
use crate::middleware::AuthUser;
use crate::models::{CreateTimeLog, Role, TimeLogFilter};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use service_core::error::AppError;
use tracing::instrument;
use uuid::Uuid;

const TIMELOG_ROLES: &[Role] = &[Role::Admin, Role::Manager, Role::Worker];

#[instrument(skip_all, fields(company_id = %user.company_id))]
pub async fn list_time_logs(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TimeLogQuery>,
) -> Result<Json<Vec<TimeLogResponse>>, AppError> {
    user.require_role(TIMELOG_ROLES)?;

    // Workers are pinned to their own logs whatever they ask for.
    let user_id = if user.role == Role::Worker {
        Some(user.user_id)
    } else {
        query.user_id
    };

    let logs = state
        .db
        .list_time_logs(user.company_id, &TimeLogFilter { user_id })
        .await?;

    Ok(Json(logs.into_iter().map(TimeLogResponse::from).collect()))
}

#[instrument(skip_all, fields(company_id = %user.company_id, time_log_id = %time_log_id))]
pub async fn get_time_log(
    State(state): State<AppState>,
    user: AuthUser,
    Path(time_log_id): Path<Uuid>,
) -> Result<Json<TimeLogResponse>, AppError> {
    user.require_role(TIMELOG_ROLES)?;

    let log = state
        .db
        .get_time_log(user.company_id, time_log_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Time log not found")))?;

    if user.role == Role::Worker && log.user_id != user.user_id {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "You can only view your own time logs"
        )));
    }

    Ok(Json(TimeLogResponse::from(log)))
}

#[instrument(skip_all, fields(company_id = %user.company_id))]
pub async fn create_time_log(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateTimeLogRequest>,
) -> Result<(StatusCode, Json<TimeLogResponse>), AppError> {
    user.require_role(&[Role::Worker])?;

    if payload.hours <= Decimal::ZERO {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Hours must be greater than 0"
        )));
    }

    state
        .db
        .get_task(user.company_id, payload.task_id)
        .await?
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Task not found")))?;

    let input = CreateTimeLog {
        company_id: user.company_id,
        task_id: payload.task_id,
        user_id: user.user_id,
        date: payload.date,
        hours: payload.hours,
        log_type: payload.log_type,
    };
    let log = state.db.create_time_log(&input).await?;

    tracing::info!(
        time_log_id = %log.time_log_id,
        hours = %log.hours,
        log_type = %log.log_type,
        "Time logged"
    );

    Ok((StatusCode::CREATED, Json(TimeLogResponse::from(log))))
}
