use crate::dtos::tasks::{
    AssignTaskRequest, CreateTaskRequest, TaskQuery, TaskResponse, UpdateTaskRequest,
};
use crate::middleware::AuthUser;
use crate::models::{CreateTask, Role, Task, TaskAssignee, TaskFilter, TaskStatus, UpdateTask};
use crate::services::plan_limits::{enforce_plan_limit, LimitKind};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use std::collections::{BTreeSet, HashMap};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

const TASK_ROLES: &[Role] = &[Role::Admin, Role::Manager, Role::Worker];
const PLANNER_ROLES: &[Role] = &[Role::Admin, Role::Manager];

/// Attach assignees to each task, keeping the task order.
async fn with_assignees(state: &AppState, tasks: Vec<Task>) -> Result<Vec<TaskResponse>, AppError> {
    let ids: Vec<Uuid> = tasks.iter().map(|t| t.task_id).collect();
    let mut by_task: HashMap<Uuid, Vec<TaskAssignee>> = HashMap::new();
    for assignee in state.db.task_assignees(&ids).await? {
        by_task.entry(assignee.task_id).or_default().push(assignee);
    }

    Ok(tasks
        .into_iter()
        .map(|task| {
            let assignees = by_task.remove(&task.task_id).unwrap_or_default();
            TaskResponse::new(task, assignees)
        })
        .collect())
}

async fn task_response(state: &AppState, task: Task) -> Result<TaskResponse, AppError> {
    let assignees = state.db.task_assignees(&[task.task_id]).await?;
    Ok(TaskResponse::new(task, assignees))
}

async fn load_task(state: &AppState, company_id: Uuid, task_id: Uuid) -> Result<Task, AppError> {
    state
        .db
        .get_task(company_id, task_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Task not found")))
}

/// Workers only see tasks they are assigned to.
async fn ensure_worker_assigned(
    state: &AppState,
    user: &AuthUser,
    task_id: Uuid,
) -> Result<(), AppError> {
    if user.role != Role::Worker {
        return Ok(());
    }
    if state.db.is_task_assigned(task_id, user.user_id).await? {
        return Ok(());
    }

    tracing::warn!(user_id = %user.user_id, task_id = %task_id, "Worker not assigned to task");
    Err(AppError::Forbidden(anyhow::anyhow!(
        "You can only access tasks assigned to you"
    )))
}

#[instrument(skip_all, fields(company_id = %user.company_id))]
pub async fn list_tasks(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TaskQuery>,
) -> Result<Json<Vec<TaskResponse>>, AppError> {
    user.require_role(TASK_ROLES)?;

    let filter = TaskFilter {
        project_id: query.project_id,
        assigned_to: (user.role == Role::Worker).then_some(user.user_id),
    };
    let tasks = state.db.list_tasks(user.company_id, &filter).await?;

    Ok(Json(with_assignees(&state, tasks).await?))
}

#[instrument(skip_all, fields(company_id = %user.company_id, task_id = %task_id))]
pub async fn get_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(task_id): Path<Uuid>,
) -> Result<Json<TaskResponse>, AppError> {
    user.require_role(TASK_ROLES)?;

    let task = load_task(&state, user.company_id, task_id).await?;
    ensure_worker_assigned(&state, &user, task_id).await?;

    Ok(Json(task_response(&state, task).await?))
}

#[instrument(skip_all, fields(company_id = %user.company_id))]
pub async fn create_task(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), AppError> {
    user.require_role(PLANNER_ROLES)?;
    payload.validate()?;

    state
        .db
        .get_project(user.company_id, payload.project_id)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!(
                "Project not found or does not belong to your company"
            ))
        })?;

    enforce_plan_limit(&state.db, user.company_id, LimitKind::Tasks).await?;

    let input = CreateTask {
        company_id: user.company_id,
        project_id: payload.project_id,
        title: payload.title.trim().to_string(),
        date: payload.date,
        duration: payload.duration,
        notes: payload.notes,
        status: payload.status.unwrap_or(TaskStatus::Pending),
    };
    let task = state.db.create_task(&input).await?;

    tracing::info!(task_id = %task.task_id, project_id = %task.project_id, "Task created");

    Ok((
        StatusCode::CREATED,
        Json(TaskResponse::new(task, Vec::new())),
    ))
}

#[instrument(skip_all, fields(company_id = %user.company_id, task_id = %task_id))]
pub async fn update_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<Json<TaskResponse>, AppError> {
    user.require_role(TASK_ROLES)?;
    payload.validate()?;

    load_task(&state, user.company_id, task_id).await?;
    ensure_worker_assigned(&state, &user, task_id).await?;

    let mut update = UpdateTask {
        title: payload.title.map(|t| t.trim().to_string()),
        date: payload.date,
        duration: payload.duration,
        notes: payload.notes,
        status: payload.status,
    };
    if user.role == Role::Worker {
        update = update.restrict_to_worker_fields();
    }

    let task = state
        .db
        .update_task(user.company_id, task_id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Task not found")))?;

    Ok(Json(task_response(&state, task).await?))
}

/// Replace the task's assignees.
#[instrument(skip_all, fields(company_id = %user.company_id, task_id = %task_id))]
pub async fn assign_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<AssignTaskRequest>,
) -> Result<Json<TaskResponse>, AppError> {
    user.require_role(PLANNER_ROLES)?;

    let user_ids: Vec<Uuid> = payload
        .user_ids
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    load_task(&state, user.company_id, task_id).await?;

    let found = state
        .db
        .count_company_users(user.company_id, &user_ids)
        .await?;
    if found != user_ids.len() as i64 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "One or more users not found in your company"
        )));
    }

    state.db.replace_task_assignments(task_id, &user_ids).await?;
    tracing::info!(assignees = user_ids.len(), "Task assignments replaced");

    let task = load_task(&state, user.company_id, task_id).await?;
    Ok(Json(task_response(&state, task).await?))
}
