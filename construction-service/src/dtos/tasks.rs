use super::{deserialize_date, deserialize_optional_date};
use crate::models::{Task, TaskAssignee, TaskStatus};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub project_id: Uuid,
    #[serde(deserialize_with = "deserialize_date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub duration: Decimal,
    pub notes: Option<String>,
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub date: Option<NaiveDate>,
    pub duration: Option<Decimal>,
    pub notes: Option<String>,
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTaskRequest {
    pub user_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskProject {
    pub id: Uuid,
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignedUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<TaskAssignee> for AssignedUser {
    fn from(a: TaskAssignee) -> Self {
        Self {
            id: a.user_id,
            name: a.name,
            email: a.email,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: Uuid,
    pub title: String,
    pub project_id: Uuid,
    pub date: NaiveDate,
    pub duration: Decimal,
    pub notes: Option<String>,
    pub status: String,
    pub project: TaskProject,
    pub assigned_users: Vec<AssignedUser>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskResponse {
    pub fn new(task: Task, assignees: Vec<TaskAssignee>) -> Self {
        Self {
            id: task.task_id,
            title: task.title,
            project_id: task.project_id,
            date: task.date,
            duration: task.duration,
            notes: task.notes,
            status: task.status,
            project: TaskProject {
                id: task.project_id,
                name: task.project_name,
                status: task.project_status,
            },
            assigned_users: assignees.into_iter().map(AssignedUser::from).collect(),
            created_at: task.created_utc,
            updated_at: task.updated_utc,
        }
    }
}
