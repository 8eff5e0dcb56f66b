//! Task model and assignments.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "COMPLETED",
        }
    }
}

/// Task row joined with its project summary.
#[derive(Debug, Clone, FromRow)]
pub struct Task {
    pub task_id: Uuid,
    pub company_id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub date: NaiveDate,
    pub duration: Decimal,
    pub notes: Option<String>,
    pub status: String,
    pub project_name: String,
    pub project_status: String,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct TaskAssignee {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
}

/// Input for creating a task.
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub company_id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub date: NaiveDate,
    pub duration: Decimal,
    pub notes: Option<String>,
    pub status: TaskStatus,
}

/// Input for a partial task update.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub duration: Option<Decimal>,
    pub notes: Option<String>,
    pub status: Option<TaskStatus>,
}

impl UpdateTask {
    /// Workers may only change status and notes.
    pub fn restrict_to_worker_fields(self) -> Self {
        Self {
            notes: self.notes,
            status: self.status,
            ..Default::default()
        }
    }
}

/// Filter parameters for listing tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub project_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
}
