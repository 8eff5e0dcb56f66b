//! Time log model.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeLogType {
    #[default]
    Regular,
    Overtime,
}

impl TimeLogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeLogType::Regular => "REGULAR",
            TimeLogType::Overtime => "OVERTIME",
        }
    }
}

/// Time log row joined with its user, task and project.
#[derive(Debug, Clone, FromRow)]
pub struct TimeLog {
    pub time_log_id: Uuid,
    pub company_id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub hours: Decimal,
    pub log_type: String,
    pub approved: bool,
    pub user_name: String,
    pub user_email: String,
    pub task_title: String,
    pub project_id: Uuid,
    pub project_name: String,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for creating a time log.
#[derive(Debug, Clone)]
pub struct CreateTimeLog {
    pub company_id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub hours: Decimal,
    pub log_type: TimeLogType,
}

/// Filter parameters for listing time logs.
#[derive(Debug, Clone, Default)]
pub struct TimeLogFilter {
    pub user_id: Option<Uuid>,
}
