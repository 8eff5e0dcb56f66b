use super::deserialize_date;
use crate::models::{TimeLog, TimeLogType};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTimeLogRequest {
    pub task_id: Uuid,
    #[serde(deserialize_with = "deserialize_date")]
    pub date: NaiveDate,
    pub hours: Decimal,
    #[serde(rename = "type", default)]
    pub log_type: TimeLogType,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeLogQuery {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeLogUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeLogProject {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeLogTask {
    pub id: Uuid,
    pub title: String,
    pub project: TimeLogProject,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeLogResponse {
    pub id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub hours: Decimal,
    #[serde(rename = "type")]
    pub log_type: String,
    pub approved: bool,
    pub user: TimeLogUser,
    pub task: TimeLogTask,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TimeLog> for TimeLogResponse {
    fn from(log: TimeLog) -> Self {
        Self {
            id: log.time_log_id,
            task_id: log.task_id,
            user_id: log.user_id,
            date: log.date,
            hours: log.hours,
            log_type: log.log_type,
            approved: log.approved,
            user: TimeLogUser {
                id: log.user_id,
                name: log.user_name,
                email: log.user_email,
            },
            task: TimeLogTask {
                id: log.task_id,
                title: log.task_title,
                project: TimeLogProject {
                    id: log.project_id,
                    name: log.project_name,
                },
            },
            created_at: log.created_utc,
            updated_at: log.updated_utc,
        }
    }
}
