use super::{db_error, Database};
use crate::models::{CreateTimeLog, TimeLog, TimeLogFilter};
use crate::services::metrics::DB_QUERY_DURATION;
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

impl Database {
    #[instrument(skip(self, input), fields(company_id = %input.company_id, task_id = %input.task_id))]
    pub async fn create_time_log(&self, input: &CreateTimeLog) -> Result<TimeLog, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_time_log"])
            .start_timer();

        let time_log_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO time_logs (time_log_id, company_id, task_id, user_id, date, hours, log_type, approved)
            VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE)
            RETURNING time_log_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.company_id)
        .bind(input.task_id)
        .bind(input.user_id)
        .bind(input.date)
        .bind(input.hours)
        .bind(input.log_type.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create time log"))?;

        timer.observe_duration();
        info!(time_log_id = %time_log_id, "Time log created");

        self.get_time_log(input.company_id, time_log_id)
            .await?
            .ok_or_else(|| AppError::DatabaseError(anyhow::anyhow!("Created time log not found")))
    }

    #[instrument(skip(self))]
    pub async fn get_time_log(
        &self,
        company_id: Uuid,
        time_log_id: Uuid,
    ) -> Result<Option<TimeLog>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_time_log"])
            .start_timer();

        let log = sqlx::query_as::<_, TimeLog>(
            r#"
            SELECT l.time_log_id, l.company_id, l.task_id, l.user_id, l.date, l.hours, l.log_type, l.approved,
                   u.name AS user_name, u.email AS user_email, t.title AS task_title,
                   p.project_id, p.name AS project_name, l.created_utc, l.updated_utc
            FROM time_logs l
            JOIN users u ON u.user_id = l.user_id
            JOIN tasks t ON t.task_id = l.task_id
            JOIN projects p ON p.project_id = t.project_id
            WHERE l.company_id = $1 AND l.time_log_id = $2
            "#,
        )
        .bind(company_id)
        .bind(time_log_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get time log"))?;

        timer.observe_duration();
        Ok(log)
    }

    /// Time logs ordered by date, latest first.
    #[instrument(skip(self, filter))]
    pub async fn list_time_logs(
        &self,
        company_id: Uuid,
        filter: &TimeLogFilter,
    ) -> Result<Vec<TimeLog>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_time_logs"])
            .start_timer();

        let logs = sqlx::query_as::<_, TimeLog>(
            r#"
            SELECT l.time_log_id, l.company_id, l.task_id, l.user_id, l.date, l.hours, l.log_type, l.approved,
                   u.name AS user_name, u.email AS user_email, t.title AS task_title,
                   p.project_id, p.name AS project_name, l.created_utc, l.updated_utc
            FROM time_logs l
            JOIN users u ON u.user_id = l.user_id
            JOIN tasks t ON t.task_id = l.task_id
            JOIN projects p ON p.project_id = t.project_id
            WHERE l.company_id = $1 AND ($2::uuid IS NULL OR l.user_id = $2)
            ORDER BY l.date DESC, l.created_utc DESC
            "#,
        )
        .bind(company_id)
        .bind(filter.user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list time logs"))?;

        timer.observe_duration();
        Ok(logs)
    }
}
