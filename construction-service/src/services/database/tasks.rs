use super::{db_error, Database};
use crate::models::{CreateTask, Task, TaskAssignee, TaskFilter, UpdateTask};
use crate::services::metrics::DB_QUERY_DURATION;
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

impl Database {
    #[instrument(skip(self, input), fields(company_id = %input.company_id, project_id = %input.project_id))]
    pub async fn create_task(&self, input: &CreateTask) -> Result<Task, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_task"])
            .start_timer();

        let task_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO tasks (task_id, company_id, project_id, title, date, duration, notes, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING task_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.company_id)
        .bind(input.project_id)
        .bind(&input.title)
        .bind(input.date)
        .bind(input.duration)
        .bind(&input.notes)
        .bind(input.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create task"))?;

        timer.observe_duration();
        info!(task_id = %task_id, "Task created");

        self.get_task(input.company_id, task_id)
            .await?
            .ok_or_else(|| AppError::DatabaseError(anyhow::anyhow!("Created task not found")))
    }

    #[instrument(skip(self))]
    pub async fn get_task(&self, company_id: Uuid, task_id: Uuid) -> Result<Option<Task>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_task"])
            .start_timer();

        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT t.task_id, t.company_id, t.project_id, t.title, t.date, t.duration, t.notes, t.status,
                   p.name AS project_name, p.status AS project_status, t.created_utc, t.updated_utc
            FROM tasks t
            JOIN projects p ON p.project_id = t.project_id
            WHERE t.company_id = $1 AND t.task_id = $2
            "#,
        )
        .bind(company_id)
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get task"))?;

        timer.observe_duration();
        Ok(task)
    }

    /// Tasks ordered by date, latest first. `assigned_to` narrows to one user's assignments.
    #[instrument(skip(self, filter))]
    pub async fn list_tasks(
        &self,
        company_id: Uuid,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_tasks"])
            .start_timer();

        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT t.task_id, t.company_id, t.project_id, t.title, t.date, t.duration, t.notes, t.status,
                   p.name AS project_name, p.status AS project_status, t.created_utc, t.updated_utc
            FROM tasks t
            JOIN projects p ON p.project_id = t.project_id
            WHERE t.company_id = $1
              AND ($2::uuid IS NULL OR t.project_id = $2)
              AND ($3::uuid IS NULL OR EXISTS (
                    SELECT 1 FROM task_assignments a WHERE a.task_id = t.task_id AND a.user_id = $3
              ))
            ORDER BY t.date DESC, t.created_utc DESC
            "#,
        )
        .bind(company_id)
        .bind(filter.project_id)
        .bind(filter.assigned_to)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list tasks"))?;

        timer.observe_duration();
        Ok(tasks)
    }

    #[instrument(skip(self, update))]
    pub async fn update_task(
        &self,
        company_id: Uuid,
        task_id: Uuid,
        update: &UpdateTask,
    ) -> Result<Option<Task>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_task"])
            .start_timer();

        let updated: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE tasks SET
                title = COALESCE($3, title),
                date = COALESCE($4, date),
                duration = COALESCE($5, duration),
                notes = COALESCE($6, notes),
                status = COALESCE($7, status),
                updated_utc = NOW()
            WHERE company_id = $1 AND task_id = $2
            RETURNING task_id
            "#,
        )
        .bind(company_id)
        .bind(task_id)
        .bind(&update.title)
        .bind(update.date)
        .bind(update.duration)
        .bind(&update.notes)
        .bind(update.status.map(|s| s.as_str()))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("update task"))?;

        timer.observe_duration();

        match updated {
            Some(task_id) => {
                info!(task_id = %task_id, "Task updated");
                self.get_task(company_id, task_id).await
            }
            None => Ok(None),
        }
    }

    /// Assigned users for a set of tasks.
    #[instrument(skip(self, task_ids), fields(tasks = task_ids.len()))]
    pub async fn task_assignees(&self, task_ids: &[Uuid]) -> Result<Vec<TaskAssignee>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["task_assignees"])
            .start_timer();

        let assignees = sqlx::query_as::<_, TaskAssignee>(
            r#"
            SELECT a.task_id, u.user_id, u.name, u.email
            FROM task_assignments a
            JOIN users u ON u.user_id = a.user_id
            WHERE a.task_id = ANY($1)
            ORDER BY u.name ASC
            "#,
        )
        .bind(task_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("load task assignees"))?;

        timer.observe_duration();
        Ok(assignees)
    }

    #[instrument(skip(self))]
    pub async fn is_task_assigned(&self, task_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["is_task_assigned"])
            .start_timer();

        let assigned: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM task_assignments WHERE task_id = $1 AND user_id = $2)",
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("check task assignment"))?;

        timer.observe_duration();
        Ok(assigned)
    }

    /// Replace a task's assignment set in one transaction.
    #[instrument(skip(self, user_ids), fields(users = user_ids.len()))]
    pub async fn replace_task_assignments(
        &self,
        task_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["replace_task_assignments"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("begin assignment"))?;

        sqlx::query("DELETE FROM task_assignments WHERE task_id = $1")
            .bind(task_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("clear task assignments"))?;

        sqlx::query(
            r#"
            INSERT INTO task_assignments (task_id, user_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(task_id)
        .bind(user_ids)
        .execute(&mut *tx)
        .await
        .map_err(db_error("assign task"))?;

        tx.commit().await.map_err(db_error("commit assignment"))?;

        timer.observe_duration();
        info!(task_id = %task_id, "Task assignments replaced");

        Ok(())
    }
}
