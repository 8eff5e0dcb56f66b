use super::{db_error, Database};
use crate::models::{CreateProject, Project};
use crate::services::metrics::DB_QUERY_DURATION;
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

impl Database {
    #[instrument(skip(self, input), fields(company_id = %input.company_id, customer_id = %input.customer_id))]
    pub async fn create_project(&self, input: &CreateProject) -> Result<Project, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_project"])
            .start_timer();

        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (project_id, company_id, customer_id, name, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.company_id)
        .bind(input.customer_id)
        .bind(&input.name)
        .bind(input.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create project"))?;

        timer.observe_duration();
        info!(project_id = %project.project_id, "Project created");

        Ok(project)
    }

    #[instrument(skip(self))]
    pub async fn get_project(
        &self,
        company_id: Uuid,
        project_id: Uuid,
    ) -> Result<Option<Project>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_project"])
            .start_timer();

        let project = sqlx::query_as::<_, Project>(
            "SELECT * FROM projects WHERE company_id = $1 AND project_id = $2",
        )
        .bind(company_id)
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get project"))?;

        timer.observe_duration();
        Ok(project)
    }

    #[instrument(skip(self))]
    pub async fn list_projects(
        &self,
        company_id: Uuid,
        customer_id: Option<Uuid>,
    ) -> Result<Vec<Project>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_projects"])
            .start_timer();

        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT * FROM projects
            WHERE company_id = $1 AND ($2::uuid IS NULL OR customer_id = $2)
            ORDER BY created_utc DESC
            "#,
        )
        .bind(company_id)
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list projects"))?;

        timer.observe_duration();
        Ok(projects)
    }
}
