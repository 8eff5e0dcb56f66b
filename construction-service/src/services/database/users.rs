use super::{db_error, Database};
use crate::models::{CreateUser, User};
use crate::services::metrics::DB_QUERY_DURATION;
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

impl Database {
    /// Login lookup. Emails are stored lowercased.
    #[instrument(skip(self, email))]
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_user_by_email"])
            .start_timer();

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("find user"))?;

        timer.observe_duration();
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, company_id: Uuid, user_id: Uuid) -> Result<Option<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_user"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE company_id = $1 AND user_id = $2",
        )
        .bind(company_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get user"))?;

        timer.observe_duration();
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self, company_id: Uuid) -> Result<Vec<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_users"])
            .start_timer();

        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE company_id = $1 ORDER BY name ASC",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list users"))?;

        timer.observe_duration();
        Ok(users)
    }

    #[instrument(skip(self, input), fields(company_id = %input.company_id, role = input.role.as_str()))]
    pub async fn create_user(&self, input: &CreateUser) -> Result<User, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_user"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (user_id, company_id, email, name, password_hash, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.company_id)
        .bind(&input.email)
        .bind(&input.name)
        .bind(&input.password_hash)
        .bind(input.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create user"))?;

        timer.observe_duration();
        info!(user_id = %user.user_id, "User created");

        Ok(user)
    }

    /// How many of `user_ids` belong to the company.
    #[instrument(skip(self, user_ids), fields(requested = user_ids.len()))]
    pub async fn count_company_users(
        &self,
        company_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<i64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["count_company_users"])
            .start_timer();

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE company_id = $1 AND user_id = ANY($2)",
        )
        .bind(company_id)
        .bind(user_ids)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("count users"))?;

        timer.observe_duration();
        Ok(count)
    }
}
