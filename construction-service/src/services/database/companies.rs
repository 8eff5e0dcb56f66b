use super::{db_error, Database};
use crate::models::{Company, CreateUser, SubscriptionUpdate, UpdateBranding, UsageCounts, User};
use crate::services::metrics::DB_QUERY_DURATION;
use chrono::{Duration, Utc};
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

/// Length of the free trial granted at registration.
pub const TRIAL_DAYS: i64 = 14;

/// Values written by the branding seed into blank columns.
#[derive(Debug, Clone)]
pub struct BrandingDefaults {
    pub display_name: String,
    pub primary_color: String,
    pub accent_color: String,
    pub email_from_name: String,
    pub email_from_address: String,
}

impl Database {
    /// Create a company and its first ADMIN in one transaction.
    #[instrument(skip(self, admin), fields(company_id = %company_id, email = %admin.email))]
    pub async fn create_company_with_admin(
        &self,
        company_id: Uuid,
        company_name: &str,
        admin: &CreateUser,
    ) -> Result<(Company, User), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_company_with_admin"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("begin registration"))?;

        let company = sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (company_id, name, trial_ends_at)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(company_name)
        .bind(Utc::now() + Duration::days(TRIAL_DAYS))
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("create company"))?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (user_id, company_id, email, name, password_hash, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company.company_id)
        .bind(&admin.email)
        .bind(&admin.name)
        .bind(&admin.password_hash)
        .bind(admin.role.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("create admin user"))?;

        tx.commit().await.map_err(db_error("commit registration"))?;

        timer.observe_duration();
        info!(company_id = %company.company_id, user_id = %user.user_id, "Company registered");

        Ok((company, user))
    }

    #[instrument(skip(self))]
    pub async fn get_company(&self, company_id: Uuid) -> Result<Option<Company>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_company"])
            .start_timer();

        let company =
            sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE company_id = $1")
                .bind(company_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("get company"))?;

        timer.observe_duration();
        Ok(company)
    }

    /// Apply subscription fields from Stripe. Absent fields are left alone.
    #[instrument(skip(self, update))]
    pub async fn update_subscription(
        &self,
        company_id: Uuid,
        update: &SubscriptionUpdate,
    ) -> Result<Option<Company>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_subscription"])
            .start_timer();

        let company = sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies SET
                subscription_status = COALESCE($2, subscription_status),
                plan = COALESCE($3, plan),
                stripe_customer_id = COALESCE($4, stripe_customer_id),
                stripe_subscription_id = CASE WHEN $5 THEN $6 ELSE stripe_subscription_id END,
                updated_utc = NOW()
            WHERE company_id = $1
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(&update.status)
        .bind(update.plan.map(|p| p.as_str()))
        .bind(&update.stripe_customer_id)
        .bind(update.stripe_subscription_id.is_some())
        .bind(update.stripe_subscription_id.clone().flatten())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("update subscription"))?;

        timer.observe_duration();
        if company.is_some() {
            info!(company_id = %company_id, status = ?update.status, "Subscription updated");
        }

        Ok(company)
    }

    #[instrument(skip(self))]
    pub async fn find_company_by_stripe_subscription(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<Company>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_company_by_stripe_subscription"])
            .start_timer();

        let company = sqlx::query_as::<_, Company>(
            "SELECT * FROM companies WHERE stripe_subscription_id = $1 LIMIT 1",
        )
        .bind(stripe_subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find company by Stripe subscription"))?;

        timer.observe_duration();
        Ok(company)
    }

    /// Partial branding update. `Some(None)` clears a column.
    #[instrument(skip(self, update))]
    pub async fn update_branding(
        &self,
        company_id: Uuid,
        update: &UpdateBranding,
    ) -> Result<Option<Company>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_branding"])
            .start_timer();

        let company = sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies SET
                display_name = CASE WHEN $2 THEN $3 ELSE display_name END,
                logo_url = CASE WHEN $4 THEN $5 ELSE logo_url END,
                primary_color = CASE WHEN $6 THEN $7 ELSE primary_color END,
                accent_color = CASE WHEN $8 THEN $9 ELSE accent_color END,
                email_from_name = CASE WHEN $10 THEN $11 ELSE email_from_name END,
                email_from_address = CASE WHEN $12 THEN $13 ELSE email_from_address END,
                updated_utc = NOW()
            WHERE company_id = $1
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(update.display_name.is_some())
        .bind(update.display_name.clone().flatten())
        .bind(update.logo_url.is_some())
        .bind(update.logo_url.clone().flatten())
        .bind(update.primary_color.is_some())
        .bind(update.primary_color.clone().flatten())
        .bind(update.accent_color.is_some())
        .bind(update.accent_color.clone().flatten())
        .bind(update.email_from_name.is_some())
        .bind(update.email_from_name.clone().flatten())
        .bind(update.email_from_address.is_some())
        .bind(update.email_from_address.clone().flatten())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("update branding"))?;

        timer.observe_duration();
        info!(company_id = %company_id, "Branding updated");

        Ok(company)
    }

    /// Fill blank branding columns with defaults. The logo is never seeded.
    #[instrument(skip(self, defaults))]
    pub async fn seed_branding(
        &self,
        company_id: Uuid,
        defaults: &BrandingDefaults,
    ) -> Result<Option<Company>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["seed_branding"])
            .start_timer();

        let company = sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies SET
                display_name = CASE WHEN display_name IS NULL OR btrim(display_name) = '' THEN $2 ELSE display_name END,
                primary_color = CASE WHEN primary_color IS NULL OR btrim(primary_color) = '' THEN $3 ELSE primary_color END,
                accent_color = CASE WHEN accent_color IS NULL OR btrim(accent_color) = '' THEN $4 ELSE accent_color END,
                email_from_name = CASE WHEN email_from_name IS NULL OR btrim(email_from_name) = '' THEN $5 ELSE email_from_name END,
                email_from_address = CASE WHEN email_from_address IS NULL OR btrim(email_from_address) = '' THEN $6 ELSE email_from_address END,
                updated_utc = NOW()
            WHERE company_id = $1
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(&defaults.display_name)
        .bind(&defaults.primary_color)
        .bind(&defaults.accent_color)
        .bind(&defaults.email_from_name)
        .bind(&defaults.email_from_address)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("seed branding"))?;

        timer.observe_duration();
        Ok(company)
    }

    /// Rows counted against plan limits.
    #[instrument(skip(self))]
    pub async fn usage_counts(&self, company_id: Uuid) -> Result<UsageCounts, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["usage_counts"])
            .start_timer();

        let counts = sqlx::query_as::<_, UsageCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users WHERE company_id = $1) AS users,
                (SELECT COUNT(*) FROM projects WHERE company_id = $1) AS projects,
                (SELECT COUNT(*) FROM documents WHERE company_id = $1) AS documents,
                (SELECT COUNT(*) FROM tasks WHERE company_id = $1) AS tasks
            "#,
        )
        .bind(company_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("count usage"))?;

        timer.observe_duration();
        Ok(counts)
    }
}
