use super::{db_error, Database};
use crate::models::{CreateCustomer, Customer, DocumentFigureRow, DocumentListing, UpdateCustomer};
use crate::services::metrics::DB_QUERY_DURATION;
use service_core::error::AppError;
use sqlx::types::Json;
use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;

impl Database {
    #[instrument(skip(self, input), fields(company_id = %input.company_id))]
    pub async fn create_customer(&self, input: &CreateCustomer) -> Result<Customer, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_customer"])
            .start_timer();

        let customer = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (customer_id, company_id, name, emails, phones, addresses, lead_source, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.company_id)
        .bind(&input.name)
        .bind(Json(&input.emails))
        .bind(Json(&input.phones))
        .bind(Json(&input.addresses))
        .bind(&input.lead_source)
        .bind(&input.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create customer"))?;

        timer.observe_duration();
        info!(customer_id = %customer.customer_id, "Customer created");

        Ok(customer)
    }

    #[instrument(skip(self))]
    pub async fn get_customer(
        &self,
        company_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Option<Customer>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_customer"])
            .start_timer();

        let customer = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE company_id = $1 AND customer_id = $2",
        )
        .bind(company_id)
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get customer"))?;

        timer.observe_duration();
        Ok(customer)
    }

    #[instrument(skip(self))]
    pub async fn list_customers(&self, company_id: Uuid) -> Result<Vec<Customer>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_customers"])
            .start_timer();

        let customers = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE company_id = $1 ORDER BY created_utc DESC",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list customers"))?;

        timer.observe_duration();
        Ok(customers)
    }

    #[instrument(skip(self, update))]
    pub async fn update_customer(
        &self,
        company_id: Uuid,
        customer_id: Uuid,
        update: &UpdateCustomer,
    ) -> Result<Option<Customer>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_customer"])
            .start_timer();

        let customer = sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers SET
                name = COALESCE($3, name),
                emails = COALESCE($4, emails),
                phones = COALESCE($5, phones),
                addresses = COALESCE($6, addresses),
                lead_source = COALESCE($7, lead_source),
                notes = COALESCE($8, notes),
                updated_utc = NOW()
            WHERE company_id = $1 AND customer_id = $2
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(customer_id)
        .bind(&update.name)
        .bind(update.emails.as_ref().map(Json))
        .bind(update.phones.as_ref().map(Json))
        .bind(update.addresses.as_ref().map(Json))
        .bind(&update.lead_source)
        .bind(&update.notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("update customer"))?;

        timer.observe_duration();
        if customer.is_some() {
            info!(customer_id = %customer_id, "Customer updated");
        }

        Ok(customer)
    }

    /// Money columns of the company's documents, optionally narrowed to one
    /// customer or project.
    #[instrument(skip(self))]
    pub async fn document_figures(
        &self,
        company_id: Uuid,
        customer_id: Option<Uuid>,
        project_id: Option<Uuid>,
    ) -> Result<Vec<DocumentFigureRow>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["document_figures"])
            .start_timer();

        let rows = sqlx::query_as::<_, DocumentFigureRow>(
            r#"
            SELECT customer_id, project_id, document_type, status, total_value, balance_due, updated_utc
            FROM documents
            WHERE company_id = $1
              AND ($2::uuid IS NULL OR customer_id = $2)
              AND ($3::uuid IS NULL OR project_id = $3)
            "#,
        )
        .bind(company_id)
        .bind(customer_id)
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("load document figures"))?;

        timer.observe_duration();
        Ok(rows)
    }

    /// Project count per customer.
    #[instrument(skip(self))]
    pub async fn project_counts(
        &self,
        company_id: Uuid,
        customer_id: Option<Uuid>,
    ) -> Result<HashMap<Uuid, i64>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["project_counts"])
            .start_timer();

        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            r#"
            SELECT customer_id, COUNT(*)
            FROM projects
            WHERE company_id = $1 AND ($2::uuid IS NULL OR customer_id = $2)
            GROUP BY customer_id
            "#,
        )
        .bind(company_id)
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("count projects"))?;

        timer.observe_duration();
        Ok(rows.into_iter().collect())
    }

    /// Documents for a statement or project summary, newest first.
    #[instrument(skip(self))]
    pub async fn document_listings(
        &self,
        company_id: Uuid,
        customer_id: Option<Uuid>,
        project_id: Option<Uuid>,
    ) -> Result<Vec<DocumentListing>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["document_listings"])
            .start_timer();

        let rows = sqlx::query_as::<_, DocumentListing>(
            r#"
            SELECT d.document_id, d.number, d.document_type, d.status, d.total_value, d.balance_due,
                   d.sent_date, d.due_date, d.updated_utc, d.project_id, p.name AS project_name
            FROM documents d
            LEFT JOIN projects p ON p.project_id = d.project_id AND p.company_id = d.company_id
            WHERE d.company_id = $1
              AND ($2::uuid IS NULL OR d.customer_id = $2)
              AND ($3::uuid IS NULL OR d.project_id = $3)
            ORDER BY d.created_utc DESC
            "#,
        )
        .bind(company_id)
        .bind(customer_id)
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list statement documents"))?;

        timer.observe_duration();
        Ok(rows)
    }
}
