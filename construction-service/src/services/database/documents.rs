use super::{db_error, Database};
use crate::finance::{format_document_number, parse_document_number};
use crate::models::{
    breakdown_columns, CreateDocument, Document, DocumentFilter, DocumentType, UpdateDocument,
};
use crate::services::metrics::DB_QUERY_DURATION;
use chrono::{Datelike, Utc};
use service_core::error::AppError;
use sqlx::{Postgres, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

impl Database {
    /// Insert a document, allocating its number from the company sequence in
    /// the same transaction unless one was supplied.
    #[instrument(skip(self, input), fields(company_id = %input.company_id, document_type = input.document_type.as_str()))]
    pub async fn create_document(&self, input: &CreateDocument) -> Result<Document, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_document"])
            .start_timer();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("begin document insert"))?;

        let number = match &input.number {
            Some(number) => {
                reserve_document_number(&mut tx, input.company_id, number).await?;
                number.clone()
            }
            None => {
                let year = Utc::now().year();
                let sequence =
                    next_document_sequence(&mut tx, input.company_id, input.document_type, year)
                        .await?;
                format_document_number(input.document_type.prefix(), year, sequence)
            }
        };

        let (sections, legacy_items) = breakdown_columns(input.breakdown.as_ref());

        let document = sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents (
                document_id, company_id, customer_id, project_id, document_type, status, number,
                total_value, balance_due, tax_rate, sections, legacy_items,
                sent_date, due_date, estimate_date, validity_days, project_dates, prepared_by, notes, introduction
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.company_id)
        .bind(input.customer_id)
        .bind(input.project_id)
        .bind(input.document_type.as_str())
        .bind(input.status.as_str())
        .bind(&number)
        .bind(input.total_value)
        .bind(input.balance_due)
        .bind(input.tax_rate)
        .bind(sections)
        .bind(legacy_items)
        .bind(input.sent_date)
        .bind(input.due_date)
        .bind(input.estimate_date)
        .bind(input.validity_days)
        .bind(&input.project_dates)
        .bind(&input.prepared_by)
        .bind(&input.notes)
        .bind(&input.introduction)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("create document"))?;

        tx.commit().await.map_err(db_error("commit document insert"))?;

        timer.observe_duration();
        info!(document_id = %document.document_id, number = %document.number, "Document created");

        Ok(document)
    }

    #[instrument(skip(self))]
    pub async fn get_document(
        &self,
        company_id: Uuid,
        document_id: Uuid,
    ) -> Result<Option<Document>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_document"])
            .start_timer();

        let document = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE company_id = $1 AND document_id = $2",
        )
        .bind(company_id)
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get document"))?;

        timer.observe_duration();
        Ok(document)
    }

    /// Documents matching the filter, newest first.
    #[instrument(skip(self, filter))]
    pub async fn list_documents(
        &self,
        company_id: Uuid,
        filter: &DocumentFilter,
    ) -> Result<Vec<Document>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_documents"])
            .start_timer();

        let documents = sqlx::query_as::<_, Document>(
            r#"
            SELECT * FROM documents
            WHERE company_id = $1
              AND ($2::uuid IS NULL OR customer_id = $2)
              AND ($3::uuid IS NULL OR project_id = $3)
              AND ($4::text IS NULL OR document_type = $4)
            ORDER BY created_utc DESC
            "#,
        )
        .bind(company_id)
        .bind(filter.customer_id)
        .bind(filter.project_id)
        .bind(filter.document_type.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list documents"))?;

        timer.observe_duration();
        Ok(documents)
    }

    /// Write back a fully merged document.
    #[instrument(skip(self, update))]
    pub async fn update_document(
        &self,
        company_id: Uuid,
        document_id: Uuid,
        update: &UpdateDocument,
    ) -> Result<Option<Document>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_document"])
            .start_timer();

        let (sections, legacy_items) = breakdown_columns(update.breakdown.as_ref());

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("begin document update"))?;

        reserve_document_number(&mut tx, company_id, &update.number).await?;

        let document = sqlx::query_as::<_, Document>(
            r#"
            UPDATE documents SET
                status = $3,
                number = $4,
                total_value = $5,
                balance_due = $6,
                tax_rate = $7,
                sections = $8,
                legacy_items = $9,
                sent_date = $10,
                due_date = $11,
                estimate_date = $12,
                validity_days = $13,
                project_dates = $14,
                prepared_by = $15,
                notes = $16,
                introduction = $17,
                updated_utc = NOW()
            WHERE company_id = $1 AND document_id = $2
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(document_id)
        .bind(update.status.as_str())
        .bind(&update.number)
        .bind(update.total_value)
        .bind(update.balance_due)
        .bind(update.tax_rate)
        .bind(sections)
        .bind(legacy_items)
        .bind(update.sent_date)
        .bind(update.due_date)
        .bind(update.estimate_date)
        .bind(update.validity_days)
        .bind(&update.project_dates)
        .bind(&update.prepared_by)
        .bind(&update.notes)
        .bind(&update.introduction)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("update document"))?;

        tx.commit().await.map_err(db_error("commit document update"))?;

        timer.observe_duration();
        if document.is_some() {
            info!(document_id = %document_id, status = update.status.as_str(), "Document updated");
        }

        Ok(document)
    }

    /// Returns whether a row was deleted.
    #[instrument(skip(self))]
    pub async fn delete_document(
        &self,
        company_id: Uuid,
        document_id: Uuid,
    ) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_document"])
            .start_timer();

        let result = sqlx::query("DELETE FROM documents WHERE company_id = $1 AND document_id = $2")
            .bind(company_id)
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete document"))?;

        timer.observe_duration();
        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(document_id = %document_id, "Document deleted");
        }

        Ok(deleted)
    }
}

/// Atomically bump and return the `(company, prefix, year)` counter.
async fn next_document_sequence(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    document_type: DocumentType,
    year: i32,
) -> Result<i64, AppError> {
    sqlx::query_scalar(
        r#"
        INSERT INTO document_sequences (company_id, prefix, year, last_value)
        VALUES ($1, $2, $3, 1)
        ON CONFLICT (company_id, prefix, year)
        DO UPDATE SET last_value = document_sequences.last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(company_id)
    .bind(document_type.prefix())
    .bind(year)
    .fetch_one(&mut **tx)
    .await
    .map_err(db_error("allocate document number"))
}

/// Keep the counter at or above a caller-supplied number in the same series,
/// so later allocations never hand it out again.
async fn reserve_document_number(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    number: &str,
) -> Result<(), AppError> {
    let Some((prefix, year, sequence)) = parse_document_number(number) else {
        return Ok(());
    };

    sqlx::query(
        r#"
        INSERT INTO document_sequences (company_id, prefix, year, last_value)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (company_id, prefix, year)
        DO UPDATE SET last_value = GREATEST(document_sequences.last_value, EXCLUDED.last_value)
        "#,
    )
    .bind(company_id)
    .bind(prefix)
    .bind(year)
    .bind(sequence)
    .execute(&mut **tx)
    .await
    .map_err(db_error("reserve document number"))?;

    Ok(())
}
