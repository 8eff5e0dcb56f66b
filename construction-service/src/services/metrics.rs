//! Prometheus metrics for construction-service.

use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec,
    IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Database query duration histogram
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!(
            "construction_db_query_duration_seconds",
            "Database query duration"
        ),
        &["operation"]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Document operations counter (per-company)
pub static DOCUMENT_OPERATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Generated PDFs by kind
pub static PDFS_GENERATED_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Outbound emails by kind and outcome
pub static EMAILS_SENT_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Stripe webhook events by type and outcome
pub static WEBHOOK_EVENTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Call once at startup.
pub fn init_metrics() {
    DOCUMENT_OPERATIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "construction_document_operations_total",
                "Total document operations by company, type and operation"
            ),
            &["company_id", "document_type", "operation"]
        )
        .expect("Failed to register DOCUMENT_OPERATIONS_TOTAL")
    });

    PDFS_GENERATED_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!("construction_pdfs_generated_total", "Total PDFs rendered"),
            &["kind", "status"]
        )
        .expect("Failed to register PDFS_GENERATED_TOTAL")
    });

    EMAILS_SENT_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!("construction_emails_sent_total", "Total emails sent"),
            &["kind", "status"]
        )
        .expect("Failed to register EMAILS_SENT_TOTAL")
    });

    WEBHOOK_EVENTS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "construction_webhook_events_total",
                "Total Stripe webhook events received"
            ),
            &["event_type", "status"]
        )
        .expect("Failed to register WEBHOOK_EVENTS_TOTAL")
    });

    // Force initialization of lazy statics
    let _ = &*DB_QUERY_DURATION;
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record a document operation.
pub fn record_document_operation(company_id: &str, document_type: &str, operation: &str) {
    if let Some(counter) = DOCUMENT_OPERATIONS_TOTAL.get() {
        counter
            .with_label_values(&[company_id, document_type, operation])
            .inc();
    }
}

/// Record a rendered PDF.
pub fn record_pdf_generated(kind: &str, status: &str) {
    if let Some(counter) = PDFS_GENERATED_TOTAL.get() {
        counter.with_label_values(&[kind, status]).inc();
    }
}

/// Record an email send attempt.
pub fn record_email_sent(kind: &str, status: &str) {
    if let Some(counter) = EMAILS_SENT_TOTAL.get() {
        counter.with_label_values(&[kind, status]).inc();
    }
}

/// Record a Stripe webhook event.
pub fn record_webhook_event(event_type: &str, status: &str) {
    if let Some(counter) = WEBHOOK_EVENTS_TOTAL.get() {
        counter.with_label_values(&[event_type, status]).inc();
    }
}
