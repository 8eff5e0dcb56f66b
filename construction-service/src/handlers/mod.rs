//! HTTP handlers for construction-service.

pub mod auth;
pub mod billing;
pub mod branding;
pub mod customers;
pub mod dashboard;
pub mod documents;
pub mod projects;
pub mod tasks;
pub mod timelogs;
pub mod users;

use crate::dtos::branding::BrandingResponse;
use crate::services::branding::resolve_branding;
use crate::services::metrics::{get_metrics, record_email_sent, record_pdf_generated};
use crate::services::{EmailMessage, PdfOptions};
use crate::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use service_core::error::AppError;
use uuid::Uuid;

/// Liveness probe.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "construction-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Readiness probe. Fails while PostgreSQL is unreachable.
pub async fn readiness_check(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.db.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Database health check failed");
        AppError::ServiceUnavailable
    })?;

    Ok((StatusCode::OK, Json(json!({ "status": "ready" }))))
}

/// Prometheus metrics endpoint.
pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        get_metrics(),
    )
}

pub(crate) fn template_error(err: askama::Error) -> AppError {
    tracing::error!(error = %err, "Template rendering failed");
    AppError::InternalError(anyhow::anyhow!("Failed to render template: {}", err))
}

/// Resolved branding for the caller's company.
pub(crate) async fn company_branding(
    state: &AppState,
    company_id: Uuid,
) -> Result<BrandingResponse, AppError> {
    let company = state.db.get_company(company_id).await?;
    Ok(resolve_branding(company.as_ref(), &state.config.email_from))
}

/// Render HTML to PDF, counting the outcome under `kind`.
pub(crate) async fn render_pdf(
    state: &AppState,
    kind: &str,
    html: &str,
    options: &PdfOptions,
) -> Result<Vec<u8>, AppError> {
    match state.pdf.render(html, options).await {
        Ok(bytes) => {
            record_pdf_generated(kind, "success");
            Ok(bytes)
        }
        Err(e) => {
            record_pdf_generated(kind, "failure");
            Err(e.into())
        }
    }
}

/// Send an email, counting the outcome under `kind`.
pub(crate) async fn send_email(
    state: &AppState,
    kind: &str,
    message: &EmailMessage,
) -> Result<(), AppError> {
    match state.email.send(message).await {
        Ok(response) => {
            record_email_sent(kind, "success");
            tracing::info!(
                kind = kind,
                to = %message.to,
                provider_id = ?response.provider_id,
                "Email sent"
            );
            Ok(())
        }
        Err(e) => {
            record_email_sent(kind, "failure");
            tracing::error!(kind = kind, to = %message.to, error = %e, "Email send failed");
            Err(e.into())
        }
    }
}

/// `application/pdf` download response.
pub(crate) fn pdf_attachment(bytes: Vec<u8>, filename: &str) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// Lowercase, dash-separated name for download filenames.
pub(crate) fn file_slug(name: &str) -> String {
    let slug = name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        "download".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_slug() {
        assert_eq!(file_slug("Jane O'Brien"), "jane-o-brien");
        assert_eq!(file_slug("Kitchen Remodel #2"), "kitchen-remodel-2");
        assert_eq!(file_slug("***"), "download");
    }

    #[test]
    fn test_pdf_attachment_headers() {
        let response = pdf_attachment(b"%PDF-1.4".to_vec(), "estimate-EST-2024-001.pdf");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"estimate-EST-2024-001.pdf\""
        );
    }
}
