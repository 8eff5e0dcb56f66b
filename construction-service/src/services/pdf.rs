//! HTML to PDF rendering.
//!
//! Production uses headless Chromium's `--print-to-pdf`. The HTML is written
//! into a temporary directory that is removed when the render finishes.

use super::executor::{CommandExecutor, ExecutorError};
use crate::config::PdfConfig;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to prepare render workspace: {0}")]
    Workspace(#[from] std::io::Error),

    #[error("Renderer failed: {0}")]
    Render(#[from] ExecutorError),

    #[error("Renderer produced no output")]
    EmptyOutput,
}

impl From<PdfError> for service_core::error::AppError {
    fn from(err: PdfError) -> Self {
        tracing::error!(error = %err, "PDF generation failed");
        service_core::error::AppError::BadGateway(format!("PDF generation failed: {}", err))
    }
}

/// Page margins in millimetres on an A4 page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfOptions {
    pub margin_top_mm: u32,
    pub margin_right_mm: u32,
    pub margin_bottom_mm: u32,
    pub margin_left_mm: u32,
}

impl PdfOptions {
    /// Estimates: 15mm on every side.
    pub fn estimate() -> Self {
        Self {
            margin_top_mm: 15,
            margin_right_mm: 15,
            margin_bottom_mm: 15,
            margin_left_mm: 15,
        }
    }

    /// Statements and financial summaries: 20mm top and bottom, 15mm sides.
    pub fn report() -> Self {
        Self {
            margin_top_mm: 20,
            margin_right_mm: 15,
            margin_bottom_mm: 20,
            margin_left_mm: 15,
        }
    }

    fn page_css(&self) -> String {
        format!(
            "<style>@page {{ size: A4; margin: {}mm {}mm {}mm {}mm; }}</style>",
            self.margin_top_mm, self.margin_right_mm, self.margin_bottom_mm, self.margin_left_mm
        )
    }

    /// Inject the `@page` rule into the document head.
    pub fn apply(&self, html: &str) -> String {
        let css = self.page_css();
        match html.find("</head>") {
            Some(idx) => format!("{}{}{}", &html[..idx], css, &html[idx..]),
            None => format!("{}{}", css, html),
        }
    }
}

#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, html: &str, options: &PdfOptions) -> Result<Vec<u8>, PdfError>;
}

pub struct ChromiumPdfRenderer {
    chrome_path: String,
    executor: CommandExecutor,
}

impl ChromiumPdfRenderer {
    pub fn new(config: &PdfConfig) -> Self {
        Self {
            chrome_path: config.chrome_path.clone(),
            executor: CommandExecutor::new(Duration::from_secs(config.timeout_secs)),
        }
    }
}

#[async_trait]
impl PdfRenderer for ChromiumPdfRenderer {
    async fn render(&self, html: &str, options: &PdfOptions) -> Result<Vec<u8>, PdfError> {
        let workspace = tempfile::tempdir()?;
        let input = workspace.path().join("document.html");
        let output = workspace.path().join("document.pdf");

        tokio::fs::write(&input, options.apply(html)).await?;

        let print_arg = format!("--print-to-pdf={}", output.display());
        let url = format!("file://{}", input.display());

        self.executor
            .execute(
                &self.chrome_path,
                &[
                    "--headless",
                    "--disable-gpu",
                    "--no-sandbox",
                    "--no-pdf-header-footer",
                    &print_arg,
                    &url,
                ],
                Some(workspace.path()),
            )
            .await?;

        let bytes = tokio::fs::read(&output).await?;
        if bytes.is_empty() {
            return Err(PdfError::EmptyOutput);
        }

        tracing::debug!(size = bytes.len(), "PDF rendered");
        Ok(bytes)
    }
}

/// Renderer for tests: returns a fixed PDF header and counts calls.
pub struct MockPdfRenderer {
    render_count: AtomicU64,
}

impl MockPdfRenderer {
    pub fn new() -> Self {
        Self {
            render_count: AtomicU64::new(0),
        }
    }

    pub fn render_count(&self) -> u64 {
        self.render_count.load(Ordering::SeqCst)
    }
}

impl Default for MockPdfRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PdfRenderer for MockPdfRenderer {
    async fn render(&self, html: &str, _options: &PdfOptions) -> Result<Vec<u8>, PdfError> {
        self.render_count.fetch_add(1, Ordering::SeqCst);
        tracing::info!(html_size = html.len(), "[MOCK] PDF would be rendered");
        Ok(b"%PDF-1.4\n% mock\n".to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_css_injected_into_head() {
        let html = "<html><head><title>x</title></head><body></body></html>";
        let out = PdfOptions::report().apply(html);
        assert!(out.contains("@page { size: A4; margin: 20mm 15mm 20mm 15mm; }</style></head>"));
    }

    #[test]
    fn test_page_css_prepended_without_head() {
        let out = PdfOptions::estimate().apply("<p>hi</p>");
        assert!(out.starts_with("<style>@page { size: A4; margin: 15mm 15mm 15mm 15mm; }"));
    }

    #[tokio::test]
    async fn test_mock_renderer() {
        let renderer = MockPdfRenderer::new();
        let bytes = renderer.render("<p/>", &PdfOptions::estimate()).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(renderer.render_count(), 1);
    }
}
