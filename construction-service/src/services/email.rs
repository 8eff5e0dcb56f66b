//! Outbound email with attachments.

use crate::config::SmtpConfig;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider not enabled: {0}")]
    NotEnabled(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Send error: {0}")]
    SendFailed(String),
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidRecipient(_) => {
                AppError::BadRequest(anyhow::anyhow!("{}", err))
            }
            _ => AppError::EmailError(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    pub provider_id: Option<String>,
    pub success: bool,
}

impl ProviderResponse {
    pub fn success(provider_id: Option<String>) -> Self {
        Self {
            provider_id,
            success: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

impl EmailAttachment {
    pub fn pdf(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: "application/pdf".to_string(),
            content,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body_html: String,
    pub body_text: String,
    pub from_name: String,
    pub from_address: String,
    pub attachments: Vec<EmailAttachment>,
}

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, email: &EmailMessage) -> Result<ProviderResponse, ProviderError>;
    fn is_enabled(&self) -> bool;
}

pub struct SmtpProvider {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpProvider {
    pub fn new(config: &SmtpConfig) -> Result<Self, ProviderError> {
        if !config.enabled {
            return Ok(Self { transport: None });
        }

        let creds = Credentials::new(
            config.user.clone(),
            config.password.expose_secret().clone(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| {
                ProviderError::Configuration(format!("Failed to create SMTP relay: {}", e))
            })?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport: Some(transport),
        })
    }
}

fn build_message(email: &EmailMessage) -> Result<Message, ProviderError> {
    let from_mailbox: Mailbox = format!("{} <{}>", email.from_name, email.from_address)
        .parse()
        .map_err(|e| ProviderError::Configuration(format!("Invalid from address: {}", e)))?;

    let to_mailbox: Mailbox = email
        .to
        .parse()
        .map_err(|e| ProviderError::InvalidRecipient(format!("{}: {}", email.to, e)))?;

    let body = MultiPart::alternative()
        .singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_PLAIN)
                .body(email.body_text.clone()),
        )
        .singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_HTML)
                .body(email.body_html.clone()),
        );

    let mut mixed = MultiPart::mixed().multipart(body);
    for attachment in &email.attachments {
        let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
            ProviderError::SendFailed(format!(
                "Invalid attachment content type {}: {}",
                attachment.content_type, e
            ))
        })?;
        mixed = mixed.singlepart(
            Attachment::new(attachment.filename.clone())
                .body(attachment.content.clone(), content_type),
        );
    }

    Message::builder()
        .from(from_mailbox)
        .to(to_mailbox)
        .subject(&email.subject)
        .multipart(mixed)
        .map_err(|e| ProviderError::SendFailed(format!("Failed to build message: {}", e)))
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    async fn send(&self, email: &EmailMessage) -> Result<ProviderResponse, ProviderError> {
        let transport = self.transport.as_ref().ok_or_else(|| {
            ProviderError::NotEnabled("SMTP email provider is not enabled".to_string())
        })?;

        let message = build_message(email)?;

        let response = transport
            .send(message)
            .await
            .map_err(|e| ProviderError::SendFailed(format!("Failed to send email: {}", e)))?;

        let provider_id = response.message().next().map(|s| s.to_string());

        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            attachments = email.attachments.len(),
            "Email sent successfully"
        );

        Ok(ProviderResponse::success(provider_id))
    }

    fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }
}

/// Mock email provider for testing. Keeps every message it was asked to send.
#[derive(Default)]
pub struct MockEmailProvider {
    sent: Mutex<Vec<EmailMessage>>,
}

impl MockEmailProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EmailProvider for MockEmailProvider {
    async fn send(&self, email: &EmailMessage) -> Result<ProviderResponse, ProviderError> {
        // Same validation as the real transport, minus the network.
        build_message(email)?;

        let count = match self.sent.lock() {
            Ok(mut sent) => {
                sent.push(email.clone());
                sent.len()
            }
            Err(_) => 0,
        };

        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "[MOCK] Email would be sent"
        );

        Ok(ProviderResponse::success(Some(format!("mock-email-{}", count))))
    }

    fn is_enabled(&self) -> bool {
        true
    }
}
