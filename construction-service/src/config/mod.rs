//! Configuration module for construction-service.

use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct ConstructionConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
    pub stripe: StripeConfig,
    pub pdf: PdfConfig,
    pub email_from: String,
    pub frontend_url: String,
    pub cors_allowed_origins: Vec<String>,
    pub login_rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: Secret<String>,
    pub expiry_hours: i64,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: Secret<String>,
    pub webhook_secret: Secret<String>,
    pub price_starter: Option<String>,
    pub price_pro: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct PdfConfig {
    pub chrome_path: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub attempts: u32,
    pub window_seconds: u64,
}

impl ConstructionConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let is_prod = common.is_production();

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "construction-service".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10),
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", 2),
            },
            jwt: JwtConfig {
                secret: Secret::new(get_env(
                    "JWT_SECRET",
                    Some("dev-secret-change-me-in-production"),
                    is_prod,
                )?),
                expiry_hours: parse_env("JWT_EXPIRY_HOURS", 24),
            },
            smtp: SmtpConfig {
                enabled: parse_env("SMTP_ENABLED", false),
                host: env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string()),
                port: parse_env("SMTP_PORT", 587),
                user: env::var("SMTP_USER").unwrap_or_default(),
                password: Secret::new(env::var("SMTP_PASS").unwrap_or_default()),
            },
            stripe: StripeConfig {
                secret_key: Secret::new(env::var("STRIPE_SECRET_KEY").unwrap_or_default()),
                webhook_secret: Secret::new(
                    env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
                ),
                price_starter: env::var("STRIPE_PRICE_STARTER").ok(),
                price_pro: env::var("STRIPE_PRICE_PRO").ok(),
                api_base: env::var("STRIPE_API_BASE")
                    .unwrap_or_else(|_| "https://api.stripe.com/v1".to_string()),
            },
            pdf: PdfConfig {
                chrome_path: env::var("PDF_CHROME_PATH")
                    .unwrap_or_else(|_| "chromium".to_string()),
                timeout_secs: parse_env("PDF_TIMEOUT_SECS", 30),
            },
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "noreply@harmonyhouse.com".to_string()),
            frontend_url: get_env("FRONTEND_URL", Some("http://localhost:5173"), is_prod)?,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            login_rate_limit: RateLimitConfig {
                attempts: parse_env("LOGIN_RATE_LIMIT_ATTEMPTS", 10),
                window_seconds: parse_env("LOGIN_RATE_LIMIT_WINDOW_SECONDS", 60),
            },
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
