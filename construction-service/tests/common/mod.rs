//! Shared setup for construction-service integration tests.
//!
//! Database-backed tests need `TEST_DATABASE_URL`. Each `TestApp` migrates
//! a fresh Postgres schema so tests never see each other's rows.

#![allow(dead_code)]

use construction_service::{
    build_router,
    config::{
        ConstructionConfig, DatabaseConfig, JwtConfig, PdfConfig, RateLimitConfig, SmtpConfig,
        StripeConfig,
    },
    models::Role,
    services::{Claims, Database, JwtService, MockEmailProvider, MockPdfRenderer, StripeClient},
    AppState,
};
use secrecy::Secret;
use serde_json::{json, Value};
use service_core::config::Config as CommonConfig;
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::{Arc, Once};
use tokio::net::TcpListener;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-jwt-secret-with-enough-length-for-hs256";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const TEST_PASSWORD: &str = "correct-horse-battery";

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,construction_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn test_config(database_url: &str) -> ConstructionConfig {
    ConstructionConfig {
        common: CommonConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
        },
        service_name: "construction-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: database_url.to_string(),
            max_connections: 2,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: Secret::new(JWT_SECRET.to_string()),
            expiry_hours: 1,
        },
        smtp: SmtpConfig {
            enabled: false,
            host: "localhost".to_string(),
            port: 25,
            user: String::new(),
            password: Secret::new(String::new()),
        },
        stripe: StripeConfig {
            secret_key: Secret::new(String::new()),
            webhook_secret: Secret::new(WEBHOOK_SECRET.to_string()),
            price_starter: None,
            price_pro: None,
            api_base: "http://127.0.0.1:9".to_string(),
        },
        pdf: PdfConfig {
            chrome_path: "chromium".to_string(),
            timeout_secs: 5,
        },
        email_from: "noreply@harmonyhouse.com".to_string(),
        frontend_url: "http://localhost:3000".to_string(),
        cors_allowed_origins: vec!["http://localhost:3000".to_string()],
        login_rate_limit: RateLimitConfig {
            attempts: 100,
            window_seconds: 60,
        },
    }
}

/// Builds state around `db` with mock PDF and email providers.
pub fn test_state(
    config: ConstructionConfig,
    db: Database,
    pdf: Arc<MockPdfRenderer>,
    email: Arc<MockEmailProvider>,
) -> AppState {
    let login_rate_limiter = create_ip_rate_limiter(
        config.login_rate_limit.attempts,
        config.login_rate_limit.window_seconds,
    );

    AppState {
        jwt: JwtService::new(&config.jwt),
        stripe: Arc::new(StripeClient::new(config.stripe.clone())),
        config: Arc::new(config),
        db,
        pdf,
        email,
        login_rate_limiter,
    }
}

/// Signed access token for an arbitrary caller.
pub fn token_for(role: Role, company_id: Uuid) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: Uuid::new_v4(),
        email: "caller@example.com".to_string(),
        role,
        company_id,
        exp: now + 3600,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("Failed to sign test token")
}

/// `Stripe-Signature` header for `payload` signed now.
pub fn stripe_signature(payload: &[u8]) -> String {
    let t = chrono::Utc::now().timestamp();
    let mut signed = format!("{}.", t).into_bytes();
    signed.extend_from_slice(payload);
    let v1 = service_core::utils::sign_payload(WEBHOOK_SECRET, &signed)
        .expect("Failed to sign payload");
    format!("t={},v1={}", t, v1)
}

/// A company registered through the API with its ADMIN token.
pub struct TestCompany {
    pub company_id: Uuid,
    pub admin_token: String,
}

/// Application running on a random port against an isolated schema.
pub struct TestApp {
    pub address: String,
    pub state: AppState,
    pub pdf: Arc<MockPdfRenderer>,
    pub email: Arc<MockEmailProvider>,
    client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        init_tracing();

        let base_url = std::env::var("TEST_DATABASE_URL")
            .expect("TEST_DATABASE_URL must be set to run database tests");

        let schema = format!("test_{}", Uuid::new_v4().simple());
        let admin_pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&base_url)
            .await
            .expect("Failed to connect to test database");
        sqlx::query(&format!("CREATE SCHEMA \"{}\"", schema))
            .execute(&admin_pool)
            .await
            .expect("Failed to create test schema");
        admin_pool.close().await;

        let separator = if base_url.contains('?') { '&' } else { '?' };
        let database_url = format!(
            "{}{}options=-c%20search_path%3D{}",
            base_url, separator, schema
        );

        let config = test_config(&database_url);
        let db = Database::new(&database_url, 2, 1)
            .await
            .expect("Failed to connect test pool");
        db.run_migrations().await.expect("Failed to run migrations");

        let pdf = Arc::new(MockPdfRenderer::new());
        let email = Arc::new(MockEmailProvider::new());
        let state = test_state(config, db, pdf.clone(), email.clone());

        let app = build_router(state.clone())
            .await
            .expect("Failed to build router");

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().expect("No local address").port();

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .ok();
        });

        Self {
            address: format!("http://127.0.0.1:{}", port),
            state,
            pdf,
            email,
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post(&self, path: &str, token: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn patch(&self, path: &str, token: &str, body: &Value) -> reqwest::Response {
        self.client
            .patch(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_public(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Register a new company and return its ADMIN token.
    pub async fn register_company(&self, name: &str) -> TestCompany {
        let email = format!("admin-{}@example.com", Uuid::new_v4().simple());
        let response = self
            .post_public(
                "/auth/register",
                &json!({
                    "companyName": name,
                    "name": "Admin",
                    "email": email,
                    "password": TEST_PASSWORD,
                }),
            )
            .await;
        assert_eq!(response.status(), 201, "registration failed");

        let body: Value = response.json().await.expect("Invalid register response");
        TestCompany {
            company_id: body["user"]["companyId"]
                .as_str()
                .and_then(|id| id.parse().ok())
                .expect("Missing companyId"),
            admin_token: body["accessToken"]
                .as_str()
                .expect("Missing accessToken")
                .to_string(),
        }
    }

    /// Create a user with `role` and log them in.
    pub async fn user_token(&self, admin_token: &str, role: &str) -> (Uuid, String) {
        let email = format!("{}-{}@example.com", role.to_lowercase(), Uuid::new_v4().simple());
        let response = self
            .post(
                "/users",
                admin_token,
                &json!({
                    "email": email,
                    "name": format!("{} user", role),
                    "password": TEST_PASSWORD,
                    "role": role,
                }),
            )
            .await;
        assert_eq!(response.status(), 201, "user creation failed");
        let user: Value = response.json().await.expect("Invalid user response");

        let response = self
            .post_public(
                "/auth/login",
                &json!({ "email": email, "password": TEST_PASSWORD }),
            )
            .await;
        assert_eq!(response.status(), 200, "login failed");
        let body: Value = response.json().await.expect("Invalid login response");

        (
            user["id"]
                .as_str()
                .and_then(|id| id.parse().ok())
                .expect("Missing user id"),
            body["accessToken"]
                .as_str()
                .expect("Missing accessToken")
                .to_string(),
        )
    }

    pub async fn create_customer(&self, token: &str, name: &str) -> Value {
        let response = self
            .post(
                "/customers",
                token,
                &json!({
                    "name": name,
                    "emails": { "work": "client@example.com" },
                    "phones": { "work": "555-0100" },
                    "addresses": [{
                        "street": "1 Main St",
                        "city": "Springfield",
                        "state": "IL",
                        "zip": "62701",
                        "country": "US"
                    }]
                }),
            )
            .await;
        assert_eq!(response.status(), 201, "customer creation failed");
        response.json().await.expect("Invalid customer response")
    }

    pub async fn create_project(&self, token: &str, customer_id: &str, name: &str) -> Value {
        let response = self
            .post(
                "/projects",
                token,
                &json!({ "customerId": customer_id, "name": name }),
            )
            .await;
        assert_eq!(response.status(), 201, "project creation failed");
        response.json().await.expect("Invalid project response")
    }
}
