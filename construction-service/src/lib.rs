pub mod config;
pub mod dtos;
pub mod finance;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod projection;
pub mod services;
pub mod templates;

use axum::{
    http::{header, HeaderValue, Method, Request},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ConstructionConfig;
use crate::services::{Database, EmailProvider, JwtService, PdfRenderer, StripeClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConstructionConfig>,
    pub db: Database,
    pub jwt: JwtService,
    pub pdf: Arc<dyn PdfRenderer>,
    pub email: Arc<dyn EmailProvider>,
    pub stripe: Arc<StripeClient>,
    pub login_rate_limiter: IpRateLimiter,
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    // Login is rate limited per client IP
    let login_limiter = state.login_rate_limiter.clone();
    let login_route = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(login_limiter, ip_rate_limit_middleware));

    // Business routes require an ACTIVE or TRIALING subscription
    let business_routes = Router::new()
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/customers",
            get(handlers::customers::list_customers).post(handlers::customers::create_customer),
        )
        .route(
            "/customers/:id",
            get(handlers::customers::get_customer).patch(handlers::customers::update_customer),
        )
        .route(
            "/customers/:id/statement",
            get(handlers::customers::customer_statement),
        )
        .route(
            "/customers/:id/statement/pdf",
            get(handlers::customers::customer_statement_pdf),
        )
        .route(
            "/customers/:id/statement/email",
            post(handlers::customers::email_customer_statement),
        )
        .route(
            "/projects",
            get(handlers::projects::list_projects).post(handlers::projects::create_project),
        )
        .route("/projects/:id", get(handlers::projects::get_project))
        .route(
            "/projects/:id/financials",
            get(handlers::projects::project_financials),
        )
        .route(
            "/projects/:id/financials/pdf",
            get(handlers::projects::project_financials_pdf),
        )
        .route(
            "/projects/:id/financials/email",
            post(handlers::projects::email_project_financials),
        )
        .route(
            "/documents",
            get(handlers::documents::list_documents).post(handlers::documents::create_document),
        )
        .route(
            "/documents/:id",
            get(handlers::documents::get_document)
                .patch(handlers::documents::update_document)
                .delete(handlers::documents::delete_document),
        )
        .route("/documents/:id/pdf", get(handlers::documents::document_pdf))
        .route(
            "/documents/:id/financials",
            get(handlers::documents::document_financials),
        )
        .route(
            "/tasks",
            get(handlers::tasks::list_tasks).post(handlers::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            get(handlers::tasks::get_task).patch(handlers::tasks::update_task),
        )
        .route("/tasks/:id/assign", patch(handlers::tasks::assign_task))
        .route(
            "/timelogs",
            get(handlers::timelogs::list_time_logs).post(handlers::timelogs::create_time_log),
        )
        .route("/timelogs/:id", get(handlers::timelogs::get_time_log))
        .route(
            "/dashboard/summary",
            get(handlers::dashboard::dashboard_summary),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::subscription_middleware,
        ));

    // Authenticated routes exempt from the subscription guard
    let authed_routes = Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .route(
            "/billing/status",
            get(handlers::billing::subscription_status),
        )
        .route("/billing/limits", get(handlers::billing::plan_limits))
        .route("/billing/checkout", post(handlers::billing::create_checkout))
        .route("/billing/sync", post(handlers::billing::sync_subscription))
        .route(
            "/branding/me",
            get(handlers::branding::get_branding).patch(handlers::branding::update_branding),
        )
        .route("/branding/seed", post(handlers::branding::seed_branding))
        .merge(business_routes)
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let app = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/auth/register", post(handlers::auth::register))
        .route("/billing/webhook", post(handlers::billing::stripe_webhook))
        .merge(login_route)
        .merge(authed_routes)
        .with_state(state.clone())
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                    user_id = tracing::field::Empty,
                    company_id = tracing::field::Empty,
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.cors_allowed_origins));

    Ok(app)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", origin, e);
                None
            }
        })
        .collect::<Vec<HeaderValue>>();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
