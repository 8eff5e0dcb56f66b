use construction_service::{
    build_router,
    config::ConstructionConfig,
    services::{ChromiumPdfRenderer, Database, JwtService, SmtpProvider, StripeClient},
    AppState,
};
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use service_core::observability::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Fail fast on missing configuration
    let config = ConstructionConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    construction_service::services::metrics::init_metrics();

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = %config.common.environment,
        "Starting construction service"
    );

    let db = Database::new(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;
    db.run_migrations().await?;
    tracing::info!("Database initialized successfully");

    let email = SmtpProvider::new(&config.smtp)?;
    tracing::info!(enabled = config.smtp.enabled, "Email provider initialized");

    let pdf = ChromiumPdfRenderer::new(&config.pdf);
    let jwt = JwtService::new(&config.jwt);

    let stripe = StripeClient::new(config.stripe.clone());
    if !stripe.is_configured() {
        tracing::warn!("Stripe is not configured; checkout and sync are disabled");
    }

    let login_rate_limiter = create_ip_rate_limiter(
        config.login_rate_limit.attempts,
        config.login_rate_limit.window_seconds,
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));

    let state = AppState {
        config: Arc::new(config),
        db,
        jwt,
        pdf: Arc::new(pdf),
        email: Arc::new(email),
        stripe: Arc::new(stripe),
        login_rate_limiter,
    };

    let app = build_router(state).await?;

    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
