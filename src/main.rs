use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use leadseeds::config::Config;
use leadseeds::api::handlers::{self, AppState};
use leadseeds::api::notifier::SignupNotifier;
use leadseeds::core::pipeline::LeadPipeline;

/// Main entry point for the landing page and search API.
///
/// This function initializes:
/// - Logging and tracing.
/// - Configuration loading.
/// - The lead pipeline and its HTTP-backed accessors.
/// - The signup notifier.
/// - HTTP routes and middleware (body limit, rate limiting, CORS, tracing).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leadseeds=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    let pipeline = LeadPipeline::from_config(&config)?;
    tracing::info!(
        "✓ Lead pipeline ready (target {} leads, registry {})",
        config.target_lead_count,
        if config.companies_house_api_key.is_some() {
            "enabled"
        } else {
            "disabled"
        }
    );

    let notifier = SignupNotifier::new(config.notify_webhook_url.clone())?;

    // Build application state
    let app_state = Arc::new(AppState {
        config: config.clone(),
        pipeline: Arc::new(pipeline),
        notifier,
    });

    // Configure rate limiter: 2 requests/second per IP, burst of 10.
    // A search holds outbound connections for minutes, so this stays tight.
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(2)
            .burst_size(10)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    // Build protected routes with security layers
    let protected_routes = Router::new()
        .route("/api/v1/signup", post(handlers::signup))
        .route("/api/v1/search", post(handlers::search))
        .layer(
            ServiceBuilder::new()
                // Request size limit: 64KB max payload, both forms are tiny
                .layer(RequestBodyLimitLayer::new(64 * 1024))
                // Rate limiting per client IP
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Landing page and health check bypass rate limiting
    let app = Router::new()
        .route("/", get(handlers::landing_page))
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🌱 LeadSeeds listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server");
}
