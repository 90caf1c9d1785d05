use rust_b2b_risk_api::cache::PipelineCache;
use rust_b2b_risk_api::config::Config;
use rust_b2b_risk_api::handlers::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - The initial pipeline run over the configured tables.
/// - HTTP routes and middleware (CORS, Rate Limiting).
///
/// A missing or malformed source table aborts startup; there is no partial
/// dataset to serve.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_b2b_risk_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let pipeline_cache = PipelineCache::from_config(&config);
    let dataset = handlers::load_dataset(&config, &pipeline_cache).await?;
    tracing::info!("✓ Dataset ready: {} companies", dataset.len());

    let port = config.port;
    let state = Arc::new(AppState::new(config, dataset, pipeline_cache));

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limiter configuration"))?,
    );

    let app = handlers::router(state)
        .layer(
            ServiceBuilder::new()
                // Request size limit: 1MB, the API only takes query parameters
                .layer(RequestBodyLimitLayer::new(1024 * 1024))
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
