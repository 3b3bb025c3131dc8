//! FirstStage Middleware Service
//!
//! HTTP API exposing the tax-protocol swap hooks and box decoders against a
//! live algod node, for inspecting what a swap group would contain.

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use firststage_middleware::api;
use firststage_middleware::protocol::algod::AlgodClient;
use firststage_middleware::protocol::config::ServiceConfig;
use firststage_middleware::protocol::{FirstStageMiddleware, Ledger, SwapMiddleware};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();
    let config = ServiceConfig::from_env()?;

    let ledger: Arc<dyn Ledger> = Arc::new(AlgodClient::new(
        config.algod_url.clone(),
        config.algod_token.clone(),
    ));
    tracing::info!("Using algod at {}", config.algod_url);

    let middleware = Arc::new(FirstStageMiddleware::new(
        config.protocol.clone(),
        ledger.clone(),
    ));
    tracing::info!(
        "{} v{} ready: app {} ({}), referral {}",
        middleware.name(),
        middleware.version(),
        config.protocol.app_id,
        config.protocol.app_address(),
        config.protocol.referral
    );

    // Build router
    let app = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api::router(middleware, ledger))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // Start server
    tracing::info!("Starting server on {}", config.bind_addr);
    tracing::info!("API endpoints:");
    tracing::info!("  GET  /health                              - Health check");
    tracing::info!("  GET  /api/info                            - Middleware identity");
    tracing::info!("  GET  /api/assets/:asset_id                - Decoded asset box");
    tracing::info!("  GET  /api/assets/:asset_id/users/:address - Decoded user deposit box");
    tracing::info!("  GET  /api/keys/:asset_id/:address         - Derived box keys");
    tracing::info!("  POST /api/quote/adjust                    - Tax-adjust a quote request");
    tracing::info!("  POST /api/swap/before                     - Pre-swap transactions");
    tracing::info!("  POST /api/swap/after                      - Post-swap transactions");

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_check() -> &'static str {
    "ok"
}
