//! Axum API server for Bunkai.

use crate::api::config::ServerConfig;
use crate::diagram::LayoutConfig;
use crate::service::AnalysisService;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared state for all API handlers.
pub struct AppState {
    /// Analysis pipeline: cache, single-flight and upstream analyzer.
    pub service: Arc<AnalysisService>,
    /// Metrics used by `POST /api/diagram`.
    pub layout: LayoutConfig,
}

impl AppState {
    pub fn new(service: Arc<AnalysisService>) -> Self {
        Self {
            service,
            layout: LayoutConfig::default(),
        }
    }
}

/// CORS layer for the configured origins, or `None` when the list is empty
/// or no origin parses.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    if parsed.is_empty() {
        return None;
    }
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(parsed))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([HeaderName::from_static("content-type")]),
    )
}

/// Build the axum router with all API routes.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let shared_state = Arc::new(state);

    let api = Router::new()
        .route("/api/analyze", post(super::routes::analyze::analyze))
        .route("/api/diagram", post(super::routes::diagram::diagram))
        .route("/api/health", get(super::routes::health::get_health))
        .route("/api/metrics", get(super::routes::metrics::get_metrics))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .with_state(shared_state);

    let api = match cors_layer(&config.cors_origins) {
        Some(cors) => api.layer(cors),
        None => api,
    };
    api.layer(TraceLayer::new_for_http())
}

/// Start the API server and run until Ctrl-C.
pub async fn start_server(
    config: &ServerConfig,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = build_router(state, config);
    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Bunkai API server listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Bunkai API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
