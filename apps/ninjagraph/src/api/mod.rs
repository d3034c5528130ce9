//! # HTTP API Module
//!
//! The axum REST surface over the build graph.
//!
//! ## Endpoints
//!
//! - `GET  /health` - liveness probe
//! - `GET  /api/v1/status` - service name and uptime
//! - `POST /api/v1/builds` / `GET /api/v1/builds/{id}` - build records
//! - `GET  /api/v1/builds/stats` / `GET /api/v1/builds/order`
//! - `POST /api/v1/rules` / `GET /api/v1/rules/{name}`
//! - `GET  /api/v1/rules/{name}/targets`
//! - `GET  /api/v1/targets` / `GET /api/v1/targets/{path}`
//! - `GET  /api/v1/targets/{path}/dependencies`
//! - `GET  /api/v1/targets/{path}/reverse_dependencies`
//! - `PUT  /api/v1/targets/{path}/status`
//! - `GET  /api/v1/analysis/cycles`
//! - `POST /api/v1/load`
//!
//! Target paths containing `/` are addressed with percent-encoded segments.
//! CORS is permissive for all paths.

mod handlers;
mod types;

// Re-export handlers and types for integration tests.
#[allow(unused_imports)]
pub use handlers::{
    all_targets_handler, build_order_handler, build_stats_handler, create_build_handler,
    create_rule_handler, cycles_handler, get_build_handler, get_rule_handler, get_target_handler,
    health_handler, load_handler, status_handler, target_dependencies_handler,
    target_reverse_dependencies_handler, targets_by_rule_handler, update_target_status_handler,
};
#[allow(unused_imports)]
pub use types::{
    BuildJson, BuildOrderResponse, CreateBuildRequest, CreateBuildResponse, CreateRuleRequest,
    CreateRuleResponse, CyclesResponse, DependenciesResponse, ErrorResponse, FileJson,
    HealthResponse, LoadRequest, LoadResponse, ReverseDependenciesResponse, RuleJson,
    StatusResponse, TargetJson, TargetListResponse, UpdateStatusRequest, UpdateStatusResponse,
};

use axum::{
    routing::{get, post, put},
    Router,
};
use ninjagraph_core::{GraphError, NinjaGraph};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
///
/// The graph is the sole shared mutable resource; handlers take the read or
/// write half of the lock as their operation requires. The start instant
/// backs the uptime report.
#[derive(Clone)]
pub struct AppState {
    /// The build graph.
    pub graph: Arc<RwLock<NinjaGraph>>,
    /// Process start time, for `/api/v1/status`.
    pub started_at: Instant,
}

impl AppState {
    /// Create new app state around a graph.
    #[must_use]
    pub fn new(graph: NinjaGraph) -> Self {
        Self {
            graph: Arc::new(RwLock::new(graph)),
            started_at: Instant::now(),
        }
    }
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api/v1/status", get(handlers::status_handler))
        .route("/api/v1/builds", post(handlers::create_build_handler))
        .route("/api/v1/builds/stats", get(handlers::build_stats_handler))
        .route("/api/v1/builds/order", get(handlers::build_order_handler))
        .route("/api/v1/builds/{id}", get(handlers::get_build_handler))
        .route("/api/v1/rules", post(handlers::create_rule_handler))
        .route("/api/v1/rules/{name}", get(handlers::get_rule_handler))
        .route(
            "/api/v1/rules/{name}/targets",
            get(handlers::targets_by_rule_handler),
        )
        .route("/api/v1/targets", get(handlers::all_targets_handler))
        .route("/api/v1/targets/{path}", get(handlers::get_target_handler))
        .route(
            "/api/v1/targets/{path}/dependencies",
            get(handlers::target_dependencies_handler),
        )
        .route(
            "/api/v1/targets/{path}/reverse_dependencies",
            get(handlers::target_reverse_dependencies_handler),
        )
        .route(
            "/api/v1/targets/{path}/status",
            put(handlers::update_target_status_handler),
        )
        .route("/api/v1/analysis/cycles", get(handlers::cycles_handler))
        .route("/api/v1/load", post(handlers::load_handler))
        .layer(axum::extract::DefaultBodyLimit::max(16 * 1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Resolve on SIGINT or SIGTERM.
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => tracing::error!("failed to install SIGTERM handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

/// Start the HTTP server and block until shutdown.
///
/// On signal the listener stops accepting, in-flight requests drain, and
/// the store closes when the state is dropped.
pub async fn run_server(addr: &str, graph: NinjaGraph) -> Result<(), GraphError> {
    let state = AppState::new(graph);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| GraphError::Io(format!("bind {addr} failed: {e}")))?;

    tracing::info!("HTTP server listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| GraphError::Io(format!("server error: {e}")))
}
