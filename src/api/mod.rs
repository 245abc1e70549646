//! Reporter REST API
//!
//! HTTP API over the harvested series, built with Axum.
//!
//! # Endpoints
//!
//! ## Territory
//! - `GET /territory/list` - Configured territories
//! - `GET /territory/count/:territory/:series/:field` - Simple count
//! - `GET /territory/timeseries/count/:territory/:series/:field` - Windowed counts (NDJSON)
//! - `GET /territory/aggregate/:territory/:series` - Grouped field counts
//! - `GET /territory/messages/:territory` - Paginated messages
//! - `GET /territory/top/:kind/:territory` - Top-N presets
//!
//! ## Database
//! - `GET /database/info` - Store kind and access check
//!
//! ## Health
//! - `GET /health/live` - Liveness check
//! - `GET /health/ready` - Readiness check
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,no_run
//! use harvest_reporter::api::{serve, ApiConfig, AppState};
//! use harvest_reporter::query::QueryExecutor;
//! use harvest_reporter::store::SqliteStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteStore::open("./events.db")?;
//!     let executor = Arc::new(QueryExecutor::new(Arc::new(store)));
//!     let config = ApiConfig::default();
//!
//!     let state = AppState::new(executor, config.clone(), Vec::new());
//!     serve(state, &config).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, AppState};

use axum::{http::HeaderValue, routing::get, Router};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let territory_routes = Router::new()
        .route("/list", get(routes::territory::list))
        .route("/count/:territory/:series/:field", get(routes::territory::count))
        .route(
            "/timeseries/count/:territory/:series/:field",
            get(routes::territory::timeseries_count),
        )
        .route("/aggregate/:territory/:series", get(routes::territory::aggregate))
        .route("/messages/:territory", get(routes::territory::messages))
        .route("/top/:kind/:territory", get(routes::territory::top));

    let database_routes = Router::new().route("/info", get(routes::database::info));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let cors = cors_layer(&state.config.cors_origins);
    let timeout = TimeoutLayer::new(state.config.request_timeout);

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/territory", territory_routes)
        .nest("/database", database_routes)
        .nest("/health", health_routes)
        .layer(timeout)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

/// Permissive CORS unless origins are configured
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Reporter API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Reporter API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::config::TerritoryConfig;
    use crate::query::{seeded_store, QueryExecutor};
    use crate::store::SqliteStore;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use tower::util::ServiceExt;

    pub(crate) fn test_app_with(store: SqliteStore) -> Router {
        let executor = Arc::new(QueryExecutor::new(Arc::new(store)));
        let territories = vec![TerritoryConfig {
            name: "north".to_string(),
            networks: vec!["twitter".to_string(), "facebook".to_string()],
            keywords: vec!["rust".to_string()],
        }];

        build_router(AppState::new(executor, ApiConfig::default(), territories))
    }

    /// Router over the seeded in-memory store
    pub(crate) fn test_app() -> Router {
        test_app_with(seeded_store())
    }

    pub(crate) async fn get(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub(crate) async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = get(app, uri).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }
}
