//! HTTP surface of the admission guard.
//! Routes are thin wrappers; every protected request goes through the
//! admission middleware before reaching a handler.

mod middleware;
mod observer;
mod routes;

pub use middleware::{admission_middleware, client_key, is_exempt, ClientKey};

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::service::AdmissionGate;
use crate::utils::{GuardError, GuardResult};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AdmissionGate>,
    pub metrics: Option<PrometheusHandle>,
    pub trust_forwarded_for: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/simulate_request", post(routes::simulate_request))
        .route("/unblock/:ip", get(routes::unblock))
        .route("/block/:ip", post(routes::block))
        .route("/dashboard/anomalies", get(routes::anomalies))
        .route("/dashboard/blocked", get(routes::blocked))
        .route("/events", get(observer::events))
        .route("/metrics", get(routes::metrics))
        .layer(from_fn_with_state(state.clone(), admission_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until ctrl-c
pub async fn serve(config: &ServerConfig, state: AppState) -> GuardResult<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| GuardError::Server(format!("invalid listen address: {}", e)))?;

    tracing::info!(%addr, "Listening");

    axum::Server::bind(&addr)
        .serve(router(state).into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| GuardError::Server(e.to_string()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
