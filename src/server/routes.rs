use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::core::Anomaly;
use crate::error::ServiceError;
use crate::server::{middleware::ClientKey, AppState};

pub async fn index() -> &'static str {
    "Admission guard is running"
}

pub async fn simulate_request(Extension(ClientKey(key)): Extension<ClientKey>) -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok", "ip": key })))
}

pub async fn unblock(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Html<String>, ServiceError> {
    if state.gate.manual_unblock(&key).await {
        Ok(Html(format!("<h1>Successfully unblocked {}</h1>", key)))
    } else {
        Err(ServiceError::NotFound(format!("IP {} was not in the blocklist.", key)))
    }
}

pub async fn block(State(state): State<AppState>, Path(key): Path<String>) -> Json<Value> {
    let added = state.gate.manual_block(&key).await;
    Json(json!({ "ip": key, "newly_blocked": added }))
}

pub async fn anomalies(State(state): State<AppState>) -> Json<Vec<Anomaly>> {
    Json(state.gate.anomalies().await)
}

pub async fn blocked(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "blocked_ips": state.gate.blocked_keys().await }))
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics exporter not installed").into_response(),
    }
}
