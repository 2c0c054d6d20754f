use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use tracing::Instrument;

use crate::error::ServiceError;
use crate::server::AppState;
use crate::service::AdmissionDecision;
use crate::utils::create_request_span;

/// Operator and observer paths that bypass admission
const EXEMPT_PREFIXES: [&str; 6] = ["/dashboard", "/unblock", "/block", "/static", "/events", "/metrics"];

/// Key of the client a request was attributed to, available to handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKey(pub String);

pub fn is_exempt(path: &str) -> bool {
    path == "/favicon.ico" || EXEMPT_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Derive the client key: the first `X-Forwarded-For` entry when trusted,
/// otherwise the peer address, otherwise `"unknown"`
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        if let Some(forwarded) = forwarded {
            return forwarded.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Runs every non-exempt request through the admission gate
pub async fn admission_middleware<B>(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    mut request: Request<B>,
    next: Next<B>,
) -> Response {
    if is_exempt(request.uri().path()) {
        return next.run(request).await;
    }

    let peer = connect_info.map(|ConnectInfo(addr)| addr);
    let key = client_key(request.headers(), peer, state.trust_forwarded_for);
    let span = create_request_span(&key);

    let decision = state.gate.process_request(&key).instrument(span).await;
    match decision {
        AdmissionDecision::Blocked => ServiceError::Blocked(key).into_response(),
        AdmissionDecision::Admitted(_) => {
            request.extensions_mut().insert(ClientKey(key));
            next.run(request).await
        }
    }
}
