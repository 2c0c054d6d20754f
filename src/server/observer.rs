use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::events::GuardEvent;
use crate::server::AppState;
use crate::service::AdmissionGate;
use crate::utils::{GuardError, GuardResult};

pub async fn events(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| observe(socket, state.gate))
}

/// Sends the blocklist snapshot, then forwards every broadcast event until
/// the client goes away
async fn observe(socket: WebSocket, gate: Arc<AdmissionGate>) {
    let (snapshot, mut events) = gate.attach_observer().await;
    let (mut sender, mut receiver) = socket.split();
    tracing::info!("Observer connected, sending current blocklist.");

    if send_event(&mut sender, &snapshot).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if let Err(e) = send_event(&mut sender, &event).await {
                        tracing::debug!(error = %e, "observer send failed");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped = %skipped, "observer lagging, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::info!("Observer disconnected");
}

async fn send_event(sender: &mut SplitSink<WebSocket, Message>, event: &GuardEvent) -> GuardResult<()> {
    let text = serde_json::to_string(event)?;
    sender
        .send(Message::Text(text))
        .await
        .map_err(|e| GuardError::Server(e.to_string()))
}
