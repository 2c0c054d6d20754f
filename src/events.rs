//! Outward notifications for observers (dashboards, websocket clients).

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::core::Anomaly;

/// Events delivered to every attached observer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum GuardEvent {
    /// Emitted for every admitted request and every geolocation completion
    TrafficUpdate {
        #[serde(rename = "ip")]
        key: String,
        count: usize,
        country: String,
        /// Local wall time, `HH:MM:SS`
        last_seen: String,
    },
    /// Emitted once per recorded anomaly
    DdosAlert(Anomaly),
    IpBlocked {
        #[serde(rename = "ip")]
        key: String,
    },
    IpUnblocked {
        #[serde(rename = "ip")]
        key: String,
    },
    /// Snapshot sent to a newly attached observer
    UpdateBlockedList {
        #[serde(rename = "blocked_ips")]
        blocked: Vec<String>,
    },
}

impl GuardEvent {
    pub fn traffic_update(key: &str, count: usize, country: &str, at: DateTime<Utc>) -> Self {
        GuardEvent::TrafficUpdate {
            key: key.to_string(),
            count,
            country: country.to_string(),
            last_seen: at.with_timezone(&Local).format("%H:%M:%S").to_string(),
        }
    }

    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            GuardEvent::TrafficUpdate { .. } => "traffic_update",
            GuardEvent::DdosAlert(_) => "ddos_alert",
            GuardEvent::IpBlocked { .. } => "ip_blocked",
            GuardEvent::IpUnblocked { .. } => "ip_unblocked",
            GuardEvent::UpdateBlockedList { .. } => "update_blocked_list",
        }
    }
}

/// Fan-out sink for [`GuardEvent`]s
///
/// Publishing never blocks and never fails the caller: with no observers
/// attached the event is dropped, and slow observers lag rather than apply
/// back-pressure to the request path.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<GuardEvent>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: GuardEvent) {
        let name = event.name();
        if self.sender.send(event).is_err() {
            tracing::trace!(event = %name, "no observers attached");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GuardEvent> {
        self.sender.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(1024)
    }
}
