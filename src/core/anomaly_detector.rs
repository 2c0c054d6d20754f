use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// A recorded threshold overflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomaly {
    #[serde(rename = "ip")]
    pub key: String,
    pub count: usize,
    pub country: String,
    /// Unix seconds at detection
    pub timestamp: i64,
}

/// Threshold detector with global last-entry deduplication
///
/// A candidate is suppressed only when the most recent anomaly in the whole
/// sequence belongs to the same key. A sustained offender therefore produces a
/// single alert, while alternating offenders (A, B, A) are each recorded.
pub struct AnomalyDetector {
    /// Counts strictly above this value are anomalous
    request_limit: usize,
    /// Append-only, in detection order
    anomalies: Mutex<Vec<Anomaly>>,
}

impl AnomalyDetector {
    pub fn new(request_limit: usize) -> Self {
        Self {
            request_limit,
            anomalies: Mutex::new(Vec::new()),
        }
    }

    pub fn request_limit(&self) -> usize {
        self.request_limit
    }

    /// Evaluate a window count. Returns the anomaly if one was recorded.
    pub async fn evaluate(
        &self,
        key: &str,
        count: usize,
        country: &str,
        now: DateTime<Utc>,
    ) -> Option<Anomaly> {
        if count <= self.request_limit {
            return None;
        }

        let mut anomalies = self.anomalies.lock().await;
        if matches!(anomalies.last(), Some(last) if last.key == key) {
            return None;
        }

        let anomaly = Anomaly {
            key: key.to_string(),
            count,
            country: country.to_string(),
            timestamp: now.timestamp(),
        };
        anomalies.push(anomaly.clone());
        Some(anomaly)
    }

    /// All anomalies recorded so far, oldest first
    pub async fn anomalies(&self) -> Vec<Anomaly> {
        self.anomalies.lock().await.clone()
    }
}
