use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

use crate::config::{GuardConfig, MAX_WINDOW_SECONDS};
use crate::core::Clock;

/// Per-key sliding-window request history
///
/// Each key keeps at most `max_history` timestamps in arrival order. Every
/// access drops the timestamps that have fallen out of the trailing window, so
/// the retained sequence is always a suffix of what was recorded and the
/// window count is simply its length.
pub struct RequestLedger {
    /// Timestamps per key, oldest first
    entries: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
    /// Trailing window over which requests are counted
    window: Duration,
    /// Memory bound on timestamps kept per key
    max_history: usize,
}

impl RequestLedger {
    pub fn new(window: Duration, max_history: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            window,
            max_history: max_history.max(1),
        }
    }

    pub fn from_config(config: &GuardConfig) -> Self {
        let seconds = config.window_seconds.clamp(1, MAX_WINDOW_SECONDS) as i64;
        Self::new(Duration::seconds(seconds), config.max_history)
    }

    /// Record a request for `key` at `now` and return the live window count
    pub async fn record(&self, key: &str, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock().await;
        self.push(&mut entries, key, now)
    }

    /// Record a request timestamped by `clock` while the ledger is locked,
    /// so concurrent requests for one key append in clock order
    pub async fn record_with(&self, key: &str, clock: &dyn Clock) -> (usize, DateTime<Utc>) {
        let mut entries = self.entries.lock().await;
        let now = clock.now();
        (self.push(&mut entries, key, now), now)
    }

    fn push(
        &self,
        entries: &mut HashMap<String, VecDeque<DateTime<Utc>>>,
        key: &str,
        now: DateTime<Utc>,
    ) -> usize {
        let history = entries.entry(key.to_string()).or_default();

        history.push_back(now);
        while history.len() > self.max_history {
            history.pop_front();
        }

        self.retain_window(history, now);
        history.len()
    }

    /// Live window count for `key` without recording a request
    pub async fn count(&self, key: &str, now: DateTime<Utc>) -> usize {
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .map(|history| history.iter().filter(|&&t| self.in_window(t, now)).count())
            .unwrap_or(0)
    }

    /// Number of keys observed so far
    pub async fn tracked_keys(&self) -> usize {
        self.entries.lock().await.len()
    }

    fn retain_window(&self, history: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>) {
        // Full scan: a caller-supplied `now` may arrive out of order
        history.retain(|&t| self.in_window(t, now));
    }

    fn in_window(&self, t: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - t < self.window
    }
}
