use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::{GuardConfig, Settings};
use crate::core::{
    Anomaly, AnomalyDetector, AnomalySink, BlocklistStore, Clock, FileAnomalyLog,
    GeoResolutionCache, RequestLedger, SystemClock,
};
use crate::events::{EventBroadcaster, GuardEvent};
use crate::geo::{CountryResolver, IpApiResolver};
use crate::utils::{
    log_admission, log_anomaly, log_blocked_request, log_blocklist_change,
    log_persistence_failure, record_admitted, record_anomaly, record_blocked,
    record_blocked_keys, GuardResult,
};

/// Result of running a request through the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// The request may proceed to normal handling
    Admitted(TrafficSnapshot),
    /// The key is on the blocklist; nothing was recorded
    Blocked,
}

impl AdmissionDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, AdmissionDecision::Admitted(_))
    }
}

/// What the gate observed for an admitted request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficSnapshot {
    pub key: String,
    /// Window count including this request
    pub count: usize,
    /// Country as reported at admission time
    pub country: String,
    /// Anomaly recorded by this request, if any
    pub anomaly: Option<Anomaly>,
}

/// Entry point invoked for every incoming request
///
/// Owns the process-wide stores. A key is either admitted (the default) or
/// blocked; it becomes blocked through auto-block or `manual_block` and only
/// `manual_unblock` lets it back in. Blocking never touches the key's ledger
/// or anomaly history.
pub struct AdmissionGate {
    /// Policy for thresholds and auto-block
    config: GuardConfig,
    ledger: RequestLedger,
    geo: GeoResolutionCache,
    detector: AnomalyDetector,
    blocklist: BlocklistStore,
    broadcaster: EventBroadcaster,
    anomaly_sink: Arc<dyn AnomalySink>,
    clock: Arc<dyn Clock>,
}

impl AdmissionGate {
    /// Creates a new admission gate
    ///
    /// # Arguments
    ///
    /// * `config` - Threshold, window, auto-block and history bound
    /// * `resolver` - Geolocation collaborator used for background lookups
    /// * `anomaly_sink` - Append-only anomaly persistence
    /// * `broadcaster` - Destination for observer events
    /// * `clock` - Time source for request timestamps
    pub fn new(
        config: GuardConfig,
        resolver: Arc<dyn CountryResolver>,
        anomaly_sink: Arc<dyn AnomalySink>,
        broadcaster: EventBroadcaster,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger: RequestLedger::from_config(&config),
            geo: GeoResolutionCache::new(resolver, broadcaster.clone(), Arc::clone(&clock)),
            detector: AnomalyDetector::new(config.request_limit),
            blocklist: BlocklistStore::new(),
            broadcaster,
            anomaly_sink,
            clock,
            config,
        }
    }

    /// Builds a gate wired to the HTTP geolocation service, the anomaly log
    /// file and the system clock
    pub fn from_settings(settings: &Settings) -> GuardResult<Self> {
        let resolver = IpApiResolver::new(&settings.geo)?;
        Ok(Self::new(
            settings.guard.clone(),
            Arc::new(resolver),
            Arc::new(FileAnomalyLog::new(&settings.anomaly_log.path)),
            EventBroadcaster::default(),
            Arc::new(SystemClock),
        ))
    }

    /// Processes a request from `key`
    ///
    /// Blocked keys are rejected before anything is recorded. Otherwise the
    /// request is counted, its country is looked up (never waiting on the
    /// network), a `traffic_update` is published and the count is checked
    /// against the threshold.
    pub async fn process_request(&self, key: &str) -> AdmissionDecision {
        if self.blocklist.contains(key).await {
            log_blocked_request(key);
            record_blocked();
            return AdmissionDecision::Blocked;
        }

        let (count, now) = self.ledger.record_with(key, self.clock.as_ref()).await;

        let lookup = self.geo.lookup(key, count).await;
        let country = lookup.country().to_string();

        self.broadcaster
            .publish(GuardEvent::traffic_update(key, count, &country, now));
        log_admission(key, count, &country);
        record_admitted();

        let anomaly = self.detector.evaluate(key, count, &country, now).await;
        if let Some(anomaly) = &anomaly {
            self.handle_anomaly(anomaly).await;
        }

        AdmissionDecision::Admitted(TrafficSnapshot {
            key: key.to_string(),
            count,
            country,
            anomaly,
        })
    }

    async fn handle_anomaly(&self, anomaly: &Anomaly) {
        log_anomaly(&anomaly.key, anomaly.count, self.detector.request_limit(), &anomaly.country);
        record_anomaly();

        self.spawn_persistence(anomaly.clone());
        self.broadcaster.publish(GuardEvent::DdosAlert(anomaly.clone()));

        if self.config.auto_block && self.blocklist.add(&anomaly.key).await {
            tracing::warn!(
                "[AUTO-BLOCK] {} ({}) added to blocklist",
                anomaly.key,
                anomaly.country
            );
            log_blocklist_change(&anomaly.key, true, "auto");
            record_blocked_keys(self.blocklist.len().await);
            self.broadcaster.publish(GuardEvent::IpBlocked {
                key: anomaly.key.clone(),
            });
        }
    }

    fn spawn_persistence(&self, anomaly: Anomaly) {
        let sink = Arc::clone(&self.anomaly_sink);
        tokio::spawn(async move {
            if let Err(e) = sink.append(&anomaly).await {
                log_persistence_failure(&anomaly.key, &e.to_string());
            }
        });
    }

    /// Operator block. Returns `true` if the key was not blocked before.
    pub async fn manual_block(&self, key: &str) -> bool {
        let added = self.blocklist.add(key).await;
        if added {
            log_blocklist_change(key, true, "manual");
            record_blocked_keys(self.blocklist.len().await);
            self.broadcaster
                .publish(GuardEvent::IpBlocked { key: key.to_string() });
        }
        added
    }

    /// Operator unblock. Returns `true` if the key was blocked.
    pub async fn manual_unblock(&self, key: &str) -> bool {
        let removed = self.blocklist.remove(key).await;
        if removed {
            tracing::info!("[MANUAL-UNBLOCK] {} removed from blocklist.", key);
            log_blocklist_change(key, false, "manual");
            record_blocked_keys(self.blocklist.len().await);
            self.broadcaster
                .publish(GuardEvent::IpUnblocked { key: key.to_string() });
        }
        removed
    }

    /// Attach a new observer
    ///
    /// Returns the `update_blocked_list` snapshot to send first and a
    /// subscription for everything after it. The subscription is taken before
    /// the snapshot so no blocklist transition falls between the two.
    pub async fn attach_observer(&self) -> (GuardEvent, broadcast::Receiver<GuardEvent>) {
        let receiver = self.broadcaster.subscribe();
        let snapshot = GuardEvent::UpdateBlockedList {
            blocked: self.blocklist.snapshot().await,
        };
        (snapshot, receiver)
    }

    pub async fn is_blocked(&self, key: &str) -> bool {
        self.blocklist.contains(key).await
    }

    pub async fn blocked_keys(&self) -> Vec<String> {
        self.blocklist.snapshot().await
    }

    pub async fn anomalies(&self) -> Vec<Anomaly> {
        self.detector.anomalies().await
    }

    pub fn ledger(&self) -> &RequestLedger {
        &self.ledger
    }

    pub fn geo(&self) -> &GeoResolutionCache {
        &self.geo
    }

    pub fn broadcaster(&self) -> &EventBroadcaster {
        &self.broadcaster
    }
}
