use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::utils::{GuardError, GuardResult};

/// Install the Prometheus recorder and return a handle for rendering `/metrics`.
///
/// Until this is called the `record_*` helpers are no-ops, which keeps tests
/// free of global recorder state.
pub fn init_metrics() -> GuardResult<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| GuardError::Internal(format!("failed to install metrics recorder: {}", e)))
}

pub fn record_admitted() {
    metrics::increment_counter!("guard_requests_admitted_total");
}

pub fn record_blocked() {
    metrics::increment_counter!("guard_requests_blocked_total");
}

pub fn record_anomaly() {
    metrics::increment_counter!("guard_anomalies_total");
}

/// `outcome` is "resolved", "failed" or "local"
pub fn record_geo_resolution(outcome: &'static str) {
    metrics::increment_counter!("guard_geo_resolutions_total", "outcome" => outcome);
}

pub fn record_blocked_keys(size: usize) {
    metrics::gauge!("guard_blocked_keys", size as f64);
}
