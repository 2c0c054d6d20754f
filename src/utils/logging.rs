use std::env;
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

/// Initialize the logging system with the specified log level
pub fn init_logging() {
    // Get the log level from environment variable or default to INFO
    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_level(true)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .pretty()
        .finish();

    // A second call (tests, embedding) keeps the subscriber already installed
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Create a new span for tracking request context
pub fn create_request_span(key: &str) -> tracing::Span {
    tracing::info_span!(
        "request",
        request_id = %uuid::Uuid::new_v4(),
        ip = %key,
    )
}

/// Log an admitted request
pub fn log_admission(ip: &str, count: usize, country: &str) {
    tracing::debug!(
        ip = %ip,
        count = %count,
        country = %country,
        event = "request_admitted",
    );
}

/// Log a request rejected because its key is on the blocklist
pub fn log_blocked_request(ip: &str) {
    tracing::warn!(
        ip = %ip,
        event = "request_blocked",
        timestamp = %chrono::Utc::now()
    );
}

/// Log a recorded anomaly
pub fn log_anomaly(ip: &str, count: usize, threshold: usize, country: &str) {
    tracing::error!(
        ip = %ip,
        request_count = %count,
        threshold = %threshold,
        country = %country,
        event = "ddos_detected",
        timestamp = %chrono::Utc::now()
    );
}

/// Log a blocklist transition. `source` is "auto" or "manual".
pub fn log_blocklist_change(ip: &str, blocked: bool, source: &str) {
    if blocked {
        tracing::warn!(ip = %ip, source = %source, event = "ip_blocked", "{} added to blocklist", ip);
    } else {
        tracing::info!(ip = %ip, source = %source, event = "ip_unblocked", "{} removed from blocklist", ip);
    }
}

/// Log the outcome of a background geolocation lookup
pub fn log_geo_resolution(ip: &str, success: bool, details: &str) {
    if success {
        tracing::debug!(ip = %ip, country = %details, event = "geo_resolved");
    } else {
        tracing::warn!(ip = %ip, error = %details, event = "geo_resolution_failed");
    }
}

/// Log a failed anomaly log write
pub fn log_persistence_failure(ip: &str, error: &str) {
    tracing::error!(
        ip = %ip,
        error = %error,
        event = "anomaly_persistence_failed",
    );
}
