//! Utility modules for the admission guard.
//! This module contains common utilities used across the application.

mod logging;
mod error;
mod telemetry;

pub use logging::{
    init_logging,
    create_request_span,
    log_admission,
    log_blocked_request,
    log_anomaly,
    log_blocklist_change,
    log_geo_resolution,
    log_persistence_failure,
};

pub use error::{GuardError, GuardResult};

pub use telemetry::{
    init_metrics,
    record_admitted,
    record_blocked,
    record_anomaly,
    record_geo_resolution,
    record_blocked_keys,
};
