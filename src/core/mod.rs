//! Core functionality for the admission guard.
//! This module contains the stores consulted on every request: the
//! sliding-window ledger, the geo cache, the anomaly detector and the
//! blocklist.

mod clock;
mod request_ledger;
mod geo_cache;
mod anomaly_detector;
mod anomaly_log;
mod blocklist;

pub use clock::{Clock, SystemClock, ManualClock};
pub use request_ledger::RequestLedger;
pub use geo_cache::{GeoResolutionCache, GeoStatus, GeoLookup, is_local_key, LOCAL_NETWORK, RESOLVING_DISPLAY};
pub use anomaly_detector::{Anomaly, AnomalyDetector};
pub use anomaly_log::{AnomalySink, FileAnomalyLog};
pub use blocklist::BlocklistStore;
