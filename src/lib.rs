//! Real-time request admission guard.
//!
//! Tracks a sliding-window request count per client key, records anomalies
//! when a key exceeds the configured limit and can automatically blocklist
//! offenders. [`service::AdmissionGate`] is the per-request entry point; the
//! `server` module exposes it over HTTP.

pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod geo;
pub mod server;
pub mod service;
pub mod utils;

pub use error::ServiceError;
pub use events::{EventBroadcaster, GuardEvent};
pub use service::{AdmissionDecision, AdmissionGate, TrafficSnapshot};
