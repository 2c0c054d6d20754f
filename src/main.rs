use std::sync::Arc;

use admission_guard::config::load_config;
use admission_guard::server::{self, AppState};
use admission_guard::service::AdmissionGate;
use admission_guard::utils::{init_logging, init_metrics, GuardError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    init_logging();
    tracing::info!("Starting admission guard...");

    // Load configuration
    let settings = load_config().map_err(GuardError::Config)?;
    tracing::info!(
        request_limit = %settings.guard.request_limit,
        window_seconds = %settings.guard.window_seconds,
        auto_block = %settings.guard.auto_block,
        "Configuration loaded successfully"
    );

    let metrics = match init_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "metrics exporter disabled");
            None
        }
    };

    let gate = Arc::new(AdmissionGate::from_settings(&settings)?);
    let state = AppState {
        gate,
        metrics,
        trust_forwarded_for: settings.server.trust_forwarded_for,
    };

    tracing::info!(
        host = %settings.server.host,
        port = %settings.server.port,
        "Server configuration loaded"
    );

    server::serve(&settings.server, state).await?;

    tracing::info!("Admission guard stopped");
    Ok(())
}
