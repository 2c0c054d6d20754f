use serde::Deserialize;

/// Longest sliding window accepted from configuration (one week)
pub const MAX_WINDOW_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Configuration settings for the admission guard
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    /// Rate tracking and blocking policy
    #[serde(default)]
    pub guard: GuardConfig,
    /// Geolocation lookup configuration
    #[serde(default)]
    pub geo: GeoConfig,
    /// Anomaly log configuration
    #[serde(default)]
    pub anomaly_log: AnomalyLogConfig,
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Rate tracking and blocking policy
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// A key is anomalous once its windowed count exceeds this value
    pub request_limit: usize,
    /// Length of the sliding window in seconds
    pub window_seconds: u64,
    /// Place anomalous keys on the blocklist automatically
    pub auto_block: bool,
    /// Memory bound on timestamps retained per key
    pub max_history: usize,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            request_limit: 20,
            window_seconds: 10,
            auto_block: true,
            max_history: 1000,
        }
    }
}

/// Geolocation lookup configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    /// Base URL of the ip-api compatible lookup service
    pub base_url: String,
    /// Per-lookup timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            base_url: "http://ip-api.com".to_string(),
            timeout_seconds: 2,
        }
    }
}

/// Anomaly log configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnomalyLogConfig {
    /// File that receives one JSON line per anomaly
    pub path: String,
}

impl Default for AnomalyLogConfig {
    fn default() -> Self {
        Self {
            path: "anomalies.log".to_string(),
        }
    }
}

/// Server configuration settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind the server to
    pub host: String,
    /// Port number to listen on
    pub port: u16,
    /// Take the client key from the first `X-Forwarded-For` entry when present
    pub trust_forwarded_for: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            trust_forwarded_for: true,
        }
    }
}

impl Settings {
    /// Load configuration from defaults, an optional config file and
    /// environment variables (`APP_GUARD__REQUEST_LIMIT=50`)
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/guard").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the request ledger cannot represent
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let window = self.guard.window_seconds;
        if window == 0 || window > MAX_WINDOW_SECONDS {
            return Err(config::ConfigError::Message(format!(
                "guard.window_seconds must be between 1 and {}, got {}",
                MAX_WINDOW_SECONDS, window
            )));
        }
        if self.guard.max_history == 0 {
            return Err(config::ConfigError::Message(
                "guard.max_history must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
