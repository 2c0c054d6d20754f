use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core::Clock;
use crate::events::{EventBroadcaster, GuardEvent};
use crate::geo::{CountryResolver, UNKNOWN_COUNTRY};
use crate::utils::{log_geo_resolution, record_geo_resolution};

/// Shown to observers while a lookup is in flight
pub const RESOLVING_DISPLAY: &str = "Resolving...";
/// Country assigned to private and loopback keys
pub const LOCAL_NETWORK: &str = "Local Network";

const PRIVATE_PREFIXES: [&str; 3] = ["127.", "192.168.", "10."];

/// Resolution state of a single key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeoStatus {
    Unresolved,
    Resolving,
    Resolved(String),
}

/// What `lookup` reported to the request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeoLookup {
    /// The country is already known
    Resolved(String),
    /// Another request already started the lookup
    InFlight,
    /// This call started a background lookup
    Scheduled,
}

impl GeoLookup {
    /// Country value to report for this request
    pub fn country(&self) -> &str {
        match self {
            GeoLookup::Resolved(country) => country,
            GeoLookup::InFlight | GeoLookup::Scheduled => RESOLVING_DISPLAY,
        }
    }
}

/// Returns true for keys in well-known private or loopback ranges
pub fn is_local_key(key: &str) -> bool {
    PRIVATE_PREFIXES.iter().any(|prefix| key.starts_with(prefix))
}

/// Single-flight country cache in front of a [`CountryResolver`]
///
/// Entering `Resolving` is a latch: only the request that performs the
/// `Unresolved -> Resolving` transition spawns a lookup. The spawned task
/// writes its result only if the key is still `Resolving`, so a resolved key
/// never goes back to `Resolving` and a stale completion never overwrites a
/// fresher result. Lookup failures settle on `"Unknown"` and are not retried.
pub struct GeoResolutionCache {
    statuses: Arc<Mutex<HashMap<String, GeoStatus>>>,
    resolver: Arc<dyn CountryResolver>,
    broadcaster: EventBroadcaster,
    clock: Arc<dyn Clock>,
}

impl GeoResolutionCache {
    pub fn new(
        resolver: Arc<dyn CountryResolver>,
        broadcaster: EventBroadcaster,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            statuses: Arc::new(Mutex::new(HashMap::new())),
            resolver,
            broadcaster,
            clock,
        }
    }

    /// Report the country for `key`, starting a background lookup if needed.
    ///
    /// `count` is the window count at scheduling time; it is carried into the
    /// `traffic_update` emitted when the lookup completes.
    pub async fn lookup(&self, key: &str, count: usize) -> GeoLookup {
        let mut statuses = self.statuses.lock().await;
        let status = statuses
            .entry(key.to_string())
            .or_insert(GeoStatus::Unresolved);

        match &*status {
            GeoStatus::Resolved(country) => return GeoLookup::Resolved(country.clone()),
            GeoStatus::Resolving => return GeoLookup::InFlight,
            GeoStatus::Unresolved => {}
        }

        if is_local_key(key) {
            *status = GeoStatus::Resolved(LOCAL_NETWORK.to_string());
            record_geo_resolution("local");
            return GeoLookup::Resolved(LOCAL_NETWORK.to_string());
        }

        *status = GeoStatus::Resolving;
        drop(statuses);

        self.spawn_resolution(key.to_string(), count);
        GeoLookup::Scheduled
    }

    /// Current state of `key`; keys never looked up are `Unresolved`
    pub async fn status(&self, key: &str) -> GeoStatus {
        self.statuses
            .lock()
            .await
            .get(key)
            .cloned()
            .unwrap_or(GeoStatus::Unresolved)
    }

    fn spawn_resolution(&self, key: String, count: usize) {
        let statuses = Arc::clone(&self.statuses);
        let resolver = Arc::clone(&self.resolver);
        let broadcaster = self.broadcaster.clone();
        let clock = Arc::clone(&self.clock);

        tokio::spawn(async move {
            let country = match resolver.resolve_country(&key).await {
                Ok(country) => {
                    log_geo_resolution(&key, true, &country);
                    record_geo_resolution("resolved");
                    country
                }
                Err(e) => {
                    log_geo_resolution(&key, false, &e.to_string());
                    record_geo_resolution("failed");
                    UNKNOWN_COUNTRY.to_string()
                }
            };

            if settle(&statuses, &key, &country).await {
                broadcaster.publish(GuardEvent::traffic_update(&key, count, &country, clock.now()));
            }
        });
    }
}

/// Store `country` for `key` if it is still awaiting resolution.
/// Returns false when the key already left `Resolving`.
async fn settle(statuses: &Mutex<HashMap<String, GeoStatus>>, key: &str, country: &str) -> bool {
    let mut statuses = statuses.lock().await;
    match statuses.get_mut(key) {
        Some(status) if *status == GeoStatus::Resolving => {
            *status = GeoStatus::Resolved(country.to_string());
            true
        }
        _ => false,
    }
}
