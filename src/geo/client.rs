use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use std::time::Duration;

use crate::config::GeoConfig;
use crate::utils::GuardResult;

/// Country reported when the lookup succeeds without a country field
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// Resolves a client key to a country name
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CountryResolver: Send + Sync {
    async fn resolve_country(&self, key: &str) -> GuardResult<String>;
}

/// Represents an ip-api.com response restricted to `fields=country`
#[derive(Debug, Deserialize)]
pub struct IpApiResponse {
    pub country: Option<String>,
}

/// Client for the ip-api.com JSON endpoint
pub struct IpApiResolver {
    client: ReqwestClient,
    base_url: String,
}

impl IpApiResolver {
    /// Creates a new resolver with the configured per-lookup timeout
    pub fn new(config: &GeoConfig) -> GuardResult<Self> {
        Ok(Self {
            client: ReqwestClient::builder()
                .timeout(Duration::from_secs(config.timeout_seconds))
                .build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CountryResolver for IpApiResolver {
    async fn resolve_country(&self, key: &str) -> GuardResult<String> {
        let url = format!("{}/json/{}", self.base_url, key);

        let response: IpApiResponse = self.client
            .get(&url)
            .query(&[("fields", "country")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.country.unwrap_or_else(|| UNKNOWN_COUNTRY.to_string()))
    }
}
