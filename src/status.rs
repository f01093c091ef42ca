//! Kuma status document
//!
//! `/_kuma_status.json` reports service health, the search index size and whether the site
//! runs in maintenance mode. Scenarios read it once per suite run.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use crate::{Error, Result};

/// Index size above which the deployment is assumed to carry a full production index
pub const FULL_INDEX_THRESHOLD: u64 = 10_000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KumaStatus {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub services: Services,
    #[serde(default)]
    pub settings: StatusSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Services {
    pub database: ServiceStatus,
    pub search: SearchStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceStatus {
    pub available: bool,
    pub populated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchStatus {
    pub available: bool,
    pub populated: bool,
    /// Indexed documents; null when search is unavailable
    pub count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusSettings {
    #[serde(rename = "MAINTENANCE_MODE")]
    pub maintenance_mode: bool,
    #[serde(rename = "REVISION_HASH")]
    pub revision_hash: Option<String>,
}

impl KumaStatus {
    pub fn is_maintenance_mode(&self) -> bool {
        self.settings.maintenance_mode
    }

    pub fn search_count(&self) -> u64 {
        self.services.search.count.unwrap_or(0)
    }

    pub fn has_full_search_index(&self) -> bool {
        self.search_count() > FULL_INDEX_THRESHOLD
    }
}

/// Source of the status document
#[async_trait]
pub trait StatusProvider: Send + Sync {
    async fn fetch(&self) -> Result<KumaStatus>;
}

/// Fetches the status document over HTTP
#[derive(Debug, Clone)]
pub struct HttpStatusProvider {
    client: reqwest::Client,
    url: String,
}

impl HttpStatusProvider {
    pub fn new(base_url: &str, status_path: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                status_path.trim_start_matches('/')
            ),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl StatusProvider for HttpStatusProvider {
    async fn fetch(&self) -> Result<KumaStatus> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(Error::http(format!("{} returned {}", self.url, response.status())));
        }

        let status: KumaStatus = serde_json::from_str(&response.text().await?)?;
        info!(
            "Kuma status: maintenance_mode={}, search count={}",
            status.is_maintenance_mode(),
            status.search_count()
        );
        Ok(status)
    }
}

/// Fixed status document
#[derive(Debug, Clone, Default)]
pub struct StaticStatusProvider {
    status: KumaStatus,
}

impl StaticStatusProvider {
    pub fn new(status: KumaStatus) -> Self {
        Self { status }
    }

    pub fn maintenance_mode(enabled: bool) -> Self {
        let mut status = KumaStatus::default();
        status.settings.maintenance_mode = enabled;
        Self::new(status)
    }
}

#[async_trait]
impl StatusProvider for StaticStatusProvider {
    async fn fetch(&self) -> Result<KumaStatus> {
        Ok(self.status.clone())
    }
}
