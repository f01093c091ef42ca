//! CDP browser control implementation
//!
//! Talks to the HTTP endpoints of an already running Chrome (`--remote-debugging-port`) to open
//! and close page targets, and connects a client to each target's WebSocket.

use super::client::CdpClientImpl;
use super::connection::CdpWebSocketConnection;
use super::traits::*;
use super::types::{TargetDescriptor, VersionDescriptor};
use crate::Error;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// CDP browser implementation
#[derive(Debug, Clone)]
pub struct CdpBrowserImpl {
    /// Browser endpoint (e.g., "ws://localhost:9222")
    endpoint: String,
    /// Shared HTTP client for the /json endpoints
    http: reqwest::Client,
}

impl CdpBrowserImpl {
    /// Create a new CDP browser controller
    ///
    /// # Arguments
    /// * `endpoint` - Browser endpoint (e.g., "ws://localhost:9222")
    pub fn new<S: Into<String>>(endpoint: S) -> Self {
        let endpoint = endpoint.into();
        info!("Creating CDP browser controller for endpoint: {}", endpoint);
        Self {
            endpoint,
            http: reqwest::Client::new(),
        }
    }

    /// HTTP form of the endpoint
    fn http_endpoint(&self) -> String {
        self.endpoint
            .replacen("ws://", "http://", 1)
            .replacen("wss://", "https://", 1)
            .trim_end_matches('/')
            .to_string()
    }

    fn unreachable(&self, e: reqwest::Error) -> Error {
        Error::http(format!(
            "Failed to reach Chrome at {} ({}). Start it with --remote-debugging-port=9222",
            self.endpoint, e
        ))
    }
}

#[async_trait]
impl CdpBrowser for CdpBrowserImpl {
    async fn create_client(&self, target_ws_url: &str) -> Result<Arc<dyn CdpClient>, Error> {
        info!("Creating CDP client for target: {}", target_ws_url);

        let connection = CdpWebSocketConnection::connect(target_ws_url).await?;
        let client = Arc::new(CdpClientImpl::new(connection));

        client.enable_domain("Page").await?;
        client.enable_domain("Runtime").await?;

        Ok(client)
    }

    async fn create_target(&self, url: &str) -> Result<TargetInfo, Error> {
        let new_url = format!("{}/json/new?{}", self.http_endpoint(), url);
        debug!("Creating new page via HTTP API: {}", new_url);

        let response = self
            .http
            .put(&new_url)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;

        let text = response.text().await?;
        let target: TargetDescriptor = serde_json::from_str(&text).map_err(|e| {
            Error::cdp(format!("Failed to parse new target response: {} (response was: {})", e, text))
        })?;

        Ok(TargetInfo {
            target_id: target.id,
            url: target.url,
            ws_url: target.web_socket_debugger_url,
        })
    }

    async fn close_target(&self, target_id: &str) -> Result<(), Error> {
        let url = format!("{}/json/close/{}", self.http_endpoint(), target_id);
        debug!("Closing target via HTTP API: {}", url);

        let response = self.http.get(&url).send().await.map_err(|e| self.unreachable(e))?;
        if !response.status().is_success() {
            return Err(Error::http(format!(
                "Closing target {} returned {}",
                target_id,
                response.status()
            )));
        }
        Ok(())
    }

    async fn get_version(&self) -> Result<BrowserVersion, Error> {
        let url = format!("{}/json/version", self.http_endpoint());
        let version: VersionDescriptor = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?
            .json()
            .await?;

        Ok(BrowserVersion {
            protocol_version: version.protocol_version,
            product: version.browser,
            user_agent: version.user_agent,
        })
    }
}
