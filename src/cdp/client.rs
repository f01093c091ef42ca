//! CDP client implementation
//!
//! This module provides a high-level CDP client with typed methods for common operations.

use super::traits::*;
use super::types::*;
use crate::Error;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::sync::Arc;
use tracing::{debug, info};

/// Interval between `document.readyState` probes after a navigation
const READY_STATE_POLL_MS: u64 = 100;

/// CDP client implementation
#[derive(Debug, Clone)]
pub struct CdpClientImpl {
    /// Underlying CDP connection
    connection: Arc<dyn CdpConnection>,
}

impl CdpClientImpl {
    /// Create a new CDP client
    ///
    /// # Arguments
    /// * `connection` - CDP connection instance
    pub fn new(connection: Arc<dyn CdpConnection>) -> Self {
        Self { connection }
    }

    /// Parse remote object value to evaluation result
    fn parse_remote_object(obj: &RemoteObject) -> EvaluationResult {
        match obj.r#type.as_str() {
            "string" => EvaluationResult::String(
                obj.value
                    .as_ref()
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
            ),
            "number" => EvaluationResult::Number(obj.value.as_ref().and_then(|v| v.as_f64()).unwrap_or(0.0)),
            "boolean" => EvaluationResult::Bool(obj.value.as_ref().and_then(|v| v.as_bool()).unwrap_or(false)),
            "object" if obj.subtype.as_deref() == Some("null") => EvaluationResult::Null,
            "object" => EvaluationResult::Object(obj.value.clone().unwrap_or(serde_json::Value::Null)),
            _ => EvaluationResult::Null,
        }
    }
}

#[async_trait]
impl CdpClient for CdpClientImpl {
    fn connection(&self) -> Arc<dyn CdpConnection> {
        Arc::clone(&self.connection)
    }

    async fn navigate(&self, url: &str, timeout_ms: u64) -> Result<NavigationResult, Error> {
        info!("Navigating to {}", url);

        let params = serde_json::to_value(NavigateParams { url: url.to_string() })?;
        let result = self.call_method("Page.navigate", params).await?;
        let response: NavigateResponse = serde_json::from_value(result).unwrap_or_default();

        if let Some(error_text) = response.error_text {
            return Err(Error::navigation_failed(format!("{}: {}", url, error_text)));
        }

        // Poll document.readyState; the readiness locator wait of the page object does the rest.
        let max_attempts = (timeout_ms / READY_STATE_POLL_MS).max(1);
        let mut is_loaded = false;

        for attempt in 0..max_attempts {
            tokio::time::sleep(tokio::time::Duration::from_millis(READY_STATE_POLL_MS)).await;

            match self.evaluate("document.readyState", false).await {
                Ok(EvaluationResult::String(state)) if state == "complete" => {
                    debug!("Page loaded on attempt {}", attempt + 1);
                    is_loaded = true;
                    break;
                }
                Ok(other) => debug!("Document ready state on attempt {}: {:?}", attempt + 1, other),
                // The execution context is torn down mid-navigation; keep polling.
                Err(e) => debug!("Ready state probe failed on attempt {}: {}", attempt + 1, e),
            }
        }

        if !is_loaded {
            info!("document.readyState did not reach complete for {}", url);
        }

        Ok(NavigationResult {
            loader_id: response.loader_id,
            url: url.to_string(),
            is_loaded,
        })
    }

    async fn evaluate(&self, script: &str, await_promise: bool) -> Result<EvaluationResult, Error> {
        let params = serde_json::to_value(EvaluateParams {
            expression: script.to_string(),
            await_promise: Some(await_promise),
            return_by_value: Some(true),
        })?;

        let result = self.call_method("Runtime.evaluate", params).await?;
        let response: EvaluateResponse = serde_json::from_value(result)
            .map_err(|e| Error::cdp(format!("Failed to parse EvaluateResponse: {}", e)))?;

        if let Some(details) = response.exception_details {
            return Err(Error::script_execution_failed(
                details
                    .exception
                    .and_then(|e| e.description)
                    .or(details.text)
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        Ok(Self::parse_remote_object(&response.result))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, Error> {
        debug!("Capturing screenshot");

        let result = self
            .call_method("Page.captureScreenshot", serde_json::json!({ "format": "png" }))
            .await?;

        let data = result
            .get("data")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::cdp("No data in screenshot result"))?;

        BASE64
            .decode(data)
            .map_err(|e| Error::cdp(format!("Failed to decode screenshot: {}", e)))
    }

    async fn enable_domain(&self, domain: &str) -> Result<(), Error> {
        debug!("Enabling domain: {}", domain);
        self.call_method(&format!("{}.enable", domain), serde_json::json!({})).await?;
        Ok(())
    }

    async fn call_method(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, Error> {
        let response = self.connection.send_command(method, params).await?;

        if let Some(error) = response.error {
            return Err(Error::cdp(format!("{}: {} (code: {})", method, error.message, error.code)));
        }

        response.result.ok_or_else(|| Error::cdp("No result in response"))
    }
}
