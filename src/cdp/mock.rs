//! Mock CDP implementation for testing
//!
//! Records every command and answers from canned responses, so the client and the CDP driver
//! can be exercised without a browser.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::cdp::client::CdpClientImpl;
use crate::cdp::traits::*;
use crate::Error;

/// 1x1 transparent PNG, base64 encoded
const MOCK_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

/// Mock CDP connection
#[derive(Debug, Default)]
pub struct MockCdpConnection {
    is_closed: AtomicBool,
    next_id: AtomicU64,
    method_responses: Mutex<HashMap<String, Value>>,
    script_responses: Mutex<Vec<(String, Value)>>,
    failures: Mutex<Vec<(String, CdpError)>>,
    sent: Mutex<Vec<(String, Value)>>,
}

impl MockCdpConnection {
    /// Create a new mock CDP connection
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method` with `result` instead of the default
    pub fn respond_to_method(&self, method: &str, result: Value) {
        if let Ok(mut responses) = self.method_responses.lock() {
            responses.insert(method.to_string(), result);
        }
    }

    /// Answer any `Runtime.evaluate` whose expression contains `fragment` with `value`
    ///
    /// Later registrations win over earlier ones.
    pub fn respond_to_script(&self, fragment: &str, value: Value) {
        if let Ok(mut responses) = self.script_responses.lock() {
            responses.push((fragment.to_string(), value));
        }
    }

    /// Answer the next `method` with a protocol error instead of a result
    ///
    /// Queued failures for the same method are used up in order.
    pub fn fail_next(&self, method: &str, code: i32, message: &str) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push((
                method.to_string(),
                CdpError {
                    code,
                    message: message.to_string(),
                    data: None,
                },
            ));
        }
    }

    fn take_failure(&self, method: &str) -> Option<CdpError> {
        let mut failures = self.failures.lock().ok()?;
        let index = failures.iter().position(|(m, _)| m == method)?;
        Some(failures.remove(index).1)
    }

    /// Methods sent so far, in order
    pub fn sent_methods(&self) -> Vec<String> {
        self.sent
            .lock()
            .map(|sent| sent.iter().map(|(m, _)| m.clone()).collect())
            .unwrap_or_default()
    }

    /// Commands sent so far, in order
    pub fn sent_commands(&self) -> Vec<(String, Value)> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// Wrap a JSON value the way Runtime.evaluate reports it with returnByValue
    fn remote_object(value: &Value) -> Value {
        match value {
            Value::String(_) => json!({ "type": "string", "value": value }),
            Value::Number(_) => json!({ "type": "number", "value": value }),
            Value::Bool(_) => json!({ "type": "boolean", "value": value }),
            Value::Null => json!({ "type": "object", "subtype": "null", "value": null }),
            _ => json!({ "type": "object", "value": value }),
        }
    }

    fn evaluate_response(&self, params: &Value) -> Value {
        let expression = params.get("expression").and_then(|e| e.as_str()).unwrap_or("");
        let scripted = self.script_responses.lock().ok().and_then(|responses| {
            responses
                .iter()
                .rev()
                .find(|(fragment, _)| expression.contains(fragment.as_str()))
                .map(|(_, value)| value.clone())
        });

        match scripted {
            Some(value) => json!({ "result": Self::remote_object(&value) }),
            None => json!({ "result": { "type": "undefined" } }),
        }
    }
}

#[async_trait]
impl CdpConnection for MockCdpConnection {
    async fn send_command(&self, method: &str, params: Value) -> Result<CdpResponse, Error> {
        if self.is_closed.load(Ordering::Relaxed) {
            return Err(Error::cdp("Connection is closed"));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((method.to_string(), params.clone()));
        }

        if let Some(error) = self.take_failure(method) {
            return Ok(CdpResponse {
                id,
                result: None,
                error: Some(error),
            });
        }

        let canned = self
            .method_responses
            .lock()
            .ok()
            .and_then(|responses| responses.get(method).cloned());

        let result = match (canned, method) {
            (Some(result), _) => result,
            (None, "Page.navigate") => json!({
                "frameId": "mock-frame",
                "loaderId": uuid::Uuid::new_v4().to_string(),
            }),
            (None, "Runtime.evaluate") => self.evaluate_response(&params),
            (None, "Page.captureScreenshot") => json!({ "data": MOCK_PNG_BASE64 }),
            (None, _) => json!({}),
        };

        Ok(CdpResponse {
            id,
            result: Some(result),
            error: None,
        })
    }

    async fn close(&self) -> Result<(), Error> {
        self.is_closed.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn is_active(&self) -> bool {
        !self.is_closed.load(Ordering::Relaxed)
    }
}

/// Mock CDP browser
///
/// Hands out clients over fresh [`MockCdpConnection`]s and keeps them for inspection.
#[derive(Debug, Default)]
pub struct MockCdpBrowser {
    connections: Mutex<Vec<Arc<MockCdpConnection>>>,
    closed_targets: Mutex<Vec<String>>,
    refuse_clients: Mutex<Option<String>>,
}

impl MockCdpBrowser {
    /// Create a new mock CDP browser
    pub fn new() -> Self {
        Self::default()
    }

    /// Connections handed out so far
    pub fn connections(&self) -> Vec<Arc<MockCdpConnection>> {
        self.connections.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Fail every later `create_client` with a WebSocket error carrying `reason`
    pub fn refuse_clients(&self, reason: &str) {
        if let Ok(mut refuse) = self.refuse_clients.lock() {
            *refuse = Some(reason.to_string());
        }
    }

    /// Targets closed so far
    pub fn closed_targets(&self) -> Vec<String> {
        self.closed_targets.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CdpBrowser for MockCdpBrowser {
    async fn create_client(&self, _target_ws_url: &str) -> Result<Arc<dyn CdpClient>, Error> {
        if let Some(reason) = self.refuse_clients.lock().ok().and_then(|r| r.clone()) {
            return Err(Error::websocket(reason));
        }
        let connection = Arc::new(MockCdpConnection::new());
        if let Ok(mut connections) = self.connections.lock() {
            connections.push(connection.clone());
        }
        Ok(Arc::new(CdpClientImpl::new(connection)))
    }

    async fn create_target(&self, url: &str) -> Result<TargetInfo, Error> {
        let target_id = uuid::Uuid::new_v4().to_string();
        Ok(TargetInfo {
            ws_url: format!("ws://localhost:9222/devtools/page/{}", target_id),
            target_id,
            url: url.to_string(),
        })
    }

    async fn close_target(&self, target_id: &str) -> Result<(), Error> {
        if let Ok(mut closed) = self.closed_targets.lock() {
            closed.push(target_id.to_string());
        }
        Ok(())
    }

    async fn get_version(&self) -> Result<BrowserVersion, Error> {
        Ok(BrowserVersion {
            protocol_version: "1.3".to_string(),
            product: "Chrome/120.0.0.0".to_string(),
            user_agent: "Mock Chrome/120.0.0.0".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_evaluate() {
        let conn = MockCdpConnection::new();
        conn.respond_to_script("readyState", json!("complete"));

        let response = conn
            .send_command("Runtime.evaluate", json!({ "expression": "document.readyState" }))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["result"]["type"], "string");
        assert_eq!(result["result"]["value"], "complete");
    }

    #[tokio::test]
    async fn test_queued_failure_is_used_once() {
        let conn = MockCdpConnection::new();
        conn.fail_next("Runtime.evaluate", -32000, "Execution context was destroyed.");

        let first = conn.send_command("Runtime.evaluate", json!({ "expression": "1" })).await.unwrap();
        assert_eq!(first.error.unwrap().code, -32000);

        let second = conn.send_command("Runtime.evaluate", json!({ "expression": "1" })).await.unwrap();
        assert!(second.error.is_none());
    }

    #[tokio::test]
    async fn test_closed_connection_rejects_commands() {
        let conn = MockCdpConnection::new();
        conn.close().await.unwrap();
        assert!(!conn.is_active());
        assert!(conn.send_command("Page.enable", json!({})).await.is_err());
    }
}
