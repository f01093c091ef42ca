//! CDP (Chrome DevTools Protocol) type definitions
//!
//! This module defines the core data structures for CDP communication.

use serde::{Deserialize, Serialize};

/// CDP JSON-RPC request
#[derive(Debug, Clone, Serialize)]
pub struct CdpRequest {
    /// Request ID
    pub id: u64,
    /// Method name (e.g., "Page.navigate")
    pub method: String,
    /// Method parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

/// CDP JSON-RPC response
#[derive(Debug, Clone, Deserialize)]
pub struct CdpRpcResponse {
    /// Response ID (matches request ID)
    pub id: u64,
    /// Response result
    #[serde(default)]
    pub result: serde_json::Value,
    /// Error if any
    #[serde(default)]
    pub error: Option<CdpErrorDetail>,
}

/// CDP JSON-RPC notification (event)
#[derive(Debug, Clone, Deserialize)]
pub struct CdpNotification {
    /// Event method (e.g., "Page.loadEventFired")
    pub method: String,
}

/// CDP error detail
#[derive(Debug, Clone, Deserialize)]
pub struct CdpErrorDetail {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Additional error data
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Page navigation parameters
#[derive(Debug, Clone, Serialize)]
pub struct NavigateParams {
    /// URL to navigate to
    pub url: String,
}

/// Page navigation response
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NavigateResponse {
    /// Frame that navigated
    #[serde(rename = "frameId", default)]
    pub frame_id: Option<String>,
    /// Loader of the new document
    #[serde(rename = "loaderId", default)]
    pub loader_id: Option<String>,
    /// Set when the navigation itself failed (DNS, refused connection, ...)
    #[serde(rename = "errorText", default)]
    pub error_text: Option<String>,
}

/// JavaScript evaluation parameters
#[derive(Debug, Clone, Serialize)]
pub struct EvaluateParams {
    /// JavaScript expression to evaluate
    pub expression: String,
    /// Whether to await promise
    #[serde(skip_serializing_if = "Option::is_none", rename = "awaitPromise")]
    pub await_promise: Option<bool>,
    /// Whether to return as value
    #[serde(skip_serializing_if = "Option::is_none", rename = "returnByValue")]
    pub return_by_value: Option<bool>,
}

/// Remote object (result of JavaScript evaluation)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RemoteObject {
    /// Object type
    #[serde(default)]
    pub r#type: String,
    /// Object subtype
    #[serde(default)]
    pub subtype: Option<String>,
    /// Object value
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    /// Object description
    #[serde(default)]
    pub description: Option<String>,
}

/// Exception details
#[derive(Debug, Clone, Deserialize)]
pub struct ExceptionDetails {
    /// Exception text
    #[serde(default)]
    pub text: Option<String>,
    /// Exception object
    #[serde(default)]
    pub exception: Option<RemoteObject>,
}

/// JavaScript evaluation response
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateResponse {
    /// Evaluation result
    #[serde(default)]
    pub result: RemoteObject,
    /// Exception details if evaluation failed
    #[serde(rename = "exceptionDetails", default)]
    pub exception_details: Option<ExceptionDetails>,
}

/// Entry returned by the `/json/new` HTTP endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TargetDescriptor {
    /// Target ID
    pub id: String,
    /// Target URL
    #[serde(default)]
    pub url: String,
    /// WebSocket debugger URL
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

/// Entry returned by the `/json/version` HTTP endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct VersionDescriptor {
    #[serde(rename = "Browser", default)]
    pub browser: String,
    #[serde(rename = "Protocol-Version", default)]
    pub protocol_version: String,
    #[serde(rename = "User-Agent", default)]
    pub user_agent: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cdp_request_without_params() {
        let request = CdpRequest {
            id: 2,
            method: "Page.enable".to_string(),
            params: None,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"id\":2"));
        assert!(!json.contains("\"params\""));
    }

    #[test]
    fn test_evaluate_response_with_exception() {
        let response: EvaluateResponse = serde_json::from_value(serde_json::json!({
            "result": { "type": "object", "subtype": "error" },
            "exceptionDetails": {
                "text": "Uncaught",
                "exception": { "type": "object", "description": "ReferenceError: x is not defined" }
            }
        }))
        .unwrap();

        let details = response.exception_details.unwrap();
        assert_eq!(
            details.exception.unwrap().description.as_deref(),
            Some("ReferenceError: x is not defined")
        );
    }

    #[test]
    fn test_target_descriptor() {
        let target: TargetDescriptor = serde_json::from_str(
            r#"{"id":"ABC","type":"page","url":"about:blank","webSocketDebuggerUrl":"ws://localhost:9222/devtools/page/ABC"}"#,
        )
        .unwrap();
        assert_eq!(target.id, "ABC");
        assert!(target.web_socket_debugger_url.ends_with("/ABC"));
    }
}
