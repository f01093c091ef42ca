//! Unified error types for kuma-pages

use thiserror::Error;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for kuma-pages
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket errors
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// CDP protocol errors
    #[error("CDP error: {0}")]
    Cdp(String),

    /// HTTP errors (status document, link checks, CDP HTTP endpoints)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A locator matched nothing
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// The element belongs to a document that has since been replaced
    #[error("Stale element reference: {0}")]
    StaleElement(String),

    /// The element exists but cannot receive input
    #[error("Element not interactable: {0}")]
    NotInteractable(String),

    /// Timeout
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// Navigation failed
    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    /// Script execution failed
    #[error("Script execution failed: {0}")]
    ScriptExecutionFailed(String),

    /// Expected and observed page state disagree
    #[error("Assertion failed: {what}: expected {expected}, observed {observed}")]
    Assertion {
        what: String,
        expected: String,
        observed: String,
    },

    /// A URL did not resolve as expected
    #[error("Link check failed for {url}: {detail}")]
    LinkCheck { url: String, detail: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new WebSocket error
    pub fn websocket<S: Into<String>>(msg: S) -> Self {
        Error::WebSocket(msg.into())
    }

    /// Create a new CDP error
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp(msg.into())
    }

    /// Create a new HTTP error
    pub fn http<S: Into<String>>(msg: S) -> Self {
        Error::Http(msg.into())
    }

    /// Create a new element not found error
    pub fn element_not_found<S: Into<String>>(what: S) -> Self {
        Error::ElementNotFound(what.into())
    }

    /// Create a new stale element error
    pub fn stale_element<S: Into<String>>(reference: S) -> Self {
        Error::StaleElement(reference.into())
    }

    /// Create a new not interactable error
    pub fn not_interactable<S: Into<String>>(what: S) -> Self {
        Error::NotInteractable(what.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Error::Timeout(msg.into())
    }

    /// Create a new navigation failed error
    pub fn navigation_failed<S: Into<String>>(msg: S) -> Self {
        Error::NavigationFailed(msg.into())
    }

    /// Create a new script execution failed error
    pub fn script_execution_failed<S: Into<String>>(msg: S) -> Self {
        Error::ScriptExecutionFailed(msg.into())
    }

    /// Create a new assertion error
    pub fn assertion<W, E, O>(what: W, expected: E, observed: O) -> Self
    where
        W: Into<String>,
        E: std::fmt::Display,
        O: std::fmt::Display,
    {
        Error::Assertion {
            what: what.into(),
            expected: expected.to_string(),
            observed: observed.to_string(),
        }
    }

    /// Create a new link check error
    pub fn link_check<U: Into<String>, D: Into<String>>(url: U, detail: D) -> Self {
        Error::LinkCheck {
            url: url.into(),
            detail: detail.into(),
        }
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Lookup failures that a polling wait should retry rather than report
    pub fn is_transient_lookup(&self) -> bool {
        matches!(self, Error::ElementNotFound(_) | Error::StaleElement(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assertion_message_separates_expected_and_observed() {
        let err = Error::assertion("search_result_items_length", 10, 7);
        assert_eq!(
            err.to_string(),
            "Assertion failed: search_result_items_length: expected 10, observed 7"
        );
    }

    #[test]
    fn test_transient_lookup_kinds() {
        assert!(Error::element_not_found("#main-q").is_transient_lookup());
        assert!(Error::stale_element("ref-1").is_transient_lookup());
        assert!(!Error::timeout("waiting").is_transient_lookup());
    }
}
