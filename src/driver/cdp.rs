//! Driver binding over the CDP layer
//!
//! Element handles are `data-kuma-ref` attributes written into the live DOM by the lookup
//! script (see [`super::script`]). A handle whose attribute no longer exists in the current
//! document reports [`Error::StaleElement`].

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::locator::Locator;
use super::script;
use super::traits::{Driver, Element, Rect, SessionProvider};
use crate::cdp::traits::{CdpBrowser, CdpClient, EvaluationResult, TargetInfo};
use crate::{Error, Result};

/// Outcome reported by every generated script
enum ScriptOutcome {
    Ok(Value),
    Stale,
}

/// Protocol errors Chrome reports while the page's execution context is being replaced
const CONTEXT_TEARDOWN: [&str; 2] = ["Execution context was destroyed", "Cannot find context with specified id"];

fn is_context_teardown(message: &str) -> bool {
    CONTEXT_TEARDOWN.iter().any(|fragment| message.contains(fragment))
}

/// Run a generated script and decode its `{"ok": ..}` / `{"stale": true}` envelope
///
/// A script that lands while a navigation tears the document down reports `Stale`.
async fn run_script(client: &Arc<dyn CdpClient>, script: &str) -> Result<ScriptOutcome> {
    let result = match client.evaluate(script, false).await {
        Err(Error::Cdp(message)) if is_context_teardown(&message) => {
            debug!("Script hit a navigation: {}", message);
            return Ok(ScriptOutcome::Stale);
        }
        result => result?,
    };
    let raw = match result {
        EvaluationResult::String(raw) => raw,
        other => {
            return Err(Error::script_execution_failed(format!(
                "Unexpected script result: {:?}",
                other
            )))
        }
    };

    let envelope: Value = serde_json::from_str(&raw)?;
    if envelope.get("stale").and_then(Value::as_bool).unwrap_or(false) {
        return Ok(ScriptOutcome::Stale);
    }
    Ok(ScriptOutcome::Ok(envelope.get("ok").cloned().unwrap_or(Value::Null)))
}

/// Tag and collect elements matching `locator`, optionally below `scope`
async fn find_with(
    client: &Arc<dyn CdpClient>,
    locator: &Locator,
    scope: Option<&str>,
) -> Result<Vec<Arc<dyn Element>>> {
    let prefix = Uuid::new_v4().simple().to_string();
    let script = script::find_elements(locator, scope, &prefix);

    let refs = match run_script(client, &script).await? {
        ScriptOutcome::Stale => {
            return Err(Error::stale_element(scope.unwrap_or("document").to_string()))
        }
        ScriptOutcome::Ok(value) => value,
    };

    let refs: Vec<String> = serde_json::from_value(refs)?;
    debug!("{} matched {} element(s)", locator, refs.len());

    Ok(refs
        .into_iter()
        .map(|reference| Arc::new(CdpElement::new(reference, Arc::clone(client))) as Arc<dyn Element>)
        .collect())
}

/// Driver over one CDP page target
#[derive(Debug)]
pub struct CdpDriver {
    /// Target ID
    id: String,
    client: Arc<dyn CdpClient>,
    navigation_timeout_ms: u64,
}

impl CdpDriver {
    pub fn new<S: Into<String>>(id: S, client: Arc<dyn CdpClient>, navigation_timeout_ms: u64) -> Self {
        Self {
            id: id.into(),
            client,
            navigation_timeout_ms,
        }
    }

    async fn evaluate_string(&self, expression: &str) -> Result<String> {
        match self.client.evaluate(expression, false).await? {
            EvaluationResult::String(s) => Ok(s),
            other => Err(Error::script_execution_failed(format!(
                "{} returned {:?}",
                expression, other
            ))),
        }
    }
}

#[async_trait]
impl Driver for CdpDriver {
    fn id(&self) -> &str {
        &self.id
    }

    #[instrument(skip(self), fields(session = %self.id))]
    async fn navigate(&self, url: &str) -> Result<()> {
        let result = self.client.navigate(url, self.navigation_timeout_ms).await?;
        if !result.is_loaded {
            warn!("{} still loading after {}ms", url, self.navigation_timeout_ms);
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        self.evaluate_string("window.location.href").await
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<Arc<dyn Element>>> {
        find_with(&self.client, locator, None).await
    }

    async fn execute(&self, script: &str) -> Result<EvaluationResult> {
        self.client.evaluate(script, true).await
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.client.screenshot().await
    }

    async fn page_source(&self) -> Result<String> {
        self.evaluate_string("document.documentElement.outerHTML").await
    }

    async fn close(&self) -> Result<()> {
        self.client.connection().close().await
    }
}

/// Element handle resolved through its `data-kuma-ref` attribute
#[derive(Debug)]
pub struct CdpElement {
    reference: String,
    client: Arc<dyn CdpClient>,
}

impl CdpElement {
    fn new(reference: String, client: Arc<dyn CdpClient>) -> Self {
        Self { reference, client }
    }

    /// Run `body` against this element
    async fn run(&self, body: &str) -> Result<Value> {
        match run_script(&self.client, &script::on_element(&self.reference, body)).await? {
            ScriptOutcome::Ok(value) => Ok(value),
            ScriptOutcome::Stale => Err(Error::stale_element(self.reference.clone())),
        }
    }

    async fn run_bool(&self, body: &str) -> Result<bool> {
        Ok(self.run(body).await?.as_bool().unwrap_or(false))
    }

    async fn run_string(&self, body: &str) -> Result<String> {
        Ok(match self.run(body).await? {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }

    async fn ensure_interactable(&self) -> Result<()> {
        if !self.run_bool(script::IS_DISPLAYED).await? {
            return Err(Error::not_interactable(format!(
                "element {} is not displayed",
                self.reference
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Element for CdpElement {
    fn id(&self) -> &str {
        &self.reference
    }

    async fn tag_name(&self) -> Result<String> {
        self.run_string(script::TAG_NAME).await
    }

    async fn text(&self) -> Result<String> {
        self.run_string(script::TEXT).await
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        Ok(self.run(&script::attribute(name)).await?.as_str().map(str::to_string))
    }

    async fn value(&self) -> Result<String> {
        self.run_string(script::VALUE).await
    }

    async fn is_displayed(&self) -> Result<bool> {
        self.run_bool(script::IS_DISPLAYED).await
    }

    async fn is_selected(&self) -> Result<bool> {
        self.run_bool(script::IS_SELECTED).await
    }

    async fn rect(&self) -> Result<Rect> {
        let value = self.run(script::RECT).await?;
        let coord = |key: &str| value.get(key).and_then(Value::as_f64).unwrap_or(0.0);
        Ok(Rect::new(coord("x"), coord("y"), coord("width"), coord("height")))
    }

    async fn click(&self) -> Result<()> {
        self.ensure_interactable().await?;

        let point = self.run(script::CLICK_POINT).await?;
        let x = point.get("x").and_then(Value::as_f64).unwrap_or(0.0);
        let y = point.get("y").and_then(Value::as_f64).unwrap_or(0.0);

        for event in ["mousePressed", "mouseReleased"] {
            self.client
                .call_method(
                    "Input.dispatchMouseEvent",
                    json!({
                        "type": event,
                        "x": x,
                        "y": y,
                        "button": "left",
                        "clickCount": 1,
                    }),
                )
                .await?;
        }

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.ensure_interactable().await?;
        self.run(script::CLEAR).await?;
        Ok(())
    }

    async fn send_keys(&self, text: &str) -> Result<()> {
        self.ensure_interactable().await?;
        self.focus().await?;
        self.client
            .call_method("Input.insertText", json!({ "text": text }))
            .await?;
        Ok(())
    }

    async fn submit(&self) -> Result<()> {
        if !self.run_bool(script::SUBMIT).await? {
            return Err(Error::element_not_found(format!(
                "form enclosing element {}",
                self.reference
            )));
        }
        Ok(())
    }

    async fn focus(&self) -> Result<()> {
        self.run(script::FOCUS).await?;
        Ok(())
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<Arc<dyn Element>>> {
        find_with(&self.client, locator, Some(&self.reference)).await
    }
}

/// Session provider opening one page target per session on a running Chrome
#[derive(Debug)]
pub struct CdpSessionProvider {
    browser: Arc<dyn CdpBrowser>,
    viewport: (u32, u32),
    navigation_timeout_ms: u64,
    /// Open targets; a session's driver ID is its target ID
    targets: RwLock<HashSet<String>>,
}

impl CdpSessionProvider {
    pub fn new(browser: Arc<dyn CdpBrowser>, viewport: (u32, u32), navigation_timeout_ms: u64) -> Self {
        Self {
            browser,
            viewport,
            navigation_timeout_ms,
            targets: RwLock::new(HashSet::new()),
        }
    }

    /// Sessions currently open
    pub async fn open_count(&self) -> usize {
        self.targets.read().await.len()
    }

    /// Connect to `target` and apply the viewport
    async fn attach(&self, target: &TargetInfo) -> Result<Arc<dyn CdpClient>> {
        let client = self.browser.create_client(&target.ws_url).await?;

        let (width, height) = self.viewport;
        client
            .call_method(
                "Emulation.setDeviceMetricsOverride",
                json!({
                    "width": width,
                    "height": height,
                    "deviceScaleFactor": 1,
                    "mobile": false,
                }),
            )
            .await?;
        Ok(client)
    }
}

#[async_trait]
impl SessionProvider for CdpSessionProvider {
    async fn open_session(&self) -> Result<Arc<dyn Driver>> {
        let target = self.browser.create_target("about:blank").await?;
        let client = match self.attach(&target).await {
            Ok(client) => client,
            Err(e) => {
                if let Err(close_err) = self.browser.close_target(&target.target_id).await {
                    warn!("Closing target {} after failed setup failed: {}", target.target_id, close_err);
                }
                return Err(e);
            }
        };

        info!(
            "Opened session on target {} ({}x{})",
            target.target_id, self.viewport.0, self.viewport.1
        );
        self.targets.write().await.insert(target.target_id.clone());

        Ok(Arc::new(CdpDriver::new(
            target.target_id,
            client,
            self.navigation_timeout_ms,
        )))
    }

    async fn close_session(&self, driver: Arc<dyn Driver>) -> Result<()> {
        if let Err(e) = driver.close().await {
            warn!("Closing connection of session {} failed: {}", driver.id(), e);
        }

        if !self.targets.write().await.remove(driver.id()) {
            return Err(Error::internal(format!("Unknown session: {}", driver.id())));
        }
        self.browser.close_target(driver.id()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdp::mock::{MockCdpBrowser, MockCdpConnection};
    use crate::cdp::CdpClientImpl;
    use crate::pages::PageBase;
    use crate::wait::Wait;
    use std::time::Duration;

    const CONTEXT_DESTROYED: &str = "Execution context was destroyed.";

    fn page_over(driver: CdpDriver) -> PageBase {
        PageBase::new(Arc::new(driver), "http://localhost:8000")
            .with_wait(Wait::new(Duration::from_millis(500), Duration::from_millis(5)))
    }

    fn driver_over(connection: Arc<MockCdpConnection>) -> CdpDriver {
        CdpDriver::new("T1", Arc::new(CdpClientImpl::new(connection)), 1000)
    }

    #[tokio::test]
    async fn test_find_elements_returns_tagged_refs() {
        let connection = Arc::new(MockCdpConnection::new());
        connection.respond_to_script("querySelectorAll", json!(r#"{"ok":["a-0","a-1"]}"#));
        let driver = driver_over(connection);

        let found = driver.find_elements(&Locator::css(".result-list-item")).await.unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id(), "a-0");
    }

    #[tokio::test]
    async fn test_find_element_none_is_not_found() {
        let connection = Arc::new(MockCdpConnection::new());
        connection.respond_to_script("querySelectorAll", json!(r#"{"ok":[]}"#));
        let driver = driver_over(connection);

        let err = driver.find_element(&Locator::id("main-q")).await.unwrap_err();
        assert!(matches!(err, Error::ElementNotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_ref_is_stale() {
        let connection = Arc::new(MockCdpConnection::new());
        connection.respond_to_script("querySelectorAll", json!(r#"{"ok":["r-0"]}"#));
        connection.respond_to_script("innerText", json!(r#"{"stale":true}"#));
        let driver = driver_over(connection);

        let element = driver.find_element(&Locator::id("main-q")).await.unwrap();
        let err = element.text().await.unwrap_err();
        assert!(matches!(err, Error::StaleElement(r) if r == "r-0"));
    }

    #[tokio::test]
    async fn test_click_dispatches_mouse_events() {
        let connection = Arc::new(MockCdpConnection::new());
        connection.respond_to_script("querySelectorAll", json!(r#"{"ok":["r-0"]}"#));
        connection.respond_to_script("getComputedStyle", json!(r#"{"ok":true}"#));
        connection.respond_to_script("scrollIntoView", json!(r#"{"ok":{"x":10,"y":20}}"#));
        let driver = driver_over(connection.clone());

        let element = driver.find_element(&Locator::css("button")).await.unwrap();
        element.click().await.unwrap();

        let mouse: Vec<_> = connection
            .sent_commands()
            .into_iter()
            .filter(|(m, _)| m == "Input.dispatchMouseEvent")
            .collect();
        assert_eq!(mouse.len(), 2);
        assert_eq!(mouse[0].1["type"], "mousePressed");
        assert_eq!(mouse[1].1["x"], 10.0);
    }

    #[tokio::test]
    async fn test_hidden_element_is_not_interactable() {
        let connection = Arc::new(MockCdpConnection::new());
        connection.respond_to_script("querySelectorAll", json!(r#"{"ok":["r-0"]}"#));
        connection.respond_to_script("getComputedStyle", json!(r#"{"ok":false}"#));
        let driver = driver_over(connection);

        let element = driver.find_element(&Locator::css(".login-link")).await.unwrap();
        let err = element.click().await.unwrap_err();
        assert!(matches!(err, Error::NotInteractable(_)));
    }

    #[tokio::test]
    async fn test_rect_reads_bounding_box() {
        let connection = Arc::new(MockCdpConnection::new());
        connection.respond_to_script("querySelectorAll", json!(r#"{"ok":["r-0"]}"#));
        connection.respond_to_script(
            "getBoundingClientRect",
            json!(r#"{"ok":{"x":1,"y":2,"width":150,"height":30}}"#),
        );
        let driver = driver_over(connection);

        let element = driver.find_element(&Locator::id("main-q")).await.unwrap();
        assert_eq!(element.rect().await.unwrap(), Rect::new(1.0, 2.0, 150.0, 30.0));
    }

    #[tokio::test]
    async fn test_session_provider_lifecycle() {
        let browser = Arc::new(MockCdpBrowser::new());
        let provider = CdpSessionProvider::new(browser.clone(), (1280, 1024), 1000);

        let driver = provider.open_session().await.unwrap();
        assert_eq!(provider.open_count().await, 1);

        let sent = browser.connections()[0].sent_methods();
        assert!(sent.contains(&"Emulation.setDeviceMetricsOverride".to_string()));

        let id = driver.id().to_string();
        provider.close_session(driver).await.unwrap();
        assert_eq!(provider.open_count().await, 0);
        assert_eq!(browser.closed_targets(), vec![id]);
    }

    #[tokio::test]
    async fn test_context_teardown_counts_as_replaced_document() {
        let connection = Arc::new(MockCdpConnection::new());
        connection.respond_to_script("querySelectorAll", json!(r#"{"ok":["r-0"]}"#));
        connection.respond_to_script("tagName", json!(r#"{"stale":true}"#));
        let page = page_over(driver_over(connection.clone()));

        let field = page.find_element(&Locator::id("search-q")).await.unwrap();
        connection.fail_next("Runtime.evaluate", -32000, CONTEXT_DESTROYED);

        page.wait_for_staleness(&field).await.unwrap();
    }

    #[tokio::test]
    async fn test_lookup_during_navigation_is_retried() {
        let connection = Arc::new(MockCdpConnection::new());
        connection.respond_to_script("querySelectorAll", json!(r#"{"ok":["r-0"]}"#));
        connection.respond_to_script("getComputedStyle", json!(r#"{"ok":true}"#));
        connection.fail_next("Runtime.evaluate", -32000, CONTEXT_DESTROYED);
        connection.fail_next("Runtime.evaluate", -32000, "Cannot find context with specified id");
        let page = page_over(driver_over(connection.clone()));

        let element = page.wait_for_displayed(&Locator::id("search-q")).await.unwrap();

        assert_eq!(element.id(), "r-0");
        let evaluations = connection
            .sent_methods()
            .into_iter()
            .filter(|m| m == "Runtime.evaluate")
            .count();
        assert_eq!(evaluations, 4);
    }

    #[tokio::test]
    async fn test_other_protocol_errors_still_fail() {
        let connection = Arc::new(MockCdpConnection::new());
        connection.fail_next("Runtime.evaluate", -32601, "'Runtime.evaluate' wasn't found");
        let driver = driver_over(connection);

        let err = driver.find_elements(&Locator::css("a")).await.unwrap_err();
        assert!(matches!(err, Error::Cdp(_)));
    }

    #[tokio::test]
    async fn test_failed_setup_closes_target() {
        let browser = Arc::new(MockCdpBrowser::new());
        browser.refuse_clients("handshake refused");
        let provider = CdpSessionProvider::new(browser.clone(), (1280, 1024), 1000);

        let err = provider.open_session().await.unwrap_err();

        assert!(matches!(err, Error::WebSocket(ref m) if m == "handshake refused"));
        assert_eq!(browser.closed_targets().len(), 1);
        assert_eq!(provider.open_count().await, 0);
    }
}
