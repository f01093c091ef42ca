//! In-memory driver for tests
//!
//! A [`MockSite`] renders a [`MockNode`] tree for each requested URL. Navigation, link clicks
//! and form submissions all go back through the site, replace the document and bump its
//! generation, which turns every element handle of the previous document stale.

mod dom;
mod selector;

pub use dom::{Behavior, MockNode};
pub use selector::Selector;

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::locator::Locator;
use super::traits::{Driver, Element, Rect, SessionProvider};
use crate::cdp::traits::EvaluationResult;
use crate::{Error, Result};
use dom::Document;

/// 8-byte PNG signature; enough for artifact writers
const MOCK_PNG: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Parsed request handed to a [`MockSite`]
#[derive(Debug, Clone, PartialEq)]
pub struct MockRequest {
    pub url: String,
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl MockRequest {
    pub fn parse(url: &str) -> Self {
        let after_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
        let path_and_query = match after_scheme.find('/') {
            Some(index) if url.contains("://") => &after_scheme[index..],
            Some(_) => after_scheme,
            None if url.contains("://") => "/",
            None => after_scheme,
        };
        let path_and_query = path_and_query.split('#').next().unwrap_or("");

        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, query),
            None => (path_and_query, ""),
        };

        let query = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_component(name), decode_component(value))
            })
            .collect();

        Self {
            url: url.to_string(),
            path: path.to_string(),
            query,
        }
    }

    /// First value of a query parameter
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// All values of a repeated query parameter
    pub fn params(&self, name: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

fn decode_component(s: &str) -> String {
    let spaced = s.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}

/// Serves documents to the mock driver
pub trait MockSite: Send + Sync {
    /// Document for `request`; `None` renders a not-found page
    fn render(&self, request: &MockRequest) -> Option<MockNode>;
}

impl<F> MockSite for F
where
    F: Fn(&MockRequest) -> Option<MockNode> + Send + Sync,
{
    fn render(&self, request: &MockRequest) -> Option<MockNode> {
        self(request)
    }
}

fn not_found_page() -> MockNode {
    MockNode::new("html").child(MockNode::new("body").child(MockNode::new("h1").text("Page Not Found")))
}

struct MockState {
    url: String,
    document: Document,
    history: Vec<String>,
    scripts: Vec<String>,
    closed: bool,
}

impl MockState {
    fn load(&mut self, site: &dyn MockSite, url: String) {
        let request = MockRequest::parse(&url);
        let root = site.render(&request).unwrap_or_else(not_found_page);
        debug!("Mock document loaded: {}", url);

        self.document = Document::new(root, self.document.generation + 1);
        self.history.push(url.clone());
        self.url = url;
    }

    /// Absolute URL for an href or form action relative to the current document
    fn resolve(&self, href: &str) -> String {
        if href.contains("://") {
            return href.to_string();
        }
        let origin = match self.url.split_once("://") {
            Some((scheme, rest)) => {
                let host = rest.split('/').next().unwrap_or("");
                format!("{}://{}", scheme, host)
            }
            None => String::new(),
        };
        if href.is_empty() {
            return self.url.split('?').next().unwrap_or("").to_string();
        }
        if href.starts_with('/') {
            format!("{}{}", origin, href)
        } else {
            let base = self.url.split('?').next().unwrap_or("");
            let dir = base.rsplit_once('/').map_or(base, |(dir, _)| dir);
            format!("{}/{}", dir, href)
        }
    }

    fn submit_form(&mut self, site: &dyn MockSite, form: usize) {
        let url = self.form_url(form);
        self.load(site, url);
    }

    /// Re-render the element `target_id` from the response to `form`'s submission
    ///
    /// The document and every handle into it stay live; only the address changes.
    fn render_in_place(&mut self, site: &dyn MockSite, form: usize, target_id: &str) {
        let url = self.form_url(form);
        let rendered = site.render(&MockRequest::parse(&url));
        let replacement = rendered.as_ref().and_then(|root| root.find_by_id(target_id));

        match (self.document.find_by_id(target_id), replacement) {
            (Some(target), Some(replacement)) => {
                debug!("Mock #{} re-rendered from {}", target_id, url);
                self.document.replace_subtree(target, replacement.clone());
                self.url = url;
            }
            _ => debug!("Mock #{} missing; nothing re-rendered for {}", target_id, url),
        }
    }

    /// GET submission URL of `form`
    fn form_url(&self, form: usize) -> String {
        let action = self.document.nodes[form]
            .attributes
            .get("action")
            .cloned()
            .unwrap_or_default();
        let target = self.resolve(&action);

        let query = self
            .document
            .form_data(form)
            .into_iter()
            .map(|(name, value)| format!("{}={}", urlencoding::encode(&name), urlencoding::encode(&value)))
            .collect::<Vec<_>>()
            .join("&");

        if query.is_empty() {
            target
        } else {
            format!("{}?{}", target, query)
        }
    }
}

/// Driver over an in-memory document served by a [`MockSite`]
pub struct MockDriver {
    id: String,
    site: Arc<dyn MockSite>,
    state: Arc<Mutex<MockState>>,
}

impl std::fmt::Debug for MockDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDriver").field("id", &self.id).finish()
    }
}

impl MockDriver {
    pub fn new(site: Arc<dyn MockSite>) -> Self {
        let blank = MockNode::new("html").child(MockNode::new("body"));
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            site,
            state: Arc::new(Mutex::new(MockState {
                url: "about:blank".to_string(),
                document: Document::new(blank, 0),
                history: Vec::new(),
                scripts: Vec::new(),
                closed: false,
            })),
        }
    }

    /// URLs loaded so far, including link clicks and form submissions
    pub async fn history(&self) -> Vec<String> {
        self.state.lock().await.history.clone()
    }

    /// Scripts passed to [`Driver::execute`]
    pub async fn executed_scripts(&self) -> Vec<String> {
        self.state.lock().await.scripts.clone()
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    fn element(&self, generation: u64, node: usize) -> Arc<dyn Element> {
        MockElement::handle(&self.id, generation, node, &self.site, &self.state)
    }
}

#[async_trait]
impl Driver for MockDriver {
    fn id(&self) -> &str {
        &self.id
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(Error::internal(format!("session {} is closed", self.id)));
        }
        state.load(self.site.as_ref(), url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state.lock().await.url.clone())
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<Arc<dyn Element>>> {
        let selector = selector_for(locator)?;
        let state = self.state.lock().await;
        let generation = state.document.generation;
        Ok(state
            .document
            .query(None, &selector)
            .into_iter()
            .map(|node| self.element(generation, node))
            .collect())
    }

    async fn execute(&self, script: &str) -> Result<EvaluationResult> {
        self.state.lock().await.scripts.push(script.to_string());
        Ok(EvaluationResult::Null)
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(MOCK_PNG.to_vec())
    }

    async fn page_source(&self) -> Result<String> {
        Ok(self.state.lock().await.document.to_html(0))
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().await.closed = true;
        Ok(())
    }
}

fn selector_for(locator: &Locator) -> Result<Selector> {
    let css = locator
        .as_css()
        .ok_or_else(|| Error::script_execution_failed(format!("{} is not supported by the mock driver", locator)))?;
    Selector::parse(&css)
}

/// Handle to one node of one mock document generation
pub struct MockElement {
    session: String,
    reference: String,
    generation: u64,
    node: usize,
    site: Arc<dyn MockSite>,
    state: Arc<Mutex<MockState>>,
}

impl std::fmt::Debug for MockElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockElement").field("reference", &self.reference).finish()
    }
}

impl MockElement {
    fn handle(
        session: &str,
        generation: u64,
        node: usize,
        site: &Arc<dyn MockSite>,
        state: &Arc<Mutex<MockState>>,
    ) -> Arc<dyn Element> {
        Arc::new(MockElement {
            session: session.to_string(),
            reference: format!("{}:{}:{}", session, generation, node),
            generation,
            node,
            site: Arc::clone(site),
            state: Arc::clone(state),
        })
    }

    /// Lock the state and fail if this handle's document has been replaced
    async fn live(&self) -> Result<tokio::sync::MutexGuard<'_, MockState>> {
        let state = self.state.lock().await;
        if state.document.generation != self.generation {
            return Err(Error::stale_element(self.reference.clone()));
        }
        Ok(state)
    }

    async fn read<R>(&self, f: impl FnOnce(&Document, usize) -> R + Send) -> Result<R> {
        let state = self.live().await?;
        Ok(f(&state.document, self.node))
    }

    fn ensure_displayed(&self, document: &Document) -> Result<()> {
        if !document.is_displayed(self.node) {
            return Err(Error::not_interactable(format!(
                "<{}> {} is not displayed",
                document.nodes[self.node].tag, self.reference
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Element for MockElement {
    fn id(&self) -> &str {
        &self.reference
    }

    async fn tag_name(&self) -> Result<String> {
        self.read(|doc, node| doc.nodes[node].tag.clone()).await
    }

    async fn text(&self) -> Result<String> {
        self.read(|doc, node| doc.text_of(node)).await
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        let name = name.to_string();
        self.read(move |doc, node| {
            let data = &doc.nodes[node];
            if name == "value" && matches!(data.tag.as_str(), "input" | "textarea" | "select") {
                return Some(data.value.clone());
            }
            data.attributes.get(&name).cloned()
        })
        .await
    }

    async fn value(&self) -> Result<String> {
        self.read(|doc, node| doc.nodes[node].value.clone()).await
    }

    async fn is_displayed(&self) -> Result<bool> {
        self.read(|doc, node| doc.is_displayed(node)).await
    }

    async fn is_selected(&self) -> Result<bool> {
        self.read(|doc, node| doc.nodes[node].selected).await
    }

    async fn rect(&self) -> Result<Rect> {
        self.read(|doc, node| doc.nodes[node].rect).await
    }

    async fn click(&self) -> Result<()> {
        let mut state = self.live().await?;
        self.ensure_displayed(&state.document)?;

        let site = self.site.as_ref();
        let data = state.document.nodes[self.node].clone();

        if data.is_checkable() {
            state.document.nodes[self.node].selected = !data.selected;
        }

        for behavior in &data.behaviors {
            match behavior {
                Behavior::Navigate(href) => {
                    let url = state.resolve(href);
                    state.load(site, url);
                    return Ok(());
                }
                Behavior::Dismiss { target_id } => {
                    if let Some(target) = state.document.find_by_id(target_id) {
                        state.document.nodes[target].displayed = false;
                    }
                }
                Behavior::AutoSubmit => {
                    if let Some(form) = state.document.enclosing_form(self.node) {
                        state.submit_form(site, form);
                        return Ok(());
                    }
                }
                Behavior::RenderInPlace { target_id } => {
                    if let Some(form) = state.document.enclosing_form(self.node) {
                        state.render_in_place(site, form, target_id);
                        return Ok(());
                    }
                }
                Behavior::ExpandOnFocus { .. } => {}
            }
        }

        if data.is_submit_control() {
            if let Some(form) = state.document.enclosing_form(self.node) {
                state.submit_form(site, form);
                return Ok(());
            }
        }

        if data.tag == "a" {
            if let Some(href) = data.attributes.get("href") {
                let url = state.resolve(href);
                state.load(site, url);
                return Ok(());
            }
        }

        apply_focus(&mut state, self.node);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.live().await?;
        self.ensure_displayed(&state.document)?;
        state.document.nodes[self.node].value.clear();
        Ok(())
    }

    async fn send_keys(&self, text: &str) -> Result<()> {
        let mut state = self.live().await?;
        self.ensure_displayed(&state.document)?;
        apply_focus(&mut state, self.node);
        state.document.nodes[self.node].value.push_str(text);
        Ok(())
    }

    async fn submit(&self) -> Result<()> {
        let mut state = self.live().await?;
        let form = state
            .document
            .enclosing_form(self.node)
            .ok_or_else(|| Error::element_not_found(format!("form enclosing {}", self.reference)))?;
        state.submit_form(self.site.as_ref(), form);
        Ok(())
    }

    async fn focus(&self) -> Result<()> {
        let mut state = self.live().await?;
        apply_focus(&mut state, self.node);
        Ok(())
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<Arc<dyn Element>>> {
        let selector = selector_for(locator)?;
        let state = self.live().await?;
        let generation = state.document.generation;
        Ok(state
            .document
            .query(Some(self.node), &selector)
            .into_iter()
            .map(|node| Self::handle(&self.session, generation, node, &self.site, &self.state))
            .collect())
    }
}

fn apply_focus(state: &mut MockState, node: usize) {
    let expand = state.document.nodes[node].behaviors.iter().find_map(|b| match b {
        Behavior::ExpandOnFocus { width } => Some(*width),
        _ => None,
    });
    if let Some(width) = expand {
        state.document.nodes[node].rect.width = width;
    }
}

/// Session provider handing out [`MockDriver`]s over one site
pub struct MockSessionProvider {
    site: Arc<dyn MockSite>,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl MockSessionProvider {
    pub fn new(site: Arc<dyn MockSite>) -> Self {
        Self {
            site,
            opened: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for MockSessionProvider {
    async fn open_session(&self) -> Result<Arc<dyn Driver>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockDriver::new(Arc::clone(&self.site))))
    }

    async fn close_session(&self, driver: Arc<dyn Driver>) -> Result<()> {
        driver.close().await?;
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
