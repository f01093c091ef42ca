//! Driver capability traits
//!
//! The page objects only ever talk to these traits; any browser binding that can provide them
//! can run the suite.

use async_trait::async_trait;
use std::sync::Arc;

use super::locator::Locator;
use crate::cdp::traits::EvaluationResult;
use crate::{Error, Result};

/// Rendered box of an element in page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// One browser-controlled tab
///
/// Supplied by a [`SessionProvider`]; page objects drive it but never create or close it.
#[async_trait]
pub trait Driver: Send + Sync + std::fmt::Debug {
    /// Session ID
    fn id(&self) -> &str;

    /// Navigate the tab to `url`
    async fn navigate(&self, url: &str) -> Result<()>;

    /// URL of the current document
    async fn current_url(&self) -> Result<String>;

    /// All elements matching `locator` in the current document, in document order
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<Arc<dyn Element>>>;

    /// First element matching `locator`
    async fn find_element(&self, locator: &Locator) -> Result<Arc<dyn Element>> {
        self.find_elements(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::element_not_found(locator.to_string()))
    }

    /// Run a script in the page and return its completion value
    async fn execute(&self, script: &str) -> Result<EvaluationResult>;

    /// PNG screenshot of the viewport
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Serialized DOM of the current document
    async fn page_source(&self) -> Result<String>;

    /// Release the session
    async fn close(&self) -> Result<()>;
}

/// Reference to one live DOM element
///
/// Every read goes to the live document. Once that document has been replaced, every
/// operation fails with [`Error::StaleElement`].
#[async_trait]
pub trait Element: Send + Sync + std::fmt::Debug {
    /// Element reference ID
    fn id(&self) -> &str;

    async fn tag_name(&self) -> Result<String>;

    /// Rendered text of the element and its descendants
    async fn text(&self) -> Result<String>;

    async fn attribute(&self, name: &str) -> Result<Option<String>>;

    /// Current value of a form control
    async fn value(&self) -> Result<String>;

    async fn is_displayed(&self) -> Result<bool>;

    /// Checked state of checkboxes/radios, selected state of options
    async fn is_selected(&self) -> Result<bool>;

    async fn rect(&self) -> Result<Rect>;

    async fn click(&self) -> Result<()>;

    async fn clear(&self) -> Result<()>;

    async fn send_keys(&self, text: &str) -> Result<()>;

    /// Submit the form this element belongs to
    async fn submit(&self) -> Result<()>;

    async fn focus(&self) -> Result<()>;

    /// Descendants matching `locator`, in document order
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<Arc<dyn Element>>>;

    /// First descendant matching `locator`
    async fn find_element(&self, locator: &Locator) -> Result<Arc<dyn Element>> {
        self.find_elements(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::element_not_found(locator.to_string()))
    }
}

/// Creates and disposes of browser sessions, one per scenario attempt
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn open_session(&self) -> Result<Arc<dyn Driver>>;

    async fn close_session(&self, driver: Arc<dyn Driver>) -> Result<()>;
}
