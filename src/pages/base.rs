//! Base page contract

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::driver::{Driver, Element, Locator};
use crate::wait::Wait;
use crate::{Error, Result};

/// Locale used when none is configured
pub const DEFAULT_LOCALE: &str = "en-US";

/// Session handle plus the addressing and wait settings every page needs
#[derive(Debug, Clone)]
pub struct PageBase {
    driver: Arc<dyn Driver>,
    base_url: String,
    locale: String,
    wait: Wait,
}

impl PageBase {
    pub fn new<S: Into<String>>(driver: Arc<dyn Driver>, base_url: S) -> Self {
        Self {
            driver,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            wait: Wait::default(),
        }
    }

    pub fn from_config(driver: Arc<dyn Driver>, config: &Config) -> Self {
        Self::new(driver, config.base_url.clone())
            .with_locale(config.locale.clone())
            .with_wait(Wait::from_config(config))
    }

    pub fn with_locale<S: Into<String>>(mut self, locale: S) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_wait(mut self, wait: Wait) -> Self {
        self.wait = wait;
        self
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn wait(&self) -> &Wait {
        &self.wait
    }

    /// Absolute URL of `path` on this deployment
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub async fn find_element(&self, locator: &Locator) -> Result<Arc<dyn Element>> {
        self.driver.find_element(locator).await
    }

    pub async fn find_elements(&self, locator: &Locator) -> Result<Vec<Arc<dyn Element>>> {
        self.driver.find_elements(locator).await
    }

    /// Whether `locator` matches anything in the current document
    pub async fn is_element_present(&self, locator: &Locator) -> Result<bool> {
        Ok(!self.driver.find_elements(locator).await?.is_empty())
    }

    /// Whether the first match of `locator` is displayed; absence counts as not displayed
    pub async fn is_element_displayed(&self, locator: &Locator) -> Result<bool> {
        let found = self.driver.find_elements(locator).await?;
        match found.first() {
            Some(element) => match element.is_displayed().await {
                Ok(displayed) => Ok(displayed),
                Err(e) if e.is_transient_lookup() => Ok(false),
                Err(e) => Err(e),
            },
            None => Ok(false),
        }
    }

    /// Poll until `locator` resolves to a displayed element
    pub async fn wait_for_displayed(&self, locator: &Locator) -> Result<Arc<dyn Element>> {
        let what = format!("{} to be displayed", locator);
        self.wait
            .until(&what, || async {
                let element = self.driver.find_element(locator).await?;
                Ok(element.is_displayed().await?.then_some(element))
            })
            .await
    }

    /// Poll until `element` no longer belongs to the current document
    pub async fn wait_for_staleness(&self, element: &Arc<dyn Element>) -> Result<()> {
        let what = format!("element {} to be replaced", element.id());
        self.wait
            .until(&what, || async {
                match element.tag_name().await {
                    Err(Error::StaleElement(_)) => Ok(Some(())),
                    Ok(_) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await
    }
}

/// A page reachable by URL with a readiness locator
#[async_trait]
pub trait Page: Send + Sync + Sized {
    fn base(&self) -> &PageBase;

    /// Path below the base URL, including the locale prefix
    fn path(&self) -> String;

    /// Element whose display signals the page finished loading
    fn loaded_locator(&self) -> Locator;

    fn url(&self) -> String {
        self.base().url_for(&self.path())
    }

    async fn wait_for_page_to_load(&self) -> Result<()> {
        self.base().wait_for_displayed(&self.loaded_locator()).await?;
        debug!("{} ready", self.path());
        Ok(())
    }

    /// Navigate to [`Page::url`] and wait for the readiness locator
    async fn open(self) -> Result<Self> {
        let url = self.url();
        info!("Opening {}", url);
        self.base().driver().navigate(&url).await?;
        self.wait_for_page_to_load().await?;
        Ok(self)
    }
}
