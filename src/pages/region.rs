//! Scoped sub-areas of a page

use std::sync::Arc;

use super::base::PageBase;
use crate::driver::{Element, Locator};
use crate::Result;

/// Part of a page rooted at one element; lookups are scoped to the root
#[derive(Debug, Clone)]
pub struct Region {
    page: PageBase,
    root: Arc<dyn Element>,
}

impl Region {
    /// Wait for `root` to be displayed and scope a region to it
    pub async fn locate(page: &PageBase, root: &Locator) -> Result<Self> {
        let root = page.wait_for_displayed(root).await?;
        Ok(Self {
            page: page.clone(),
            root,
        })
    }

    pub fn page(&self) -> &PageBase {
        &self.page
    }

    pub fn root(&self) -> &Arc<dyn Element> {
        &self.root
    }

    pub async fn find_element(&self, locator: &Locator) -> Result<Arc<dyn Element>> {
        self.root.find_element(locator).await
    }

    pub async fn find_elements(&self, locator: &Locator) -> Result<Vec<Arc<dyn Element>>> {
        self.root.find_elements(locator).await
    }

    pub async fn is_element_present(&self, locator: &Locator) -> Result<bool> {
        Ok(!self.root.find_elements(locator).await?.is_empty())
    }

    /// Absence or a replaced root counts as not displayed
    pub async fn is_element_displayed(&self, locator: &Locator) -> Result<bool> {
        let found = match self.root.find_elements(locator).await {
            Ok(found) => found,
            Err(e) if e.is_transient_lookup() => return Ok(false),
            Err(e) => return Err(e),
        };
        match found.first() {
            Some(element) => match element.is_displayed().await {
                Ok(displayed) => Ok(displayed),
                Err(e) if e.is_transient_lookup() => Ok(false),
                Err(e) => Err(e),
            },
            None => Ok(false),
        }
    }
}
