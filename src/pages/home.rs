use tracing::instrument;

use super::base::{Page, PageBase};
use super::header::Header;
use super::search::{search_with_field, SearchPage};
use crate::driver::Locator;
use crate::Result;

const SEARCH_FORM: &str = "#home-search-form";
const SEARCH_FIELD: &str = "#home-q";

/// Locale landing page with the large search box
#[derive(Debug, Clone)]
pub struct HomePage {
    base: PageBase,
}

impl HomePage {
    pub fn new(base: PageBase) -> Self {
        Self { base }
    }

    #[instrument(skip(self))]
    pub async fn search_for_term(&self, term: &str) -> Result<SearchPage> {
        let field = self.base.find_element(&Locator::css(SEARCH_FIELD)).await?;
        search_with_field(&self.base, field, term).await
    }

    pub async fn header(&self) -> Result<Header> {
        Header::locate(&self.base).await
    }
}

impl Page for HomePage {
    fn base(&self) -> &PageBase {
        &self.base
    }

    fn path(&self) -> String {
        format!("/{}/", self.base.locale())
    }

    fn loaded_locator(&self) -> Locator {
        Locator::css(SEARCH_FORM)
    }
}
