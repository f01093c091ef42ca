//! Site header shared by every page

use tracing::{debug, instrument};

use super::base::PageBase;
use super::region::Region;
use super::search::{search_with_field, SearchPage};
use crate::driver::Locator;
use crate::Result;

const ROOT: &str = "#main-header";
const SEARCH_FIELD: &str = "#main-q";
const SIGNIN_LINK: &str = ".login-link";

#[derive(Debug, Clone)]
pub struct Header {
    region: Region,
}

impl Header {
    pub(crate) async fn locate(page: &PageBase) -> Result<Self> {
        Ok(Self {
            region: Region::locate(page, &Locator::css(ROOT)).await?,
        })
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Type `term` into the header search field and submit it
    #[instrument(skip(self))]
    pub async fn search_for_term(&self, term: &str) -> Result<SearchPage> {
        let field = self.region.find_element(&Locator::css(SEARCH_FIELD)).await?;
        search_with_field(self.region.page(), field, term).await
    }

    /// Focus the search field and wait for its expansion to finish
    #[instrument(skip(self))]
    pub async fn search_field_focus(&self) -> Result<()> {
        let field = self.region.find_element(&Locator::css(SEARCH_FIELD)).await?;
        field.click().await?;
        field.focus().await?;

        let width = self
            .region
            .page()
            .wait()
            .until_settled("search field width", || async {
                Ok(Some(field.rect().await?.width))
            })
            .await?;
        debug!("Search field settled at width {}", width);
        Ok(())
    }

    pub async fn search_field_width(&self) -> Result<f64> {
        let field = self.region.find_element(&Locator::css(SEARCH_FIELD)).await?;
        Ok(field.rect().await?.width)
    }

    pub async fn is_signin_displayed(&self) -> Result<bool> {
        self.region.is_element_displayed(&Locator::css(SIGNIN_LINK)).await
    }
}
