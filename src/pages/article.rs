use tracing::{debug, instrument, warn};

use super::base::{Page, PageBase};
use super::header::Header;
use crate::driver::script::js_string;
use crate::driver::Locator;
use crate::Result;

/// Article reserved for UI tests
pub const DEFAULT_ARTICLE_SLUG: &str = "User:anonymous:uitest";

const ARTICLE_BODY: &str = "#wikiArticle";
const SURVEY: &str = "#task-completion";
const SURVEY_CLOSE: &str = "#task-completion .task-completion-close";

/// localStorage key that keeps the task-completion survey from sampling the visitor
const SURVEY_STORAGE_KEY: &str = "taskTracker";

/// Wiki document page
#[derive(Debug, Clone)]
pub struct ArticlePage {
    base: PageBase,
    slug: String,
}

impl ArticlePage {
    pub fn new(base: PageBase) -> Self {
        Self::with_slug(base, DEFAULT_ARTICLE_SLUG)
    }

    pub fn with_slug<S: Into<String>>(base: PageBase, slug: S) -> Self {
        Self {
            base,
            slug: slug.into(),
        }
    }

    /// Keep the task-completion survey out of the way; absence of the survey is fine
    #[instrument(skip(self))]
    pub async fn disable_survey_popup(&self) -> Result<()> {
        let script = format!(
            "try {{ localStorage.setItem({}, JSON.stringify({{ disabled: true }})); return true; }} catch (e) {{ return false; }}",
            js_string(SURVEY_STORAGE_KEY)
        );
        if let Err(e) = self.base.driver().execute(&format!("(() => {{ {} }})()", script)).await {
            warn!("Could not store survey opt-out: {}", e);
        }

        if !self.base.is_element_displayed(&Locator::css(SURVEY)).await? {
            debug!("Survey not displayed");
            return Ok(());
        }

        let close = match self.base.find_element(&Locator::css(SURVEY_CLOSE)).await {
            Ok(close) => close,
            Err(e) if e.is_transient_lookup() => {
                warn!("Survey displayed without a close control");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match close.click().await {
            Ok(()) => Ok(()),
            Err(e) if e.is_transient_lookup() || matches!(e, crate::Error::NotInteractable(_)) => {
                warn!("Survey close control went away: {}", e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn header(&self) -> Result<Header> {
        Header::locate(&self.base).await
    }
}

impl Page for ArticlePage {
    fn base(&self) -> &PageBase {
        &self.base
    }

    fn path(&self) -> String {
        format!("/{}/docs/{}", self.base.locale(), self.slug)
    }

    fn loaded_locator(&self) -> Locator {
        Locator::css(ARTICLE_BODY)
    }
}
