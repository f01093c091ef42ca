//! Search results page

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::base::{Page, PageBase};
use super::column_container::ColumnContainer;
use super::header::Header;
use crate::driver::{Element, Locator};
use crate::wait::Wait;
use crate::{Error, Result};

const SEARCH_FIELD: &str = "#search-q";
const RESULT_ITEMS: &str = ".result-list-item";
const RESULT_LINKS: &str = ".result-list-item h4 a";
const RESULTS_EXPLANATION: &str = ".search-results-explanation";
const MAIN_COLUMN: &str = ".column-main";
const SIDE_COLUMN: &str = ".column-strip";
const NEXT_BUTTON: &str = ".pagination .next";
const MAINTENANCE_BANNER: &str = "#maintenance-mode-notice";
const TOPIC_FILTERS: &str = ".search-filters input[name=\"topic\"]";
const FILTER_SUBMIT: &str = ".search-filters button[type=\"submit\"]";
const CSS_FILTER: &str = ".search-filters input[name=\"topic\"][value=\"css\"]";
const HTML_FILTER: &str = ".search-filters input[name=\"topic\"][value=\"html\"]";
const JAVASCRIPT_FILTER: &str = ".search-filters input[name=\"topic\"][value=\"js\"]";

/// How long a filter submit gets to start a navigation
const SUBMIT_NAVIGATION_GRACE: Duration = Duration::from_secs(2);

/// Search page for a term
#[derive(Debug, Clone)]
pub struct SearchPage {
    base: PageBase,
    term: Option<String>,
}

/// Fill `field` with `term`, submit its form and wait for the results page
pub(crate) async fn search_with_field(page: &PageBase, field: Arc<dyn Element>, term: &str) -> Result<SearchPage> {
    info!("Searching for {:?}", term);
    field.clear().await?;
    field.send_keys(term).await?;
    field.submit().await?;

    page.wait_for_staleness(&field).await?;
    let search = SearchPage::new(page.clone(), Some(term));
    search.wait_for_page_to_load().await?;
    Ok(search)
}

/// Leading integer of a results explanation such as "1,234 documents found for ..."
pub fn parse_documents_found(explanation: &str) -> Option<u64> {
    let digits: String = explanation
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(|c| *c != ',')
        .collect();
    digits.parse().ok()
}

impl SearchPage {
    pub fn new(base: PageBase, term: Option<&str>) -> Self {
        Self {
            base,
            term: term.map(str::to_string),
        }
    }

    pub fn term(&self) -> Option<&str> {
        self.term.as_deref()
    }

    pub async fn search_input_value(&self) -> Result<String> {
        self.base.find_element(&Locator::css(SEARCH_FIELD)).await?.value().await
    }

    pub async fn search_result_items_length(&self) -> Result<usize> {
        Ok(self.base.find_elements(&Locator::css(RESULT_ITEMS)).await?.len())
    }

    /// Total hits reported by the results explanation
    pub async fn documents_found(&self) -> Result<u64> {
        let text = self
            .base
            .find_element(&Locator::css(RESULTS_EXPLANATION))
            .await?
            .text()
            .await?;
        parse_documents_found(&text).ok_or_else(|| {
            Error::internal(format!("Results explanation carries no document count: {:?}", text))
        })
    }

    pub async fn is_results_explanation_displayed(&self) -> Result<bool> {
        self.base.is_element_displayed(&Locator::css(RESULTS_EXPLANATION)).await
    }

    pub async fn is_main_column_present(&self) -> Result<bool> {
        self.base.is_element_present(&Locator::css(MAIN_COLUMN)).await
    }

    pub async fn is_side_column_present(&self) -> Result<bool> {
        self.base.is_element_present(&Locator::css(SIDE_COLUMN)).await
    }

    pub async fn is_next_button_displayed(&self) -> Result<bool> {
        self.base.is_element_displayed(&Locator::css(NEXT_BUTTON)).await
    }

    pub async fn is_maintenance_mode_banner_displayed(&self) -> Result<bool> {
        self.base.is_element_displayed(&Locator::css(MAINTENANCE_BANNER)).await
    }

    pub async fn is_css_filter_checked(&self) -> Result<bool> {
        self.is_checked(CSS_FILTER).await
    }

    pub async fn is_html_filter_checked(&self) -> Result<bool> {
        self.is_checked(HTML_FILTER).await
    }

    pub async fn is_javascript_filter_checked(&self) -> Result<bool> {
        self.is_checked(JAVASCRIPT_FILTER).await
    }

    async fn is_checked(&self, selector: &str) -> Result<bool> {
        self.base.find_element(&Locator::css(selector)).await?.is_selected().await
    }

    /// Result links, looked up now
    pub async fn search_results_link_list(&self) -> Result<LinkList> {
        let links = self.base.find_elements(&Locator::css(RESULT_LINKS)).await?;
        Ok(LinkList {
            links: links.into_iter(),
        })
    }

    pub async fn column_container_region(&self) -> Result<ColumnContainer> {
        ColumnContainer::locate(&self.base).await
    }

    pub async fn header(&self) -> Result<Header> {
        Header::locate(&self.base).await
    }

    /// Check every topic filter and wait for the results to reflect it
    ///
    /// Clicking a filter may re-render the results in place or navigate, so the boxes are looked
    /// up again after every click.
    #[instrument(skip(self))]
    pub async fn search_all_topics(&self) -> Result<()> {
        let topics = Locator::css(TOPIC_FILTERS);
        let total = self.base.find_elements(&topics).await?.len();
        if total == 0 {
            return Err(Error::element_not_found(topics.to_string()));
        }

        let max_rounds = total * 3 + 1;
        let mut clicks = 0;
        let mut done = false;

        for _ in 0..max_rounds {
            self.wait_for_page_to_load().await?;

            let unchecked = match self.first_unchecked_topic().await {
                Ok(unchecked) => unchecked,
                Err(e) if e.is_transient_lookup() => continue,
                Err(e) => return Err(e),
            };

            let Some(checkbox) = unchecked else {
                done = true;
                break;
            };

            match checkbox.click().await {
                Ok(()) => clicks += 1,
                Err(e) if e.is_transient_lookup() => continue,
                Err(e) => return Err(e),
            }
        }

        if !done {
            return Err(Error::timeout(format!(
                "topic filters still unchecked after {} rounds",
                max_rounds
            )));
        }
        debug!("Checked {} topic filter(s)", clicks);

        if clicks > 0 {
            self.submit_filters().await?;
        }
        self.wait_for_filtered_results().await
    }

    async fn first_unchecked_topic(&self) -> Result<Option<Arc<dyn Element>>> {
        for checkbox in self.base.find_elements(&Locator::css(TOPIC_FILTERS)).await? {
            if !checkbox.is_selected().await? {
                return Ok(Some(checkbox));
            }
        }
        Ok(None)
    }

    async fn all_topics_checked(&self) -> Result<bool> {
        Ok(self.first_unchecked_topic().await?.is_none())
    }

    /// Click the filter form's submit control when the page has one
    async fn submit_filters(&self) -> Result<()> {
        let buttons = self.base.find_elements(&Locator::css(FILTER_SUBMIT)).await?;
        let Some(button) = buttons.first() else {
            return Ok(());
        };

        if !button.is_displayed().await? {
            return Ok(());
        }
        button.click().await?;

        // A navigating submit replaces the button; an in-place re-render keeps it.
        let grace = Wait::new(
            self.base.wait().timeout().min(SUBMIT_NAVIGATION_GRACE),
            self.base.wait().poll_interval(),
        );
        match self.base.clone().with_wait(grace).wait_for_staleness(button).await {
            Ok(()) => debug!("Filter submit navigated"),
            Err(Error::Timeout(_)) => debug!("Filter submit re-rendered in place"),
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Wait until the page is ready, every topic reads checked and two consecutive reads of
    /// (documents found, rendered results) agree
    async fn wait_for_filtered_results(&self) -> Result<()> {
        let (found, items) = self
            .base
            .wait()
            .until_settled("filtered search results", || async {
                self.wait_for_page_to_load().await?;
                if !self.all_topics_checked().await? {
                    return Ok(None);
                }
                Ok(Some((self.documents_found().await?, self.search_result_items_length().await?)))
            })
            .await?;
        info!("All topics: {} documents found, {} shown", found, items);
        Ok(())
    }
}

impl Page for SearchPage {
    fn base(&self) -> &PageBase {
        &self.base
    }

    fn path(&self) -> String {
        match &self.term {
            Some(term) => format!("/{}/search?q={}", self.base.locale(), urlencoding::encode(term)),
            None => format!("/{}/search", self.base.locale()),
        }
    }

    fn loaded_locator(&self) -> Locator {
        Locator::css(SEARCH_FIELD)
    }
}

/// Result links of one search page
///
/// Consumed by iteration; look the links up again for a second pass.
#[derive(Debug)]
pub struct LinkList {
    links: std::vec::IntoIter<Arc<dyn Element>>,
}

impl Iterator for LinkList {
    type Item = Arc<dyn Element>;

    fn next(&mut self) -> Option<Self::Item> {
        self.links.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.links.size_hint()
    }
}

impl ExactSizeIterator for LinkList {}
