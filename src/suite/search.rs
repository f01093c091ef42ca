//! Search scenarios

use futures::future::FutureExt;
use tracing::{debug, info};

use crate::check::{ensure, ensure_eq, ensure_ge, ensure_gt, ensure_not};
use crate::markers::{skip_if_not_maintenance_mode, Marker};
use crate::pages::{ArticlePage, Header, HomePage, Page, SearchPage};
use crate::runner::{Scenario, ScenarioContext};
use crate::urls::substitute_host;
use crate::{Error, Result};

pub const SEARCH_TERM: &str = "css";
pub const SEARCH_TERM_ZERO: &str = "skwiz";

/// Results rendered per page
pub const RESULTS_PER_PAGE: usize = 10;

const SMOKE_SEARCH: [Marker; 3] = [Marker::Smoke, Marker::Search, Marker::Nondestructive];

/// All search scenarios, in suite order
pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("test_search_homepage", |ctx| search_homepage(ctx).boxed()).with_markers(SMOKE_SEARCH),
        Scenario::new("test_search_home_header", |ctx| search_home_header(ctx).boxed())
            .with_markers([Marker::Flaky { reruns: 1 }])
            .with_markers(SMOKE_SEARCH),
        Scenario::new("test_search_article_header", |ctx| search_article_header(ctx).boxed())
            .with_markers([Marker::Flaky { reruns: 1 }])
            .with_markers(SMOKE_SEARCH),
        Scenario::new("test_search_layout", |ctx| search_layout(ctx).boxed()).with_markers(SMOKE_SEARCH),
        Scenario::new("test_search_zero_results", |ctx| search_zero_results(ctx).boxed()).with_markers(SMOKE_SEARCH),
        Scenario::new("test_search_filters", |ctx| search_filters(ctx).boxed()).with_markers(SMOKE_SEARCH),
        Scenario::new("test_search_in_mm", |ctx| search_in_mm(ctx).boxed())
            .with_markers([Marker::Nondestructive])
            .with_guard(skip_if_not_maintenance_mode),
    ]
}

/// Search results for `SEARCH_TERM` echo the term and fill one page
async fn check_term_results(search: &SearchPage) -> Result<()> {
    ensure_eq(
        "search_input_value",
        SEARCH_TERM.to_string(),
        search.search_input_value().await?,
    )?;
    ensure_eq(
        "search_result_items_length",
        RESULTS_PER_PAGE,
        search.search_result_items_length().await?,
    )
}

/// Focusing the header search field widens it; searching from it lands on the results
async fn check_header_search(header: &Header) -> Result<()> {
    let width_before = header.search_field_width().await?;
    header.search_field_focus().await?;
    let width_after = header.search_field_width().await?;
    debug!("Header search width {} -> {}", width_before, width_after);
    ensure_gt("search_field_width after focus", width_after, width_before)?;

    let search = header.search_for_term(SEARCH_TERM).await?;
    check_term_results(&search).await
}

pub async fn search_homepage(ctx: ScenarioContext) -> Result<()> {
    let page = HomePage::new(ctx.page_base()).open().await?;
    let search = page.search_for_term(SEARCH_TERM).await?;
    check_term_results(&search).await
}

pub async fn search_home_header(ctx: ScenarioContext) -> Result<()> {
    let page = HomePage::new(ctx.page_base()).open().await?;
    check_header_search(&page.header().await?).await
}

pub async fn search_article_header(ctx: ScenarioContext) -> Result<()> {
    let page = ArticlePage::new(ctx.page_base()).open().await?;
    page.disable_survey_popup().await?;
    check_header_search(&page.header().await?).await
}

pub async fn search_layout(ctx: ScenarioContext) -> Result<()> {
    let page = SearchPage::new(ctx.page_base(), Some(SEARCH_TERM)).open().await?;
    check_term_results(&page).await?;

    ensure("is_results_explanation_displayed", page.is_results_explanation_displayed().await?)?;
    ensure("is_main_column_present", page.is_main_column_present().await?)?;
    ensure("is_side_column_present", page.is_side_column_present().await?)?;
    ensure(
        "is_expected_stacking",
        page.column_container_region().await?.is_expected_stacking().await?,
    )?;

    // default web topics
    ensure("is_css_filter_checked", page.is_css_filter_checked().await?)?;
    ensure("is_html_filter_checked", page.is_html_filter_checked().await?)?;
    ensure("is_javascript_filter_checked", page.is_javascript_filter_checked().await?)?;

    ensure_eq(
        "search_result_items_length",
        RESULTS_PER_PAGE,
        page.search_result_items_length().await?,
    )?;
    ensure("is_next_button_displayed", page.is_next_button_displayed().await?)?;

    let config = ctx.config();
    let links = page.search_results_link_list().await?;
    info!("Checking {} result link(s)", links.len());
    for link in links {
        let href = link
            .attribute("href")
            .await?
            .ok_or_else(|| Error::element_not_found(format!("href of result link {}", link.id())))?;
        let url = substitute_host(&href, &config.link_host, &config.base_url);
        ctx.urls().assert_valid_url(&url, true).await?;
    }
    Ok(())
}

pub async fn search_zero_results(ctx: ScenarioContext) -> Result<()> {
    let page = SearchPage::new(ctx.page_base(), Some(SEARCH_TERM_ZERO)).open().await?;
    ensure_eq("search_result_items_length", 0, page.search_result_items_length().await?)
}

pub async fn search_filters(ctx: ScenarioContext) -> Result<()> {
    let page = SearchPage::new(ctx.page_base(), Some(SEARCH_TERM)).open().await?;
    let documents_found_initial = page.documents_found().await?;
    page.search_all_topics().await?;
    let documents_found_after = page.documents_found().await?;
    info!(
        "documents_found {} -> {} (index count {})",
        documents_found_initial,
        documents_found_after,
        ctx.status().search_count()
    );

    if ctx.status().has_full_search_index() {
        ensure_gt("documents_found after search_all_topics", documents_found_after, documents_found_initial)
    } else {
        // sample database
        ensure_ge("documents_found after search_all_topics", documents_found_after, documents_found_initial)
    }
}

pub async fn search_in_mm(ctx: ScenarioContext) -> Result<()> {
    let page = SearchPage::new(ctx.page_base(), Some(SEARCH_TERM_ZERO)).open().await?;
    ensure(
        "is_maintenance_mode_banner_displayed",
        page.is_maintenance_mode_banner_displayed().await?,
    )?;
    ensure_not("is_signin_displayed", page.header().await?.is_signin_displayed().await?)
}
