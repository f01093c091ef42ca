use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::driver::{Behavior, Driver, MockDriver, MockNode, MockRequest, MockSite};
use crate::wait::Wait;
use crate::Error;

fn quick_wait() -> Wait {
    Wait::new(Duration::from_millis(100), Duration::from_millis(5))
}

fn header() -> MockNode {
    MockNode::new("header").id("main-header").children([
        MockNode::new("form")
            .id("nav-main-search")
            .attr("action", "/en-US/search")
            .child(
                MockNode::new("input")
                    .id("main-q")
                    .attr("name", "q")
                    .rect(900.0, 10.0, 150.0, 32.0)
                    .on(Behavior::ExpandOnFocus { width: 320.0 }),
            ),
        MockNode::new("a").class("login-link").attr("href", "/users/signin"),
    ])
}

fn layout(container_width: f64, stacked: bool) -> MockNode {
    let (side, main) = if stacked {
        (
            MockNode::new("div").class("column-strip").rect(0.0, 200.0, container_width, 300.0),
            MockNode::new("div").class("column-main").rect(0.0, 500.0, container_width, 900.0),
        )
    } else {
        (
            MockNode::new("div").class("column-strip").rect(0.0, 200.0, 300.0, 800.0),
            MockNode::new("div").class("column-main").rect(320.0, 200.0, container_width - 320.0, 900.0),
        )
    };
    MockNode::new("div")
        .class("column-container")
        .rect(0.0, 200.0, container_width, 1000.0)
        .children([side, main])
}

fn page(body: Vec<MockNode>) -> MockNode {
    MockNode::new("html").child(MockNode::new("body").child(header()).children(body))
}

fn site() -> Arc<dyn MockSite> {
    Arc::new(|request: &MockRequest| match request.path.as_str() {
        "/en-US/" => Some(page(vec![MockNode::new("form")
            .id("home-search-form")
            .attr("action", "/en-US/search")
            .child(MockNode::new("input").id("home-q").attr("name", "q"))])),
        "/en-US/docs/User:anonymous:uitest" => Some(page(vec![
            MockNode::new("article").id("wikiArticle").text("UI test article"),
            MockNode::new("div").id("task-completion").child(
                MockNode::new("button")
                    .attr("type", "button")
                    .class("task-completion-close")
                    .on(Behavior::Dismiss {
                        target_id: "task-completion".to_string(),
                    }),
            ),
        ])),
        "/en-US/search" => {
            let term = request.param("q").unwrap_or("").to_string();
            let items = if term == "css" { 10 } else { 0 };
            Some(page(vec![
                MockNode::new("input").id("search-q").attr("name", "q").value(term.clone()),
                MockNode::new("p")
                    .class("search-results-explanation")
                    .text(format!("{} documents found for \"{}\" in English (US).", if items > 0 { "1,234" } else { "0" }, term)),
                layout(1200.0, false).child(
                    MockNode::new("ul").children((0..items).map(|i| {
                        MockNode::new("li").class("result-list-item").child(
                            MockNode::new("h4").child(
                                MockNode::new("a").attr("href", format!("http://localhost:8000/en-US/docs/Result_{}", i)),
                            ),
                        )
                    })),
                ),
            ]))
        }
        "/en-US/narrow" => Some(page(vec![layout(600.0, true)])),
        _ => None,
    })
}

fn base_for(driver: Arc<dyn Driver>) -> PageBase {
    PageBase::new(driver, "http://localhost:8000/").with_wait(quick_wait())
}

fn driver() -> Arc<dyn Driver> {
    Arc::new(MockDriver::new(site()))
}

#[test]
fn test_urls() {
    let base = base_for(driver());
    assert_eq!(HomePage::new(base.clone()).url(), "http://localhost:8000/en-US/");
    assert_eq!(
        ArticlePage::new(base.clone()).url(),
        "http://localhost:8000/en-US/docs/User:anonymous:uitest"
    );
    assert_eq!(
        SearchPage::new(base.clone(), Some("css grid")).url(),
        "http://localhost:8000/en-US/search?q=css%20grid"
    );
    assert_eq!(
        SearchPage::new(base.with_locale("fr"), None).url(),
        "http://localhost:8000/fr/search"
    );
}

#[test]
fn test_parse_documents_found() {
    assert_eq!(parse_documents_found("1,234 documents found for \"css\""), Some(1234));
    assert_eq!(parse_documents_found("  0 documents found"), Some(0));
    assert_eq!(parse_documents_found("No documents found"), None);
}

#[tokio::test]
async fn test_open_waits_for_readiness() {
    let home = HomePage::new(base_for(driver())).open().await.unwrap();
    assert!(home.base().is_element_present(&crate::driver::Locator::id("home-q")).await.unwrap());
}

#[tokio::test]
async fn test_open_times_out_without_readiness_locator() {
    let base = base_for(driver());
    let err = ArticlePage::with_slug(base, "Missing").open().await.unwrap_err();
    assert!(matches!(err, Error::Timeout(msg) if msg.contains("#wikiArticle")));
}

#[tokio::test]
async fn test_home_search_returns_search_page() {
    let home = HomePage::new(base_for(driver())).open().await.unwrap();
    let search = home.search_for_term("css").await.unwrap();

    assert_eq!(search.term(), Some("css"));
    assert_eq!(search.search_input_value().await.unwrap(), "css");
    assert_eq!(search.search_result_items_length().await.unwrap(), 10);
    assert_eq!(search.documents_found().await.unwrap(), 1234);
}

#[tokio::test]
async fn test_header_focus_expands_field() {
    let home = HomePage::new(base_for(driver())).open().await.unwrap();
    let header = home.header().await.unwrap();

    let before = header.search_field_width().await.unwrap();
    header.search_field_focus().await.unwrap();
    let after = header.search_field_width().await.unwrap();

    assert!(before < after);
    assert!(header.is_signin_displayed().await.unwrap());
}

#[tokio::test]
async fn test_survey_dismissal_is_idempotent() {
    let driver = Arc::new(MockDriver::new(site()));
    let article = ArticlePage::new(base_for(driver.clone())).open().await.unwrap();

    article.disable_survey_popup().await.unwrap();
    assert!(!article.base().is_element_displayed(&crate::driver::Locator::id("task-completion")).await.unwrap());
    article.disable_survey_popup().await.unwrap();

    let scripts = driver.executed_scripts().await;
    assert_eq!(scripts.len(), 2);
    assert!(scripts[0].contains("localStorage.setItem"));
}

#[tokio::test]
async fn test_column_stacking() {
    let wide = SearchPage::new(base_for(driver()), Some("css")).open().await.unwrap();
    assert!(wide.column_container_region().await.unwrap().is_expected_stacking().await.unwrap());

    let driver = driver();
    driver.navigate("http://localhost:8000/en-US/narrow").await.unwrap();
    let narrow = ColumnContainer::locate(&base_for(driver)).await.unwrap();
    assert!(narrow.is_expected_stacking().await.unwrap());
}

#[tokio::test]
async fn test_link_list_is_exact_size() {
    let search = SearchPage::new(base_for(driver()), Some("css")).open().await.unwrap();
    let links = search.search_results_link_list().await.unwrap();
    assert_eq!(links.len(), 10);

    let hrefs: Vec<String> = {
        let mut out = Vec::new();
        for link in links {
            out.push(link.attribute("href").await.unwrap().unwrap());
        }
        out
    };
    assert_eq!(hrefs[3], "http://localhost:8000/en-US/docs/Result_3");
}

#[tokio::test]
async fn test_zero_results() {
    let search = SearchPage::new(base_for(driver()), Some("skwiz")).open().await.unwrap();
    assert_eq!(search.search_result_items_length().await.unwrap(), 0);
    assert_eq!(search.documents_found().await.unwrap(), 0);
    assert!(!search.is_next_button_displayed().await.unwrap());
}
