//! Common test utilities
//!
//! A fake Kuma deployment rendered into the mock driver, plus configuration and runner
//! helpers shared by the integration tests.

#![allow(dead_code)]

use kuma_pages::driver::{Behavior, MockNode, MockRequest, MockSessionProvider, MockSite};
use kuma_pages::runner::SuiteRunner;
use kuma_pages::status::{KumaStatus, StaticStatusProvider};
use kuma_pages::Config;
use std::sync::Arc;

/// Host the fake site writes into result links
pub const LINK_HOST: &str = "http://localhost:8000";

/// Topic filters rendered on the search page, with their document counts for "css"
pub const TOPICS: [(&str, &str, u64); 5] = [
    ("css", "CSS", 420),
    ("html", "HTML", 310),
    ("js", "JavaScript", 260),
    ("api", "Web APIs", 580),
    ("svg", "SVG", 40),
];

/// Id of the results column, the part an in-place filter submit re-renders
pub const RESULTS_COLUMN_ID: &str = "search-results";

/// Topics checked when the request names none
pub const DEFAULT_TOPICS: [&str; 3] = ["css", "html", "js"];

/// Fake Kuma site
#[derive(Debug, Clone)]
pub struct KumaSite {
    /// Maintenance banner shown, sign-in hidden
    pub maintenance_mode: bool,
    /// Topic checkboxes submit the filter form themselves; no submit button
    pub auto_submit_filters: bool,
    /// The filter submit button re-renders the results column without loading a new page
    pub in_place_filters: bool,
    /// Header search field grows on focus
    pub header_expands: bool,
}

impl Default for KumaSite {
    fn default() -> Self {
        Self {
            maintenance_mode: false,
            auto_submit_filters: false,
            in_place_filters: false,
            header_expands: true,
        }
    }
}

impl KumaSite {
    pub fn maintenance() -> Self {
        Self {
            maintenance_mode: true,
            ..Default::default()
        }
    }

    pub fn auto_submit() -> Self {
        Self {
            auto_submit_filters: true,
            ..Default::default()
        }
    }

    pub fn in_place() -> Self {
        Self {
            in_place_filters: true,
            ..Default::default()
        }
    }

    fn header(&self) -> MockNode {
        let mut field = MockNode::new("input")
            .id("main-q")
            .attr("name", "q")
            .attr("type", "search")
            .rect(900.0, 12.0, 150.0, 32.0);
        if self.header_expands {
            field = field.on(Behavior::ExpandOnFocus { width: 340.0 });
        }

        let mut signin = MockNode::new("a").class("login-link").attr("href", "/users/github/login/");
        if self.maintenance_mode {
            signin = signin.hidden();
        }

        MockNode::new("header").id("main-header").children([
            MockNode::new("form")
                .id("nav-main-search")
                .attr("action", "/en-US/search")
                .child(field),
            signin,
        ])
    }

    fn page(&self, body: Vec<MockNode>) -> MockNode {
        let mut main = MockNode::new("body").child(self.header());
        if self.maintenance_mode {
            main = main.child(
                MockNode::new("div")
                    .id("maintenance-mode-notice")
                    .text("MDN is currently in read-only maintenance mode."),
            );
        }
        MockNode::new("html").child(main.children(body))
    }

    fn home(&self) -> MockNode {
        self.page(vec![MockNode::new("form")
            .id("home-search-form")
            .attr("action", "/en-US/search")
            .children([
                MockNode::new("input").id("home-q").attr("name", "q"),
                MockNode::new("button").attr("type", "submit").text("Search"),
            ])])
    }

    fn article(&self) -> MockNode {
        self.page(vec![
            MockNode::new("article").id("wikiArticle").text("UI test article"),
            MockNode::new("div").id("task-completion").children([
                MockNode::new("p").text("Did you find what you were looking for?"),
                MockNode::new("button")
                    .attr("type", "button")
                    .class("task-completion-close")
                    .on(Behavior::Dismiss {
                        target_id: "task-completion".to_string(),
                    }),
            ]),
        ])
    }

    fn search(&self, request: &MockRequest) -> MockNode {
        let term = request.param("q").unwrap_or("").to_string();
        let requested = request.params("topic");
        let selected: Vec<&str> = if requested.is_empty() {
            DEFAULT_TOPICS.to_vec()
        } else {
            requested
        };

        let found: u64 = if term == "css" {
            TOPICS
                .iter()
                .filter(|(value, _, _)| selected.contains(value))
                .map(|(_, _, count)| count)
                .sum()
        } else {
            0
        };
        let shown = found.min(10) as usize;

        let mut filters = MockNode::new("form")
            .class("search-filters")
            .attr("action", "/en-US/search")
            .child(MockNode::new("input").attr("type", "hidden").attr("name", "q").value(term.clone()).hidden());
        for (value, label, _) in TOPICS {
            let mut checkbox = MockNode::new("input")
                .attr("type", "checkbox")
                .attr("name", "topic")
                .attr("value", value)
                .attr("aria-label", label)
                .checked(selected.contains(&value));
            if self.auto_submit_filters {
                checkbox = checkbox.on(Behavior::AutoSubmit);
            }
            filters = filters.child(MockNode::new("label").child(checkbox).text(label));
        }
        if !self.auto_submit_filters {
            let mut submit = MockNode::new("button").attr("type", "submit").text("Filter");
            if self.in_place_filters {
                submit = submit.on(Behavior::RenderInPlace {
                    target_id: RESULTS_COLUMN_ID.to_string(),
                });
            }
            filters = filters.child(submit);
        }

        let results = MockNode::new("ul").children((0..shown).map(|i| {
            MockNode::new("li").class("result-list-item").children([
                MockNode::new("h4").child(
                    MockNode::new("a")
                        .attr("href", format!("{}/en-US/docs/Web/CSS/Result_{}", LINK_HOST, i))
                        .text(format!("Result {}", i)),
                ),
                MockNode::new("p").text("A matching document."),
            ])
        }));

        let mut main = MockNode::new("div")
            .id(RESULTS_COLUMN_ID)
            .class("column-main")
            .rect(320.0, 200.0, 880.0, 1200.0)
            .children([
                MockNode::new("p")
                    .class("search-results-explanation")
                    .text(format!(
                        "{} documents found for \"{}\" in English (US).",
                        group_thousands(found),
                        term
                    )),
                results,
            ]);
        if found > 10 {
            main = main.child(
                MockNode::new("ol")
                    .class("pagination")
                    .child(MockNode::new("li").child(MockNode::new("a").class("next").attr("href", "?page=2").text("Next"))),
            );
        }

        self.page(vec![
            MockNode::new("form")
                .id("search-form")
                .attr("action", "/en-US/search")
                .child(MockNode::new("input").id("search-q").attr("name", "q").value(term.clone())),
            MockNode::new("div")
                .class("column-container")
                .rect(0.0, 200.0, 1200.0, 1200.0)
                .children([
                    MockNode::new("div")
                        .class("column-strip")
                        .rect(0.0, 200.0, 300.0, 800.0)
                        .child(filters),
                    main,
                ]),
        ])
    }
}

impl MockSite for KumaSite {
    fn render(&self, request: &MockRequest) -> Option<MockNode> {
        match request.path.as_str() {
            "/en-US/" => Some(self.home()),
            "/en-US/docs/User:anonymous:uitest" => Some(self.article()),
            "/en-US/search" => Some(self.search(request)),
            _ => None,
        }
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Configuration with short waits against `base_url`
pub fn test_config(base_url: &str) -> Config {
    Config {
        base_url: base_url.to_string(),
        link_host: LINK_HOST.to_string(),
        wait_timeout_ms: 2000,
        poll_interval_ms: 10,
        http_timeout_ms: 5000,
        ..Default::default()
    }
}

/// Status document of a deployment with `count` indexed documents
pub fn status(maintenance_mode: bool, count: u64) -> KumaStatus {
    let mut status = KumaStatus::default();
    status.settings.maintenance_mode = maintenance_mode;
    status.services.database.available = true;
    status.services.database.populated = true;
    status.services.search.available = true;
    status.services.search.populated = count > 0;
    status.services.search.count = Some(count);
    status
}

/// Runner over `site` with a fixed status document
pub fn runner(
    config: Config,
    site: KumaSite,
    status: KumaStatus,
) -> (SuiteRunner, Arc<MockSessionProvider>) {
    let sessions = Arc::new(MockSessionProvider::new(Arc::new(site)));
    let runner = SuiteRunner::new(config, sessions.clone(), Arc::new(StaticStatusProvider::new(status)))
        .expect("runner");
    (runner, sessions)
}
