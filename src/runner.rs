//! Scenario runner
//!
//! Selects scenarios by marker expression, evaluates their guards against the status
//! snapshot, runs each attempt on its own session, reruns flaky scenarios and collects a
//! serializable report.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::config::Config;
use crate::driver::{Driver, SessionProvider};
use crate::markers::{self, Guard, Marker, MarkerExpr, SkipDecision};
use crate::pages::PageBase;
use crate::status::{KumaStatus, StatusProvider};
use crate::urls::UrlChecker;
use crate::Result;

/// Scenario body
pub type ScenarioFn = fn(ScenarioContext) -> BoxFuture<'static, Result<()>>;

/// Everything a scenario body gets to work with
#[derive(Clone)]
pub struct ScenarioContext {
    driver: Arc<dyn Driver>,
    config: Arc<Config>,
    status: Arc<KumaStatus>,
    urls: UrlChecker,
}

impl ScenarioContext {
    pub fn new(driver: Arc<dyn Driver>, config: Arc<Config>, status: Arc<KumaStatus>, urls: UrlChecker) -> Self {
        Self {
            driver,
            config,
            status,
            urls,
        }
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn status(&self) -> &KumaStatus {
        &self.status
    }

    pub fn urls(&self) -> &UrlChecker {
        &self.urls
    }

    /// Fresh page settings bound to this scenario's session
    pub fn page_base(&self) -> PageBase {
        PageBase::from_config(Arc::clone(&self.driver), &self.config)
    }
}

/// A named scenario with its markers and optional guard
#[derive(Clone)]
pub struct Scenario {
    name: String,
    markers: Vec<Marker>,
    guard: Option<Guard>,
    body: ScenarioFn,
}

impl Scenario {
    pub fn new<S: Into<String>>(name: S, body: ScenarioFn) -> Self {
        Self {
            name: name.into(),
            markers: Vec::new(),
            guard: None,
            body,
        }
    }

    pub fn with_markers<I: IntoIterator<Item = Marker>>(mut self, markers: I) -> Self {
        self.markers.extend(markers);
        self
    }

    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn reruns(&self) -> u32 {
        markers::reruns(&self.markers)
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("markers", &self.markers)
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    Passed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub name: String,
    pub status: ScenarioStatus,
    pub markers: Vec<String>,
    pub attempts: u32,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<String>,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub deselected: usize,
    pub outcomes: Vec<ScenarioOutcome>,
}

impl SuiteReport {
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    pub fn outcome(&self, name: &str) -> Option<&ScenarioOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }
}

pub struct SuiteRunner {
    config: Arc<Config>,
    sessions: Arc<dyn SessionProvider>,
    status: Arc<dyn StatusProvider>,
    urls: UrlChecker,
}

impl SuiteRunner {
    pub fn new(config: Config, sessions: Arc<dyn SessionProvider>, status: Arc<dyn StatusProvider>) -> Result<Self> {
        let urls = UrlChecker::new(config.http_timeout())?;
        Ok(Self {
            config: Arc::new(config),
            sessions,
            status,
            urls,
        })
    }

    /// Run the selected scenarios, at most `workers` at a time
    ///
    /// Outcomes keep the order of `scenarios`.
    pub async fn run(&self, scenarios: Vec<Scenario>) -> Result<SuiteReport> {
        let started_at = Utc::now();
        let selection = self
            .config
            .markers
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let expr = selection.map(MarkerExpr::parse).transpose()?;

        let total = scenarios.len();
        let selected: Vec<Scenario> = scenarios
            .into_iter()
            .filter(|s| expr.as_ref().map_or(true, |e| e.matches(s.markers())))
            .collect();
        let deselected = total - selected.len();
        info!(
            "Running {} scenario(s), {} deselected, {} worker(s)",
            selected.len(),
            deselected,
            self.config.workers
        );

        let status = if selected.is_empty() {
            KumaStatus::default()
        } else {
            self.status.fetch().await?
        };
        let status = Arc::new(status);

        let outcomes: Vec<ScenarioOutcome> = stream::iter(selected)
            .map(|scenario| self.run_scenario(scenario, Arc::clone(&status)))
            .buffered(self.config.workers.max(1))
            .collect()
            .await;

        let count = |wanted: ScenarioStatus| outcomes.iter().filter(|o| o.status == wanted).count();
        let report = SuiteReport {
            started_at,
            finished_at: Utc::now(),
            base_url: self.config.base_url.clone(),
            selection: selection.map(str::to_string),
            passed: count(ScenarioStatus::Passed),
            failed: count(ScenarioStatus::Failed),
            skipped: count(ScenarioStatus::Skipped),
            deselected,
            outcomes,
        };

        info!(
            "Suite finished: {} passed, {} failed, {} skipped",
            report.passed, report.failed, report.skipped
        );
        Ok(report)
    }

    #[instrument(skip_all, fields(scenario = %scenario.name))]
    async fn run_scenario(&self, scenario: Scenario, status: Arc<KumaStatus>) -> ScenarioOutcome {
        let started = Instant::now();
        let mut outcome = ScenarioOutcome {
            name: scenario.name.clone(),
            status: ScenarioStatus::Passed,
            markers: scenario.markers.iter().map(|m| m.to_string()).collect(),
            attempts: 0,
            duration_ms: 0,
            error: None,
            skip_reason: None,
            artifacts: Vec::new(),
        };

        if let Some(guard) = scenario.guard {
            if let SkipDecision::Skip(reason) = guard(&status) {
                info!("Skipped: {}", reason);
                outcome.status = ScenarioStatus::Skipped;
                outcome.skip_reason = Some(reason);
                return outcome;
            }
        }

        let max_attempts = 1 + scenario.reruns();
        for attempt in 1..=max_attempts {
            outcome.attempts = attempt;
            match self.run_attempt(&scenario, &status, attempt, &mut outcome.artifacts).await {
                Ok(()) => {
                    info!("Passed on attempt {}", attempt);
                    outcome.status = ScenarioStatus::Passed;
                    outcome.error = None;
                    break;
                }
                Err(e) if attempt < max_attempts => {
                    warn!("Attempt {} failed, rerunning: {}", attempt, e);
                    outcome.error = Some(e.to_string());
                }
                Err(e) => {
                    error!("Failed: {}", e);
                    outcome.status = ScenarioStatus::Failed;
                    outcome.error = Some(e.to_string());
                }
            }
        }

        outcome.duration_ms = started.elapsed().as_millis() as u64;
        outcome
    }

    /// One attempt on a fresh session; failures leave artifacts behind
    async fn run_attempt(
        &self,
        scenario: &Scenario,
        status: &Arc<KumaStatus>,
        attempt: u32,
        artifacts: &mut Vec<String>,
    ) -> Result<()> {
        let driver = self.sessions.open_session().await?;
        let context = ScenarioContext::new(
            Arc::clone(&driver),
            Arc::clone(&self.config),
            Arc::clone(status),
            self.urls.clone(),
        );

        let result = (scenario.body)(context).await;
        if result.is_err() {
            artifacts.extend(self.save_artifacts(&driver, &scenario.name, attempt).await);
        }

        if let Err(e) = self.sessions.close_session(driver).await {
            warn!("Closing session failed: {}", e);
        }
        result
    }

    /// Screenshot and page source of a failed attempt
    async fn save_artifacts(&self, driver: &Arc<dyn Driver>, name: &str, attempt: u32) -> Vec<String> {
        let Some(dir) = self.config.artifacts_dir.as_deref() else {
            return Vec::new();
        };
        let dir = PathBuf::from(dir);
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            warn!("Cannot create artifacts directory {}: {}", dir.display(), e);
            return Vec::new();
        }

        let stem = format!("{}-attempt{}", name, attempt);
        let mut saved = Vec::new();

        match driver.screenshot().await {
            Ok(png) => {
                let path = dir.join(format!("{}.png", stem));
                match tokio::fs::write(&path, png).await {
                    Ok(()) => saved.push(path.display().to_string()),
                    Err(e) => warn!("Writing {} failed: {}", path.display(), e),
                }
            }
            Err(e) => warn!("Screenshot failed: {}", e),
        }

        match driver.page_source().await {
            Ok(html) => {
                let path = dir.join(format!("{}.html", stem));
                match tokio::fs::write(&path, html).await {
                    Ok(()) => saved.push(path.display().to_string()),
                    Err(e) => warn!("Writing {} failed: {}", path.display(), e),
                }
            }
            Err(e) => warn!("Page source capture failed: {}", e),
        }

        saved
    }
}
