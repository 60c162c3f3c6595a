//! Test runner that drives scenarios through one browser session

use std::path::{Path, PathBuf};
use std::time::Instant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use topogui_common::HarnessConfig;

use crate::error::{E2eError, E2eResult};
use crate::scenarios::{self, Scenario};
use crate::session::GuiSession;

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of running a selection of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn new(
        results: Vec<TestResult>,
        skipped: usize,
        duration_ms: u64,
        started_at: DateTime<Utc>,
    ) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len() + skipped,
            passed,
            failed: results.len() - passed,
            skipped,
            duration_ms,
            started_at,
            results,
        }
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub harness: HarnessConfig,
    /// Scenarios to run; empty means all
    pub only: Vec<String>,
    /// Scenarios to leave out
    pub skip: Vec<String>,
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            harness: HarnessConfig::default(),
            only: Vec::new(),
            skip: Vec::new(),
            output_dir: PathBuf::from("test-results"),
        }
    }
}

/// Resolves the scenario selection, returning the scenarios to run and
/// how many were skipped. Unknown names are an error.
pub fn select(only: &[String], skip: &[String]) -> E2eResult<(Vec<Scenario>, usize)> {
    for name in only.iter().chain(skip) {
        if scenarios::find(name).is_none() {
            return Err(E2eError::ScenarioNotFound(name.clone()));
        }
    }

    let mut selected = Vec::new();
    let mut skipped = 0;
    for scenario in scenarios::all() {
        if !only.is_empty() && !only.iter().any(|n| n == scenario.name) {
            continue;
        }
        if skip.iter().any(|n| n == scenario.name) {
            skipped += 1;
            continue;
        }
        selected.push(scenario);
    }
    Ok((selected, skipped))
}

/// Write suite results to `test-results.json` under `output_dir`
pub fn write_results(output_dir: &Path, results: &TestSuiteResult) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let path = output_dir.join("test-results.json");
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}

/// Main E2E test runner
pub struct TestRunner {
    session: GuiSession,
    output_dir: PathBuf,
}

impl TestRunner {
    /// Opens the browser session the scenarios share
    pub async fn start(config: &RunnerConfig) -> E2eResult<Self> {
        let session = GuiSession::start(config.harness.clone()).await?;
        Ok(Self::with_session(session, config.output_dir.clone()))
    }

    pub fn with_session(session: GuiSession, output_dir: PathBuf) -> Self {
        Self {
            session,
            output_dir,
        }
    }

    /// Run the scenarios picked by `only` and `skip`
    pub async fn run_selected(&mut self, only: &[String], skip: &[String]) -> E2eResult<TestSuiteResult> {
        let (selected, skipped) = select(only, skip)?;
        Ok(self.run_scenarios(&selected, skipped).await)
    }

    pub async fn run_all(&mut self) -> TestSuiteResult {
        self.run_scenarios(&scenarios::all(), 0).await
    }

    /// Run scenarios in order; a failure does not stop the rest
    pub async fn run_scenarios(&mut self, selected: &[Scenario], skipped: usize) -> TestSuiteResult {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut results = Vec::new();

        info!("Running {} scenario(s)...", selected.len());

        for scenario in selected {
            let result = self.run_scenario(scenario).await;
            if result.success {
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        let suite = TestSuiteResult::new(results, skipped, duration_ms, started_at);

        info!(
            "Test Results: {} passed, {} failed, {} skipped ({} ms)",
            suite.passed, suite.failed, suite.skipped, suite.duration_ms
        );
        suite
    }

    /// `set_up`, the scenario, then `tear_down` regardless of the outcome
    pub async fn run_scenario(&mut self, scenario: &Scenario) -> TestResult {
        let start = Instant::now();
        debug!("Running scenario: {}", scenario.name);

        let mut outcome = match self.session.set_up().await {
            Ok(()) => (scenario.run)(&mut self.session).await,
            Err(e) => Err(e),
        };

        if let Err(e) = self.session.tear_down().await {
            warn!("Tear-down after {} failed: {}", scenario.name, e);
            if outcome.is_ok() {
                outcome = Err(e);
            }
        }

        TestResult {
            name: scenario.name.to_string(),
            success: outcome.is_ok(),
            duration_ms: start.elapsed().as_millis() as u64,
            error: outcome.err().map(|e| e.to_string()),
        }
    }

    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        write_results(&self.output_dir, results)
    }

    /// Ends the browser session
    pub async fn shutdown(self) -> E2eResult<()> {
        self.session.quit().await
    }
}
