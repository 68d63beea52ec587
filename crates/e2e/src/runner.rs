//! Main test runner that launches collaborators and runs the scenarios

use std::path::PathBuf;
use std::time::{Duration, Instant};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::audit::{AuditOptions, LighthouseCli, LighthouseConfig};
use crate::error::{E2eError, E2eResult};
use crate::navigator::{HttpNavigator, Navigator};
use crate::playwright::{BrowserConfig, PlaywrightSession};
use crate::report::{RecordedAttachment, TestReport};
use crate::scenario::{self, AUDIT_SCENARIO, RESOURCES_SCENARIO};
use crate::suite::SuiteSpec;

/// Which navigator loads pages for the resource scenario
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NavigatorKind {
    #[default]
    Playwright,
    Http,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub skipped: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub attachments: Vec<RecordedAttachment>,
}

/// Result of running a suite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub suite: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub suite: SuiteSpec,
    pub browser: BrowserConfig,
    pub lighthouse: LighthouseConfig,
    pub navigator: NavigatorKind,

    /// Timeout for API requests and the HTTP navigator
    pub http_timeout: Duration,

    /// Where JSON report files are written
    pub reports_dir: PathBuf,

    /// Where the run summary is written
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            suite: SuiteSpec::default(),
            browser: BrowserConfig::default(),
            lighthouse: LighthouseConfig::default(),
            navigator: NavigatorKind::default(),
            http_timeout: Duration::from_secs(30),
            reports_dir: PathBuf::from("reports"),
            output_dir: PathBuf::from("test-results"),
        }
    }
}

/// Runs the scenarios of one suite
pub struct TestRunner {
    config: RunnerConfig,
    report: TestReport,
}

impl TestRunner {
    /// Create a new test runner with default configuration
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    /// Create a test runner with custom configuration
    pub fn with_config(config: RunnerConfig) -> Self {
        Self {
            config,
            report: TestReport::new(),
        }
    }

    pub fn report(&self) -> &TestReport {
        &self.report
    }

    /// Run every scenario of the suite
    pub async fn run_all(&mut self) -> E2eResult<SuiteResult> {
        self.config.suite.validate()?;
        let names = self.config.suite.scenario_names();
        self.run_named(&names).await
    }

    /// Run a single scenario by name
    pub async fn run_scenario(&mut self, name: &str) -> E2eResult<ScenarioResult> {
        self.config.suite.validate()?;
        if !self.config.suite.scenario_names().iter().any(|n| n == name) {
            return Err(E2eError::UnknownScenario(name.to_string()));
        }

        std::fs::create_dir_all(&self.config.reports_dir)?;
        Ok(self.execute(name).await)
    }

    async fn run_named(&mut self, names: &[String]) -> E2eResult<SuiteResult> {
        let start = Instant::now();
        std::fs::create_dir_all(&self.config.reports_dir)?;

        info!("Running {} scenario(s) of suite '{}'...", names.len(), self.config.suite.name);

        let mut results = Vec::new();
        for name in names {
            let result = self.execute(name).await;
            if result.skipped {
                info!("- {} (skipped)", result.name);
            } else if result.success {
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                error!("✗ {} - {}", result.name, result.error.as_deref().unwrap_or("unknown error"));
            }
            results.push(result);
        }

        let passed = results.iter().filter(|r| r.success && !r.skipped).count();
        let skipped = results.iter().filter(|r| r.skipped).count();
        let failed = results.len() - passed - skipped;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!("Test Results: {} passed, {} failed, {} skipped ({} ms)",
            passed, failed, skipped, duration_ms);

        Ok(SuiteResult {
            suite: self.config.suite.name.clone(),
            total: results.len(),
            passed,
            failed,
            skipped,
            duration_ms,
            results,
        })
    }

    async fn execute(&mut self, name: &str) -> ScenarioResult {
        let start = Instant::now();
        debug!("Running scenario: {}", name);
        self.report.set_scenario(name);

        let outcome = if self.is_enabled(name) {
            Some(self.dispatch(name).await)
        } else {
            None
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let attachments = self.report.attachments_for(name);

        match outcome {
            None => ScenarioResult {
                name: name.to_string(),
                success: true,
                skipped: true,
                duration_ms,
                error: None,
                attachments,
            },
            Some(Ok(())) => ScenarioResult {
                name: name.to_string(),
                success: true,
                skipped: false,
                duration_ms,
                error: None,
                attachments,
            },
            Some(Err(e)) => ScenarioResult {
                name: name.to_string(),
                success: false,
                skipped: false,
                duration_ms,
                error: Some(e.to_string()),
                attachments,
            },
        }
    }

    fn is_enabled(&self, name: &str) -> bool {
        match name {
            AUDIT_SCENARIO => {
                if self.config.suite.audit.enabled && self.config.navigator == NavigatorKind::Http {
                    warn!("Lighthouse needs a real browser; skipping {} with the HTTP navigator", name);
                    return false;
                }
                self.config.suite.audit.enabled
            }
            RESOURCES_SCENARIO => self.config.suite.resources.enabled,
            _ => true,
        }
    }

    async fn dispatch(&mut self, name: &str) -> E2eResult<()> {
        let suite = &self.config.suite;

        match name {
            AUDIT_SCENARIO => {
                let options = AuditOptions {
                    port: suite.audit.debugging_port,
                    log_level: suite.audit.log_level,
                    only_categories: suite.audit.categories.clone(),
                    ..Default::default()
                };
                let oracle = LighthouseCli::new(self.config.lighthouse.clone()).await?;

                let mut browser_config = self.config.browser.clone();
                browser_config
                    .args
                    .push(format!("--remote-debugging-port={}", options.port));
                let mut browser = PlaywrightSession::launch(&browser_config).await?;

                scenario::run_audit(
                    &mut browser,
                    &oracle,
                    &suite.target_url,
                    &options,
                    &suite.audit.min_scores,
                    &self.config.reports_dir,
                    &mut self.report,
                )
                .await?;
            }
            RESOURCES_SCENARIO => {
                let mut navigator = self.launch_navigator().await?;
                scenario::run_broken_resources(navigator.as_mut(), &suite.target_url, &mut self.report)
                    .await?;
            }
            other => {
                let check = suite
                    .api
                    .iter()
                    .find(|c| c.scenario_name() == other)
                    .ok_or_else(|| E2eError::UnknownScenario(other.to_string()))?;
                let client = reqwest::Client::builder()
                    .timeout(self.config.http_timeout)
                    .build()?;

                scenario::run_api_validation(&client, check, &self.config.reports_dir, &mut self.report)
                    .await?;
            }
        }

        Ok(())
    }

    async fn launch_navigator(&self) -> E2eResult<Box<dyn Navigator>> {
        let navigator: Box<dyn Navigator> = match self.config.navigator {
            NavigatorKind::Playwright => Box::new(PlaywrightSession::launch(&self.config.browser).await?),
            NavigatorKind::Http => Box::new(HttpNavigator::new(self.config.http_timeout)?),
        };
        Ok(navigator)
    }

    /// Write the run summary to JSON file
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}
