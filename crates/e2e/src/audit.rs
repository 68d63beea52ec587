//! Lighthouse audit oracle
//!
//! Lighthouse is driven through its CLI against a browser that is already
//! running with a remote debugging port open.

use std::path::PathBuf;
use std::process::Stdio;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};
use crate::scoring::{AuditResult, Category, LighthouseResult};

/// Lighthouse log verbosity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Silent,
    #[default]
    Info,
    Verbose,
}

/// Options for a single audit run
#[derive(Debug, Clone)]
pub struct AuditOptions {
    /// Remote debugging port of the browser to audit with
    pub port: u16,
    pub output: String,
    pub log_level: LogLevel,
    pub only_categories: Vec<Category>,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            port: 9222,
            output: "json".to_string(),
            log_level: LogLevel::Info,
            only_categories: Category::ALL.to_vec(),
        }
    }
}

/// Scores a URL across quality categories
#[async_trait::async_trait]
pub trait AuditOracle: Send + Sync {
    async fn run(&self, url: &str, options: &AuditOptions) -> E2eResult<AuditResult>;
}

/// Configuration for the Lighthouse CLI
#[derive(Debug, Clone)]
pub struct LighthouseConfig {
    /// Launcher used to resolve the lighthouse binary
    pub npx_binary: String,

    /// Directory whose node_modules holds lighthouse
    pub node_project_dir: PathBuf,
}

impl Default for LighthouseConfig {
    fn default() -> Self {
        Self {
            npx_binary: "npx".to_string(),
            node_project_dir: PathBuf::from("."),
        }
    }
}

/// [`AuditOracle`] backed by `npx lighthouse`
pub struct LighthouseCli {
    config: LighthouseConfig,
}

impl LighthouseCli {
    /// Create a new Lighthouse runner, verifying the CLI is available
    pub async fn new(config: LighthouseConfig) -> E2eResult<Self> {
        let status = Command::new(&config.npx_binary)
            .args(["--no-install", "lighthouse", "--version"])
            .current_dir(&config.node_project_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(Self { config }),
            _ => Err(E2eError::LighthouseNotFound),
        }
    }

    /// Command line arguments for one run
    pub fn build_args(url: &str, options: &AuditOptions) -> Vec<String> {
        let categories: Vec<&str> = options.only_categories.iter().map(|c| c.id()).collect();

        let mut args = vec![
            "--no-install".to_string(),
            "lighthouse".to_string(),
            url.to_string(),
            format!("--port={}", options.port),
            format!("--output={}", options.output),
            "--output-path=stdout".to_string(),
            format!("--only-categories={}", categories.join(",")),
        ];

        match options.log_level {
            LogLevel::Silent => args.push("--quiet".to_string()),
            LogLevel::Verbose => args.push("--verbose".to_string()),
            LogLevel::Info => {}
        }

        args
    }
}

#[async_trait::async_trait]
impl AuditOracle for LighthouseCli {
    async fn run(&self, url: &str, options: &AuditOptions) -> E2eResult<AuditResult> {
        let args = Self::build_args(url, options);
        info!("Running Lighthouse against {} (port {})", url, options.port);
        debug!("{} {}", self.config.npx_binary, args.join(" "));

        let output = Command::new(&self.config.npx_binary)
            .args(&args)
            .current_dir(&self.config.node_project_dir)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(E2eError::Audit(format!(
                "lighthouse exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let lhr: LighthouseResult = serde_json::from_slice(&output.stdout)
            .map_err(|e| E2eError::Audit(format!("unreadable Lighthouse output: {}", e)))?;

        if let Some(err) = &lhr.runtime_error {
            return Err(E2eError::Audit(format!("{}: {}", err.code, err.message)));
        }

        info!(
            "Lighthouse {} audited {}",
            lhr.lighthouse_version.as_deref().unwrap_or("(unknown version)"),
            lhr.final_url.as_deref().unwrap_or(url)
        );
        Ok(AuditResult { lhr })
    }
}
