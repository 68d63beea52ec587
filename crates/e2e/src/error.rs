//! Error types for the audit and validation scenarios

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Playwright not found. Install with: npm install playwright && npx playwright install chromium")]
    PlaywrightNotFound,

    #[error("Lighthouse not found. Install with: npm install lighthouse")]
    LighthouseNotFound,

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Audit failed: {0}")]
    Audit(String),

    #[error("Audit result has no score for category '{0}'")]
    AuditCategoryMissing(String),

    #[error("Scores below threshold: {0}")]
    ScoreBelowThreshold(String),

    #[error("Failed to fetch {label}: {message}")]
    Fetch { label: String, message: String },

    #[error("Found {count} broken resource(s):\n{details}")]
    BrokenResources { count: usize, details: String },

    #[error("Found {count} invalid {label} record(s):\n{details}")]
    InvalidRecords {
        label: String,
        count: usize,
        details: String,
    },

    #[error("Suite parse error: {0}")]
    SuiteParse(String),

    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;
