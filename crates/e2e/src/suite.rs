//! Declarative YAML suite definition

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::audit::LogLevel;
use crate::error::{E2eError, E2eResult};
use crate::records::RecordKind;
use crate::scoring::Category;

pub const DEFAULT_TARGET_URL: &str = "https://example.com/";
pub const DEFAULT_API_BASE: &str = "https://jsonplaceholder.typicode.com";

/// A complete suite parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteSpec {
    /// Unique name for this suite
    #[serde(default = "default_name")]
    pub name: String,

    /// Page audited and scanned for broken resources
    #[serde(default = "default_target_url")]
    pub target_url: String,

    #[serde(default)]
    pub audit: AuditSpec,

    #[serde(default)]
    pub resources: ResourcesSpec,

    /// REST endpoints whose records get shape-checked
    #[serde(default = "default_api_checks")]
    pub api: Vec<ApiCheck>,
}

fn default_name() -> String {
    "default".to_string()
}

fn default_target_url() -> String {
    DEFAULT_TARGET_URL.to_string()
}

fn default_api_checks() -> Vec<ApiCheck> {
    vec![
        ApiCheck {
            label: "Posts".to_string(),
            url: format!("{}/posts", DEFAULT_API_BASE),
        },
        ApiCheck {
            label: "Users".to_string(),
            url: format!("{}/users", DEFAULT_API_BASE),
        },
    ]
}

fn default_true() -> bool {
    true
}

fn default_debugging_port() -> u16 {
    9222
}

fn default_categories() -> Vec<Category> {
    Category::ALL.to_vec()
}

impl Default for SuiteSpec {
    fn default() -> Self {
        Self {
            name: default_name(),
            target_url: default_target_url(),
            audit: AuditSpec::default(),
            resources: ResourcesSpec::default(),
            api: default_api_checks(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSpec {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Remote debugging port opened on the browser for Lighthouse
    #[serde(default = "default_debugging_port")]
    pub debugging_port: u16,

    #[serde(default = "default_categories")]
    pub categories: Vec<Category>,

    #[serde(default)]
    pub log_level: LogLevel,

    /// Optional minimum percentage per category
    #[serde(default)]
    pub min_scores: BTreeMap<Category, f64>,
}

impl Default for AuditSpec {
    fn default() -> Self {
        Self {
            enabled: true,
            debugging_port: default_debugging_port(),
            categories: default_categories(),
            log_level: LogLevel::default(),
            min_scores: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcesSpec {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ResourcesSpec {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCheck {
    /// Record-type label, also used in report names
    pub label: String,
    pub url: String,
}

impl ApiCheck {
    /// Scenario name, e.g. `api-posts`
    pub fn scenario_name(&self) -> String {
        format!("api-{}", slug(&self.label))
    }
}

/// Lowercase a label and collapse every run of characters other than ASCII
/// alphanumerics into a single '-', with none at either end
pub fn slug(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut pending_dash = false;

    for c in label.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }

    out
}

impl SuiteSpec {
    /// Parse a suite from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let suite: Self = serde_yaml::from_str(yaml)?;
        suite.validate()?;
        Ok(suite)
    }

    /// Parse a suite from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load all suites from a directory
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut suites = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            suites.push(Self::from_file(entry.path())?);
        }

        Ok(suites)
    }

    /// Check the target URL and the API checks.
    ///
    /// Two labels that slug to the same scenario name are rejected: they
    /// would share a scenario and a validation log file.
    pub fn validate(&self) -> E2eResult<()> {
        url::Url::parse(&self.target_url)
            .map_err(|e| E2eError::SuiteParse(format!("invalid target_url '{}': {}", self.target_url, e)))?;

        let mut seen = HashSet::new();
        for check in &self.api {
            if slug(&check.label).is_empty() {
                return Err(E2eError::SuiteParse(format!(
                    "api check for {} has no usable label: '{}'",
                    check.url, check.label
                )));
            }
            let name = check.scenario_name();
            if !seen.insert(name.clone()) {
                return Err(E2eError::SuiteParse(format!(
                    "api check '{}' duplicates scenario {}",
                    check.label, name
                )));
            }
            if check.label.parse::<RecordKind>().is_err() {
                tracing::warn!("API check '{}' has no validation rules; it will always pass", check.label);
            }
        }

        Ok(())
    }

    /// Names of every scenario this suite defines, in run order
    pub fn scenario_names(&self) -> Vec<String> {
        let mut names = vec![
            crate::scenario::AUDIT_SCENARIO.to_string(),
            crate::scenario::RESOURCES_SCENARIO.to_string(),
        ];
        names.extend(self.api.iter().map(ApiCheck::scenario_name));
        names
    }
}
