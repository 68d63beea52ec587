//! Shape validation for records returned by a REST API

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};
use crate::report::{attach_to_test_report, ReportSink, TEXT_CONTENT_TYPE};

/// Record-type label selecting a shape rule set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Posts,
    Users,
}

impl RecordKind {
    /// Fields a rule set inspects, in reporting order
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            RecordKind::Posts => &["userId", "title", "body"],
            RecordKind::Users => &["name"],
        }
    }

    /// Every rule the record breaks, empty if it is valid
    pub fn violations(&self, record: &Value) -> Vec<String> {
        let mut reasons = Vec::new();

        match self {
            RecordKind::Posts => {
                if !record.get("userId").map(Value::is_number).unwrap_or(false) {
                    reasons.push("userId is not a number".to_string());
                }
                if is_blank(record.get("title")) {
                    reasons.push("title is empty".to_string());
                }
                if is_blank(record.get("body")) {
                    reasons.push("body is empty".to_string());
                }
            }
            RecordKind::Users => {
                if is_blank(record.get("name")) {
                    reasons.push("name is empty".to_string());
                }
            }
        }

        reasons
    }
}

impl FromStr for RecordKind {
    type Err = E2eError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        match label.trim().to_ascii_lowercase().as_str() {
            "posts" => Ok(RecordKind::Posts),
            "users" => Ok(RecordKind::Users),
            other => Err(E2eError::SuiteParse(format!("unknown record type: {}", other))),
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Posts => f.write_str("Posts"),
            RecordKind::Users => f.write_str("Users"),
        }
    }
}

/// A value is blank when it is missing, null, or a whitespace-only string
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// A record that failed at least one rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidEntry {
    /// Position in the source collection
    pub index: usize,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    pub reason: Vec<String>,
}

/// Validate every record against the rule set named by `label`.
///
/// Labels without a rule set produce no violations.
pub fn validate_records(records: &[Value], label: &str) -> Vec<InvalidEntry> {
    let kind = match label.parse::<RecordKind>() {
        Ok(kind) => kind,
        Err(_) => {
            warn!("No validation rules for record type '{}', skipping {} record(s)", label, records.len());
            return Vec::new();
        }
    };

    records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let reason = kind.violations(record);
            if reason.is_empty() {
                return None;
            }

            let fields = kind
                .fields()
                .iter()
                .filter_map(|field| record.get(*field).map(|v| (field.to_string(), v.clone())))
                .collect();

            Some(InvalidEntry { index, fields, reason })
        })
        .collect()
}

/// Fetch a JSON array of records.
///
/// Any failure is attached to the report before it is returned.
pub async fn fetch_records(
    client: &reqwest::Client,
    url: &str,
    label: &str,
    sink: &mut dyn ReportSink,
) -> E2eResult<Vec<Value>> {
    match try_fetch(client, url).await {
        Ok(records) => {
            info!("Fetched {} {} record(s) from {}", records.len(), label, url);
            Ok(records)
        }
        Err(message) => {
            let err = E2eError::Fetch {
                label: label.to_string(),
                message,
            };
            attach_to_test_report(
                sink,
                &format!("{} Fetch Error", label),
                &Value::String(err.to_string()),
                Some(TEXT_CONTENT_TYPE),
            )?;
            Err(err)
        }
    }
}

async fn try_fetch(client: &reqwest::Client, url: &str) -> Result<Vec<Value>, String> {
    let resp = client.get(url).send().await.map_err(|e| e.to_string())?;

    let status = resp.status();
    if !status.is_success() {
        return Err(format!("HTTP {}", status));
    }

    match resp.json::<Value>().await.map_err(|e| e.to_string())? {
        Value::Array(records) => Ok(records),
        other => Err(format!("expected a JSON array, got {}", json_type(&other))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Fail when any record is invalid, listing each index with its reasons
pub fn assert_no_invalid(label: &str, invalid: &[InvalidEntry]) -> E2eResult<()> {
    if invalid.is_empty() {
        return Ok(());
    }

    let details = invalid
        .iter()
        .map(|e| format!("  #{}: {}", e.index, e.reason.join(", ")))
        .collect::<Vec<_>>()
        .join("\n");

    Err(E2eError::InvalidRecords {
        label: label.to_string(),
        count: invalid.len(),
        details,
    })
}
