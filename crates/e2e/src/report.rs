//! Report artifacts: JSON logs on disk plus attachments to the test report

use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::E2eResult;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const TEXT_CONTENT_TYPE: &str = "text/plain";

/// Payload of an attachment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentBody {
    /// Content held in memory
    Inline(String),
    /// Content stored in a file
    Path(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub content_type: String,
    pub body: AttachmentBody,
}

/// Out-of-band artifact store that scenarios attach diagnostics to.
///
/// Sinks are write-only from the scenarios' point of view.
pub trait ReportSink {
    fn attach(&mut self, label: &str, attachment: Attachment);
}

/// Serialize `data` as indented JSON, write it to `path` and attach the file.
///
/// The parent directory of `path` must already exist.
pub fn save_and_attach_log<T: Serialize + ?Sized>(
    path: &Path,
    data: &T,
    sink: &mut dyn ReportSink,
    label: &str,
) -> E2eResult<()> {
    let json = serde_json::to_string_pretty(data)?;
    std::fs::write(path, json)?;

    info!("{} written to: {}", label, path.display());
    sink.attach(
        label,
        Attachment {
            content_type: JSON_CONTENT_TYPE.to_string(),
            body: AttachmentBody::Path(path.to_path_buf()),
        },
    );
    Ok(())
}

/// Attach `data` to the report without touching the filesystem.
///
/// A JSON string is attached verbatim; any other value is pretty-printed.
pub fn attach_to_test_report(
    sink: &mut dyn ReportSink,
    label: &str,
    data: &serde_json::Value,
    content_type: Option<&str>,
) -> E2eResult<()> {
    let body = match data {
        serde_json::Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other)?,
    };

    sink.attach(
        label,
        Attachment {
            content_type: content_type.unwrap_or(JSON_CONTENT_TYPE).to_string(),
            body: AttachmentBody::Inline(body),
        },
    );
    Ok(())
}

/// An attachment as recorded by [`TestReport`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedAttachment {
    pub scenario: Option<String>,
    pub label: String,
    pub attached_at: DateTime<Utc>,
    #[serde(flatten)]
    pub attachment: Attachment,
}

/// In-memory report sink used by the runner
#[derive(Debug, Default)]
pub struct TestReport {
    scenario: Option<String>,
    attachments: Vec<RecordedAttachment>,
}

impl TestReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag subsequent attachments with the given scenario name
    pub fn set_scenario(&mut self, name: &str) {
        self.scenario = Some(name.to_string());
    }

    pub fn attachments(&self) -> &[RecordedAttachment] {
        &self.attachments
    }

    /// Attachments recorded while `name` was the active scenario
    pub fn attachments_for(&self, name: &str) -> Vec<RecordedAttachment> {
        self.attachments
            .iter()
            .filter(|a| a.scenario.as_deref() == Some(name))
            .cloned()
            .collect()
    }

    pub fn find(&self, label: &str) -> Option<&RecordedAttachment> {
        self.attachments.iter().find(|a| a.label == label)
    }
}

impl ReportSink for TestReport {
    fn attach(&mut self, label: &str, attachment: Attachment) {
        debug!("Attaching '{}' ({})", label, attachment.content_type);
        self.attachments.push(RecordedAttachment {
            scenario: self.scenario.clone(),
            label: label.to_string(),
            attached_at: Utc::now(),
            attachment,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_save_and_attach_log_writes_indented_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validation-log-posts.json");
        let mut report = TestReport::new();

        save_and_attach_log(&path, &json!([{ "index": 0 }]), &mut report, "Posts Validation Log").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "[\n  {\n    \"index\": 0\n  }\n]");

        let recorded = report.find("Posts Validation Log").unwrap();
        assert_eq!(recorded.attachment.content_type, JSON_CONTENT_TYPE);
        assert_eq!(recorded.attachment.body, AttachmentBody::Path(path));
    }

    #[test]
    fn test_save_and_attach_log_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lighthouse-report.json");
        std::fs::write(&path, "stale content that is longer than the new one").unwrap();
        let mut report = TestReport::new();

        save_and_attach_log(&path, &json!({}), &mut report, "Scores").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_save_and_attach_log_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("log.json");
        let mut report = TestReport::new();

        assert!(save_and_attach_log(&path, &json!([]), &mut report, "Log").is_err());
        assert!(report.attachments().is_empty());
    }

    #[test]
    fn test_attach_string_verbatim() {
        let mut report = TestReport::new();
        attach_to_test_report(&mut report, "Error", &json!("boom"), Some(TEXT_CONTENT_TYPE)).unwrap();

        let recorded = report.find("Error").unwrap();
        assert_eq!(recorded.attachment.body, AttachmentBody::Inline("boom".to_string()));
        assert_eq!(recorded.attachment.content_type, TEXT_CONTENT_TYPE);
    }

    #[test]
    fn test_attach_value_as_json() {
        let mut report = TestReport::new();
        report.set_scenario("broken-resources");
        attach_to_test_report(&mut report, "Broken Resources", &json!([1]), None).unwrap();

        let recorded = &report.attachments_for("broken-resources")[0];
        assert_eq!(recorded.attachment.body, AttachmentBody::Inline("[\n  1\n]".to_string()));
        assert_eq!(recorded.attachment.content_type, JSON_CONTENT_TYPE);
        assert!(report.attachments_for("lighthouse-audit").is_empty());
    }
}
