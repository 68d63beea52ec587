//! The three scenarios: Lighthouse audit, broken resources, API records
//!
//! Each scenario takes its collaborators explicitly and returns an error
//! when its assertion fails. Scenarios that are handed a navigator close it
//! on every exit path.

use std::collections::BTreeMap;
use std::path::Path;
use serde_json::Value;
use tracing::{info, warn};

use crate::audit::{AuditOptions, AuditOracle};
use crate::error::{E2eError, E2eResult};
use crate::navigator::Navigator;
use crate::records::{assert_no_invalid, fetch_records, validate_records};
use crate::report::{attach_to_test_report, save_and_attach_log, ReportSink, TEXT_CONTENT_TYPE};
use crate::resources::{assert_no_broken, collect_resources, validate_resources};
use crate::scoring::{extract_scores, Category, ScoreMap};
use crate::suite::{slug, ApiCheck};

pub const AUDIT_SCENARIO: &str = "lighthouse-audit";
pub const RESOURCES_SCENARIO: &str = "broken-resources";

pub const LIGHTHOUSE_REPORT_FILE: &str = "lighthouse-report.json";

/// File name of the validation log for a record-type label.
///
/// The label goes through [`slug`], so besides being lowercased, runs of
/// characters other than ASCII letters and digits become a single '-'
/// (`User Profiles` gives `validation-log-user-profiles.json`). For plain
/// alphanumeric labels such as `Posts` this is just the lowercased label.
pub fn validation_log_file(label: &str) -> String {
    format!("validation-log-{}.json", slug(label))
}

/// Audit `url` with the oracle while `browser` hosts the debugging port,
/// then persist the scores. The browser is closed afterwards, even on failure.
pub async fn run_audit<N, O>(
    browser: &mut N,
    oracle: &O,
    url: &str,
    options: &AuditOptions,
    min_scores: &BTreeMap<Category, f64>,
    reports_dir: &Path,
    sink: &mut dyn ReportSink,
) -> E2eResult<ScoreMap>
where
    N: Navigator + ?Sized,
    O: AuditOracle + ?Sized,
{
    let outcome = audit_and_record(oracle, url, options, reports_dir, sink).await;
    let closed = browser.close().await;

    let scores = outcome?;
    closed?;

    let below = scores.below(min_scores);
    if !below.is_empty() {
        let details = below
            .iter()
            .map(|(category, score, min)| format!("{} {:.1} < {:.1}", category, score, min))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(E2eError::ScoreBelowThreshold(details));
    }

    Ok(scores)
}

async fn audit_and_record<O: AuditOracle + ?Sized>(
    oracle: &O,
    url: &str,
    options: &AuditOptions,
    reports_dir: &Path,
    sink: &mut dyn ReportSink,
) -> E2eResult<ScoreMap> {
    let scores = match oracle.run(url, options).await.and_then(|result| extract_scores(&result)) {
        Ok(scores) => scores,
        Err(e) => {
            attach_to_test_report(
                sink,
                "Lighthouse Error",
                &Value::String(e.to_string()),
                Some(TEXT_CONTENT_TYPE),
            )?;
            return Err(e);
        }
    };

    info!(
        "Scores: Performance {:.1}, SEO {:.1}, Accessibility {:.1}, Best Practices {:.1}",
        scores.performance, scores.seo, scores.accessibility, scores.best_practices
    );

    save_and_attach_log(&reports_dir.join(LIGHTHOUSE_REPORT_FILE), &scores, sink, "Lighthouse Scores")?;
    Ok(scores)
}

/// Load `url`, check every stylesheet, script and image it references, and
/// fail if any is broken. Returns how many resources were checked.
pub async fn run_broken_resources<N>(
    navigator: &mut N,
    url: &str,
    sink: &mut dyn ReportSink,
) -> E2eResult<usize>
where
    N: Navigator + ?Sized,
{
    let outcome = check_page_resources(navigator, url, sink).await;
    let closed = navigator.close().await;

    let checked = outcome?;
    closed?;
    Ok(checked)
}

async fn check_page_resources<N: Navigator + ?Sized>(
    navigator: &mut N,
    url: &str,
    sink: &mut dyn ReportSink,
) -> E2eResult<usize> {
    match navigator.goto(url).await? {
        Some(status) if (200..300).contains(&status) => {}
        Some(status) => warn!("{} answered with {}", url, status),
        None => warn!("{} produced no response", url),
    }

    let page = navigator.snapshot().await?;
    let resources = collect_resources(&page);
    info!("Found {} resource(s) on {}", resources.len(), page.url);

    let broken = validate_resources(navigator, &resources).await;
    attach_to_test_report(sink, "Broken Resources", &serde_json::to_value(&broken)?, None)?;

    assert_no_broken(&broken)?;
    Ok(resources.len())
}

/// Fetch the records of one endpoint, log the invalid ones and fail if there
/// are any. Returns how many records were checked.
pub async fn run_api_validation(
    client: &reqwest::Client,
    check: &ApiCheck,
    reports_dir: &Path,
    sink: &mut dyn ReportSink,
) -> E2eResult<usize> {
    let records = fetch_records(client, &check.url, &check.label, sink).await?;
    let invalid = validate_records(&records, &check.label);

    save_and_attach_log(
        &reports_dir.join(validation_log_file(&check.label)),
        &invalid,
        sink,
        &format!("{} Validation Log", check.label),
    )?;

    assert_no_invalid(&check.label, &invalid)?;
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_log_file() {
        assert_eq!(validation_log_file("Posts"), "validation-log-posts.json");
        assert_eq!(validation_log_file("Users"), "validation-log-users.json");
        assert_eq!(validation_log_file("User Profiles"), "validation-log-user-profiles.json");
    }
}
