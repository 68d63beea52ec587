//! Site quality E2E suite
//!
//! This crate audits a web page and validates a REST API:
//! - Scores the page with Lighthouse through a Playwright-launched Chromium
//! - Finds stylesheets, scripts and images on the page that do not load
//! - Checks the shape of JSON records returned by API endpoints
//! - Writes JSON logs and attaches them to the test report
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TestRunner (Rust)                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  lighthouse-audit                                           │
//! │    PlaywrightSession --port--> LighthouseCli -> ScoreMap    │
//! │  broken-resources                                           │
//! │    Navigator::goto -> snapshot -> collect_resources         │
//! │                    -> validate_resources -> broken list     │
//! │  api-<label>                                                │
//! │    fetch_records -> validate_records -> InvalidEntry list   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ReportSink: save_and_attach_log / attach_to_test_report    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod audit;
pub mod error;
pub mod navigator;
pub mod playwright;
pub mod records;
pub mod report;
pub mod resources;
pub mod runner;
pub mod scenario;
pub mod scoring;
pub mod suite;

pub use error::{E2eError, E2eResult};
pub use navigator::{Navigator, PageSnapshot};
pub use report::{ReportSink, TestReport};
pub use runner::TestRunner;
pub use suite::SuiteSpec;
