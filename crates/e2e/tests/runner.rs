//! Runner tests with browser-backed scenarios switched off

mod common;

use serde_json::json;
use siteprobe_e2e::runner::{NavigatorKind, RunnerConfig, SuiteResult};
use siteprobe_e2e::suite::{ApiCheck, SuiteSpec};
use siteprobe_e2e::{E2eError, TestRunner};

use common::{Route, TestServer};

fn config(server: &TestServer, dir: &std::path::Path) -> RunnerConfig {
    let mut suite = SuiteSpec::default();
    suite.name = "loopback".to_string();
    suite.target_url = server.url("/");
    suite.audit.enabled = false;
    suite.resources.enabled = false;
    suite.api = vec![
        ApiCheck { label: "Posts".to_string(), url: server.url("/posts") },
        ApiCheck { label: "Users".to_string(), url: server.url("/users") },
    ];

    RunnerConfig {
        suite,
        reports_dir: dir.join("reports"),
        output_dir: dir.join("test-results"),
        ..Default::default()
    }
}

#[tokio::test]
async fn run_all_reports_each_scenario() {
    let server = TestServer::start(vec![
        ("/posts", Route::json(json!([{ "userId": 1, "title": "a", "body": "b" }]))),
        ("/users", Route::json(json!([{ "name": "Ervin Howell" }, { "name": "" }]))),
    ])
    .await;
    let dir = tempfile::tempdir().unwrap();
    let mut runner = TestRunner::with_config(config(&server, dir.path()));

    let results = runner.run_all().await.unwrap();

    assert_eq!(results.total, 4);
    assert_eq!(results.skipped, 2);
    assert_eq!(results.passed, 1);
    assert_eq!(results.failed, 1);

    let users = results.results.iter().find(|r| r.name == "api-users").unwrap();
    assert!(!users.success);
    assert!(users.error.as_deref().unwrap().contains("#1: name is empty"));
    assert_eq!(users.attachments.len(), 1);
    assert_eq!(users.attachments[0].label, "Users Validation Log");

    assert!(dir.path().join("reports/validation-log-posts.json").exists());
    assert!(dir.path().join("reports/validation-log-users.json").exists());

    let path = runner.write_results(&results).unwrap();
    let written: SuiteResult = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(written.suite, "loopback");
    assert_eq!(written.failed, 1);
}

#[tokio::test]
async fn run_scenario_by_name() {
    let server = TestServer::start(vec![("/posts", Route::status(500))]).await;
    let dir = tempfile::tempdir().unwrap();
    let mut runner = TestRunner::with_config(config(&server, dir.path()));

    let result = runner.run_scenario("api-posts").await.unwrap();
    assert!(!result.success);
    assert!(result.error.unwrap().contains("Failed to fetch Posts"));
    assert_eq!(result.attachments[0].label, "Posts Fetch Error");

    assert!(matches!(
        runner.run_scenario("api-comments").await,
        Err(E2eError::UnknownScenario(_))
    ));
}

#[tokio::test]
async fn http_navigator_skips_audit() {
    let server = TestServer::start(vec![
        ("/", Route::html(r#"<img src="/logo.png">"#)),
        ("/logo.png", Route::ok("image/png")),
    ])
    .await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&server, dir.path());
    config.suite.audit.enabled = true;
    config.suite.resources.enabled = true;
    config.suite.api.clear();
    config.navigator = NavigatorKind::Http;
    let mut runner = TestRunner::with_config(config);

    let results = runner.run_all().await.unwrap();

    assert_eq!(results.total, 2);
    assert_eq!(results.skipped, 1);
    assert_eq!(results.passed, 1);
    assert!(runner.report().find("Broken Resources").is_some());
}

#[tokio::test]
async fn labels_sharing_a_scenario_name_are_rejected() {
    let server = TestServer::start(vec![
        ("/a", Route::json(json!([{ "userId": 1, "title": "a", "body": "b" }]))),
        ("/b", Route::json(json!([{ "userId": "x", "title": "", "body": "" }]))),
    ])
    .await;
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&server, dir.path());
    config.suite.api = vec![
        ApiCheck { label: "Posts".to_string(), url: server.url("/a") },
        ApiCheck { label: "posts".to_string(), url: server.url("/b") },
    ];
    let mut runner = TestRunner::with_config(config);

    assert!(matches!(runner.run_all().await, Err(E2eError::SuiteParse(_))));
    assert!(matches!(runner.run_scenario("api-posts").await, Err(E2eError::SuiteParse(_))));
    assert!(!dir.path().join("reports/validation-log-posts.json").exists());
}
