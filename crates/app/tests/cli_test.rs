//! Integration tests for the command-line front end: file loading and a
//! full run against a mock server.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use pretty_assertions::assert_eq;
use relay_application::HistoryRepository;
use relay_domain::{Collection, Environment, ExecutorSettings, Request, ScriptLanguage};
use relay_infrastructure::{InMemoryHistoryRepository, to_json_stable};
use tempfile::tempdir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_loads_a_single_request() {
    let dir = tempdir().expect("temp dir");
    let file = dir.path().join("request.json");
    std::fs::write(&file, r#"{ "url": "https://api.test/users" }"#).expect("write");

    let request = relay::load_request(&file, None).await.expect("request");

    assert_eq!(request.method, "GET");
    assert_eq!(request.url, "https://api.test/users");
}

#[tokio::test]
async fn test_picks_a_request_out_of_a_collection() {
    let dir = tempdir().expect("temp dir");
    let file = dir.path().join("collection.json");
    let collection = Collection::new("Users")
        .with_request(Request::get("https://api.test/users").with_name("List"))
        .with_request(Request::post("https://api.test/users").with_name("Create"));
    std::fs::write(&file, to_json_stable(&collection).expect("json")).expect("write");

    let request = relay::load_request(&file, Some("create")).await.expect("request");
    assert_eq!(request.method, "POST");

    let missing = relay::load_request(&file, Some("Delete")).await;
    assert!(missing.is_err());
}

#[tokio::test]
async fn test_missing_settings_file_gives_defaults() {
    let dir = tempdir().expect("temp dir");
    let file = dir.path().join("settings.json");
    let settings = relay::load_settings(Some(file.as_path()))
        .await
        .expect("settings");
    assert_eq!(settings, ExecutorSettings::default());
}

#[tokio::test]
async fn test_runs_a_request_from_files() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .and(header("x-run", "r-7"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("pong", "text/plain"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().expect("temp dir");
    let env_file = dir.path().join("env.json");
    let environment = Environment::new("local").with_variable("base", server.uri());
    std::fs::write(&env_file, to_json_stable(&environment).expect("json")).expect("write");

    let request = Request::get("{!base}/ping")
        .with_header("X-Run", "{$run}")
        .with_pre_request_script(ScriptLanguage::Rhai, r#"pm.variables.run = "r-7";"#);
    let environment = relay::load_environment(&env_file).await.expect("environment");
    let history = Arc::new(InMemoryHistoryRepository::new(10));

    let response = relay::run_request(
        &request,
        &environment,
        &ExecutorSettings::default(),
        history.clone(),
    )
    .await
    .expect("run");

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.body(), Some("pong"));
    assert_eq!(history.all().await.expect("history").len(), 1);
}
