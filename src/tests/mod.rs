use crate::{
    config::{Config, GitLabConfig},
    error::{ManifestError, ProposalError},
    proposer::MockHostingApi,
    runner::ApiVersionUpdater,
    types::Outcome,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, method, path}
};
use std::path::PathBuf;
use serde_json::json;

async fn version_server() -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/services/data"))
        .respond_with(ResponseTemplate::new(200)
            .set_body_json(json!([
                {"label": "Spring '23", "url": "/services/data/v57.0", "version": "57.0"},
                {"label": "Summer '23", "url": "/services/data/v58.0", "version": "58.0"},
                {"label": "Winter '23", "url": "/services/data/v56.0", "version": "56.0"}
            ])))
        .mount(&mock_server)
        .await;
    mock_server
}

fn manifest(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("sfdx-project.json");
    std::fs::write(&path, contents).unwrap();
    path
}

fn config(url: String, file: PathBuf, gitlab: Option<GitLabConfig>) -> Config {
    Config { url, file, timeout: None, gitlab }
}

fn gitlab(server: &str) -> GitLabConfig {
    GitLabConfig {
        server: server.to_string(),
        project: 42,
        token: "secret".to_string(),
        branch: "main".to_string(),
    }
}

#[tokio::test]
async fn stale_manifest_is_updated() {
    let mock_server = version_server().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let file = manifest(&temp_dir, r#"{"sourceApiVersion": "57.0", "other": 1}"#);

    let updater = ApiVersionUpdater::new(config(
        format!("{}/services/data", mock_server.uri()),
        file.clone(),
        None,
    ))
    .unwrap();
    let outcome = updater.run().await.unwrap();

    assert_eq!(
        outcome,
        Outcome::Updated {
            previous: "57.0".to_string(),
            latest: "58.0".parse().unwrap(),
            proposal: None,
        }
    );
    assert_eq!(
        std::fs::read_to_string(&file).unwrap(),
        "{\n  \"other\": 1,\n  \"sourceApiVersion\": \"58.0\"\n}"
    );
}

#[tokio::test]
async fn current_manifest_is_left_alone() {
    let mock_server = version_server().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let original = r#"{"sourceApiVersion": "58.0", "other": 1}"#;
    let file = manifest(&temp_dir, original);

    let mut api = MockHostingApi::new();
    api.expect_create_commit().never();
    api.expect_create_merge_request().never();

    let updater = ApiVersionUpdater::new(config(
        format!("{}/services/data", mock_server.uri()),
        file.clone(),
        Some(gitlab("gitlab.example.com")),
    ))
    .unwrap()
    .with_hosting(Box::new(api));
    let outcome = updater.run().await.unwrap();

    assert_eq!(outcome, Outcome::UpToDate { version: "58.0".parse().unwrap() });
    assert_eq!(std::fs::read_to_string(&file).unwrap(), original);
}

#[tokio::test]
async fn missing_key_fails_without_write() {
    let mock_server = version_server().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let original = r#"{"packageDirectories": [{"path": "force-app"}]}"#;
    let file = manifest(&temp_dir, original);

    let updater = ApiVersionUpdater::new(config(
        format!("{}/services/data", mock_server.uri()),
        file.clone(),
        None,
    ))
    .unwrap();
    let err = updater.run().await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ManifestError>(),
        Some(ManifestError::MissingKey(_))
    ));
    assert_eq!(std::fs::read_to_string(&file).unwrap(), original);
}

#[tokio::test]
async fn fetch_failure_leaves_manifest_untouched() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    let temp_dir = tempfile::tempdir().unwrap();
    let original = r#"{"sourceApiVersion": "57.0"}"#;
    let file = manifest(&temp_dir, original);

    let updater = ApiVersionUpdater::new(config(mock_server.uri(), file.clone(), None)).unwrap();

    assert!(updater.run().await.is_err());
    assert_eq!(std::fs::read_to_string(&file).unwrap(), original);
}

#[tokio::test]
async fn update_is_proposed_to_gitlab() {
    let mock_server = version_server().await;
    Mock::given(method("POST"))
        .and(path("/api/v4/projects/42/repository/commits"))
        .and(body_string_contains("branch=update_main_to_api_version_58.0"))
        .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"id":"abc"}"#))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v4/projects/42/merge_requests"))
        .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"iid":1}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let temp_dir = tempfile::tempdir().unwrap();
    let file = manifest(&temp_dir, r#"{"sourceApiVersion": "57.0"}"#);

    let updater = ApiVersionUpdater::new(config(
        format!("{}/services/data", mock_server.uri()),
        file,
        Some(gitlab(&mock_server.uri())),
    ))
    .unwrap();
    let outcome = updater.run().await.unwrap();

    match outcome {
        Outcome::Updated { proposal: Some(proposal), .. } => {
            assert_eq!(proposal.branch, "update_main_to_api_version_58.0");
            assert_eq!(proposal.merge_request_response, r#"{"iid":1}"#);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn committed_content_matches_written_manifest() {
    let mock_server = version_server().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let file = manifest(&temp_dir, r#"{"sourceApiVersion": "57.0", "name": "demo"}"#);

    let written = "{\n  \"name\": \"demo\",\n  \"sourceApiVersion\": \"58.0\"\n}";
    let mut api = MockHostingApi::new();
    api.expect_create_commit()
        .withf(move |change, _| change.content == written && change.file_path.ends_with("sfdx-project.json"))
        .times(1)
        .returning(|_, _| Ok("{}".to_string()));
    api.expect_create_merge_request()
        .times(1)
        .returning(|_, _| Ok("{}".to_string()));

    let updater = ApiVersionUpdater::new(config(
        format!("{}/services/data", mock_server.uri()),
        file.clone(),
        Some(gitlab("gitlab.example.com")),
    ))
    .unwrap()
    .with_hosting(Box::new(api));

    assert!(updater.run().await.is_ok());
    assert_eq!(std::fs::read_to_string(&file).unwrap(), written);
}

#[tokio::test]
async fn merge_request_failure_aborts_run() {
    let mock_server = version_server().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let file = manifest(&temp_dir, r#"{"sourceApiVersion": "57.0"}"#);

    let mut api = MockHostingApi::new();
    api.expect_create_commit()
        .times(1)
        .returning(|_, _| Ok("{}".to_string()));
    api.expect_create_merge_request()
        .times(1)
        .returning(|_, _| Err(ProposalError::Status { status: 500, body: "boom".to_string() }));

    let updater = ApiVersionUpdater::new(config(
        format!("{}/services/data", mock_server.uri()),
        file,
        Some(gitlab("gitlab.example.com")),
    ))
    .unwrap()
    .with_hosting(Box::new(api));
    let err = updater.run().await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ProposalError>(),
        Some(ProposalError::MergeRequestFailed { .. })
    ));
}

#[tokio::test]
async fn commit_failure_aborts_run() {
    let mock_server = version_server().await;
    let temp_dir = tempfile::tempdir().unwrap();
    let file = manifest(&temp_dir, r#"{"sourceApiVersion": "57.0"}"#);

    let mut api = MockHostingApi::new();
    api.expect_create_commit()
        .times(1)
        .returning(|_, _| Err(ProposalError::Status { status: 400, body: "branch exists".to_string() }));
    api.expect_create_merge_request().never();

    let updater = ApiVersionUpdater::new(config(
        format!("{}/services/data", mock_server.uri()),
        file,
        Some(gitlab("gitlab.example.com")),
    ))
    .unwrap()
    .with_hosting(Box::new(api));
    let err = updater.run().await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ProposalError>(),
        Some(ProposalError::CommitFailed { .. })
    ));
}
