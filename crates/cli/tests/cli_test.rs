//! End-to-end tests for the `studyrag` binary: each test shells out to the
//! compiled binary against a throwaway config pointing at `wiremock`
//! stand-ins for the embedding and chat endpoints.

use std::io::Write;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Starts embedding/chat mock servers and writes a config.yml pointing at
/// them plus an isolated db file and storage root under `dir`.
async fn write_test_config(dir: &std::path::Path) -> (MockServer, MockServer, std::path::PathBuf) {
    let embed_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "embedding": [0.1, 0.2, 0.3, 0.4] }]
        })))
        .mount(&embed_server)
        .await;

    let chat_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "Photosynthesis converts sunlight into chemical energy stored as glucose."
                }
            }]
        })))
        .mount(&chat_server)
        .await;

    let config_path = dir.join("config.yml");
    let mut file = std::fs::File::create(&config_path).unwrap();
    writeln!(
        file,
        r#"
port: 0
db_url: "{db_url}"
storage_root: "{storage_root}"
embedding:
  api_url: "{embed_url}/v1/embeddings"
  model_name: "mock-embedder"
chat:
  api_url: "{chat_url}/v1/chat/completions"
  model_name: "mock-chat"
rag:
  embedding_dim: 4
  similarity_threshold: 0.0
"#,
        db_url = dir.join("cli-test.db").to_str().unwrap(),
        storage_root = dir.join("storage").to_str().unwrap(),
        embed_url = embed_server.uri(),
        chat_url = chat_server.uri(),
    )
    .unwrap();

    (embed_server, chat_server, config_path)
}

/// Extracts the id printed by `create-project`: `Created project <id> (<name>)`.
fn parse_created_project_id(stdout: &str) -> String {
    stdout
        .trim()
        .strip_prefix("Created project ")
        .and_then(|rest| rest.split(' ').next())
        .expect("create-project stdout should start with 'Created project <id>'")
        .to_string()
}

#[tokio::test]
async fn create_project_prints_its_id() {
    let temp_dir = tempfile::tempdir().unwrap();
    let (_embed, _chat, config_path) = write_test_config(temp_dir.path()).await;

    let mut cmd = Command::cargo_bin("studyrag").unwrap();
    cmd.arg("--config").arg(&config_path).arg("create-project").arg("Biology 101");
    cmd.assert().success().stdout(predicate::str::contains("Created project"));
}

#[tokio::test]
async fn ingest_and_query_round_trip() {
    let temp_dir = tempfile::tempdir().unwrap();
    let (_embed, _chat, config_path) = write_test_config(temp_dir.path()).await;

    let create = Command::cargo_bin("studyrag")
        .unwrap()
        .arg("--config")
        .arg(&config_path)
        .arg("create-project")
        .arg("Biology 101")
        .output()
        .unwrap();
    assert!(create.status.success());
    let project_id = parse_created_project_id(&String::from_utf8_lossy(&create.stdout));

    let fixture_path = temp_dir.path().join("photosynthesis.txt");
    std::fs::write(
        &fixture_path,
        "Photosynthesis converts sunlight, water, and carbon dioxide into glucose and oxygen.",
    )
    .unwrap();

    Command::cargo_bin("studyrag")
        .unwrap()
        .arg("--config")
        .arg(&config_path)
        .arg("ingest")
        .arg(&project_id)
        .arg(&fixture_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Ingested document"));

    Command::cargo_bin("studyrag")
        .unwrap()
        .arg("--config")
        .arg(&config_path)
        .arg("query")
        .arg(&project_id)
        .arg("What is photosynthesis?")
        .assert()
        .success()
        .stdout(predicate::str::contains("glucose"));
}

#[tokio::test]
async fn generate_file_writes_a_markdown_study_guide() {
    let temp_dir = tempfile::tempdir().unwrap();
    let (_embed, _chat, config_path) = write_test_config(temp_dir.path()).await;

    let create = Command::cargo_bin("studyrag")
        .unwrap()
        .arg("--config")
        .arg(&config_path)
        .arg("create-project")
        .arg("Biology 101")
        .output()
        .unwrap();
    let project_id = parse_created_project_id(&String::from_utf8_lossy(&create.stdout));

    let fixture_path = temp_dir.path().join("photosynthesis.txt");
    std::fs::write(
        &fixture_path,
        "Photosynthesis converts sunlight, water, and carbon dioxide into glucose and oxygen.",
    )
    .unwrap();
    Command::cargo_bin("studyrag")
        .unwrap()
        .arg("--config")
        .arg(&config_path)
        .arg("ingest")
        .arg(&project_id)
        .arg(&fixture_path)
        .assert()
        .success();

    let out_path = temp_dir.path().join("guide.md");
    Command::cargo_bin("studyrag")
        .unwrap()
        .arg("--config")
        .arg(&config_path)
        .arg("generate-file")
        .arg(&project_id)
        .arg("--file-type")
        .arg("study-guide")
        .arg("--format")
        .arg("markdown")
        .arg("--title")
        .arg("Photosynthesis Guide")
        .arg("--out")
        .arg(&out_path)
        .arg("Summarize how photosynthesis works")
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated"));

    let rendered = std::fs::read_to_string(&out_path).unwrap();
    assert!(rendered.contains("glucose"));
}

#[test]
fn reingest_of_an_unknown_document_fails() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let temp_dir = tempfile::tempdir().unwrap();
    let (_embed, _chat, config_path) = rt.block_on(write_test_config(temp_dir.path()));

    Command::cargo_bin("studyrag")
        .unwrap()
        .arg("--config")
        .arg(&config_path)
        .arg("reingest")
        .arg("does-not-exist")
        .assert()
        .failure();
}
