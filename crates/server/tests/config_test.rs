//! Integration tests for configuration loading: explicit path override,
//! `${VAR}` substitution, and the missing-file error path.

use std::io::Write;

use serial_test::serial;
use studyrag_server::config::get_config;

#[test]
fn loads_config_from_an_explicit_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
port: 9191
db_url: "db/test.db"
storage_root: "storage-test"
embedding:
  api_url: "http://localhost:11434/v1/embeddings"
  model_name: "test-embedder"
chat:
  api_url: "http://localhost:11434/v1/chat/completions"
  model_name: "test-chat"
"#
    )
    .unwrap();

    let config = get_config(Some(file.path().to_str().unwrap())).unwrap();
    assert_eq!(config.port, 9191);
    assert_eq!(config.db_url, "db/test.db");
    assert_eq!(config.embedding.model_name, "test-embedder");
    assert_eq!(config.chat.model_name, "test-chat");
    // Untouched sections still fall back to their serde defaults.
    assert_eq!(config.rag.chunk_size, 1000);
    assert_eq!(config.rag.similarity_threshold, 0.4);
    assert_eq!(config.memory.max_messages, 20);
}

#[test]
fn missing_config_file_is_reported_as_not_found() {
    let result = get_config(Some("/nonexistent/path/studyrag-config-test.yml"));
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("not found"));
}

#[test]
#[serial]
fn env_var_placeholders_are_substituted_before_parsing() {
    std::env::set_var("STUDYRAG_TEST_API_KEY", "secret-123");
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
embedding:
  api_url: "http://localhost/embed"
  model_name: "test-embedder"
  api_key: "${{STUDYRAG_TEST_API_KEY}}"
chat:
  api_url: "http://localhost/chat"
  model_name: "test-chat"
"#
    )
    .unwrap();

    let config = get_config(Some(file.path().to_str().unwrap())).unwrap();
    assert_eq!(config.embedding.api_key.as_deref(), Some("secret-123"));

    std::env::remove_var("STUDYRAG_TEST_API_KEY");
}

#[test]
#[serial]
fn missing_placeholder_var_substitutes_to_empty_string() {
    std::env::remove_var("STUDYRAG_TEST_UNSET_KEY");
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
embedding:
  api_url: "http://localhost/embed"
  model_name: "test-embedder"
  api_key: "${{STUDYRAG_TEST_UNSET_KEY}}"
chat:
  api_url: "http://localhost/chat"
  model_name: "test-chat"
"#
    )
    .unwrap();

    let config = get_config(Some(file.path().to_str().unwrap())).unwrap();
    assert_eq!(config.embedding.api_key.as_deref(), Some(""));
}
