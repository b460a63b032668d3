//! End-to-end handler tests driven straight through the Axum router via
//! `tower::ServiceExt::oneshot`, against an `AppState` wired to an
//! in-memory database and the mock embedder/chat provider from
//! `studyrag-test-utils` — no real network endpoint is ever touched.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use studyrag::ai::ChatModelProvider;
use studyrag::embedding::Embedder;
use studyrag::store::{FilesystemObjectStorage, ObjectStorage, RelationalStore};
use studyrag::vector_store::VectorStore;
use studyrag::{
    config::MemoryConfig, streaming::OwnershipHook, FileGenerator, IngestionCoordinator,
    MemoryManager, RagConfig, RagQueryEngine, StreamingSession,
};
use studyrag_server::config::{AppConfig, MemorySettings, ProviderConfig, RagSettings};
use studyrag_server::router::create_router;
use studyrag_server::state::{AppState, RelationalOwnershipHook};
use studyrag_test_utils::{MockChatModelProvider, MockEmbedder, TestSetup};
use tempfile::TempDir;
use tower::ServiceExt;

struct Harness {
    app: axum::Router,
    chat: Arc<MockChatModelProvider>,
    _storage_dir: TempDir,
    _db: TestSetup,
}

async fn build_harness() -> Harness {
    let db = TestSetup::new().await.expect("in-memory schema init");
    let storage_dir = tempfile::tempdir().expect("temp storage dir");

    let store: Arc<dyn RelationalStore> = Arc::new(db.relational_store().unwrap());
    let vector_store: Arc<dyn VectorStore> = Arc::new(db.vector_store().unwrap());
    let objects: Arc<dyn ObjectStorage> =
        Arc::new(FilesystemObjectStorage::new(storage_dir.path().to_str().unwrap()));
    let embedder: Arc<dyn Embedder> = Arc::new(MockEmbedder::new(64));
    let chat_mock = Arc::new(MockChatModelProvider::new());
    let chat: Arc<dyn ChatModelProvider> = chat_mock.clone();

    // The mock embedder's bag-of-words vectors aren't comparable in scale to
    // a real embedding model's, so similarity_threshold is dropped to 0.0
    // here — only `similarity_threshold`'s threshold-filtering mechanics are
    // exercised, not the mock's ability to stand in for cosine distances an
    // OpenAI-compatible model would actually produce.
    let rag_config = RagConfig {
        embedding_dim: 64,
        similarity_threshold: 0.0,
        memory: MemoryConfig::default(),
        ..RagConfig::default()
    };

    let ingestion = Arc::new(IngestionCoordinator::new(
        store.clone(),
        objects.clone(),
        embedder.clone(),
        vector_store.clone(),
        rag_config.clone(),
    ));
    let memory = Arc::new(MemoryManager::new(store.clone(), chat.clone(), rag_config.memory.clone()));
    let rag = Arc::new(RagQueryEngine::new(
        store.clone(),
        embedder.clone(),
        vector_store.clone(),
        chat.clone(),
        memory.clone(),
        rag_config.clone(),
    ));
    let ownership: Arc<dyn OwnershipHook> = Arc::new(RelationalOwnershipHook::new(store.clone()));
    let streaming = Arc::new(StreamingSession::new(
        store.clone(),
        embedder.clone(),
        vector_store.clone(),
        chat.clone(),
        memory.clone(),
        ownership,
        rag_config.clone(),
    ));
    let filegen = Arc::new(FileGenerator::new(
        store.clone(),
        objects.clone(),
        embedder.clone(),
        vector_store.clone(),
        chat.clone(),
        rag_config,
    ));

    let config = AppConfig {
        port: 0,
        db_url: ":memory:".to_string(),
        storage_root: storage_dir.path().to_string_lossy().to_string(),
        embedding: ProviderConfig {
            api_url: "http://unused.invalid".into(),
            model_name: "mock-embedder".into(),
            api_key: None,
        },
        chat: ProviderConfig {
            api_url: "http://unused.invalid".into(),
            model_name: "mock-chat".into(),
            api_key: None,
        },
        rag: RagSettings::default(),
        memory: MemorySettings::default(),
    };

    let app_state = AppState {
        config: Arc::new(config),
        store,
        objects,
        vector_store,
        embedder,
        chat,
        ingestion,
        memory,
        rag,
        streaming,
        filegen,
    };

    Harness {
        app: create_router(app_state),
        chat: chat_mock,
        _storage_dir: storage_dir,
        _db: db,
    }
}

fn multipart_body(boundary: &str, filename: &str, content_type: &str, bytes: &[u8], auto_ingest: bool) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n").as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"auto_ingest\"\r\n\r\n");
    body.extend_from_slice(if auto_ingest { b"true" } else { b"false" });
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_check_reports_ok() {
    let harness = build_harness().await;
    let response = harness
        .app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_and_fetch_project_round_trip() {
    let harness = build_harness().await;

    let create = harness
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/projects")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "name": "Biology 101" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(create.status(), StatusCode::OK);
    let created = json_body(create).await;
    let project_id = created["result"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["result"]["owner_id"], "guest");

    let fetch = harness
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/projects/{project_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(fetch.status(), StatusCode::OK);
    let fetched = json_body(fetch).await;
    assert_eq!(fetched["result"]["name"], "Biology 101");
}

#[tokio::test]
async fn unknown_project_returns_404() {
    let harness = build_harness().await;
    let response = harness
        .app
        .oneshot(
            Request::builder()
                .uri("/projects/does-not-exist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_ingest_and_query_round_trip() {
    let harness = build_harness().await;

    let create = harness
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/projects")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "name": "Biology 101" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let project_id = json_body(create).await["result"]["id"].as_str().unwrap().to_string();

    let boundary = "studyrag-test-boundary";
    let body = multipart_body(
        boundary,
        "photosynthesis.txt",
        "text/plain",
        b"Photosynthesis converts sunlight, water, and carbon dioxide into glucose and oxygen.",
        true,
    );

    harness.chat.add_response(
        "Photosynthesis",
        "Photosynthesis converts sunlight into chemical energy stored as glucose.",
    );

    let upload = harness
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/projects/{project_id}/documents"))
                .header("content-type", format!("multipart/form-data; boundary={boundary}"))
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(upload.status(), StatusCode::OK);
    let uploaded = json_body(upload).await;
    assert_eq!(uploaded["result"]["processed"], true);

    let query = harness
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/projects/{project_id}/query"))
                .header("content-type", "application/json")
                .body(Body::from(json!({ "text": "What is photosynthesis?" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(query.status(), StatusCode::OK);
    let answered = json_body(query).await;
    assert!(answered["result"]["answer"]
        .as_str()
        .unwrap()
        .contains("glucose"));
    assert!(!answered["result"]["sources"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn requests_without_a_bearer_token_act_as_guest() {
    let harness = build_harness().await;
    let response = harness
        .app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/projects")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "name": "Anonymous project" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["result"]["owner_id"], "guest");
}
