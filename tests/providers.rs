//! Provider HTTP behavior against a local mock server.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use docqa::config::{EmbeddingConfig, GenerationConfig};
use docqa::credentials::Credentials;
use docqa::embedding::create_embedder;
use docqa::generation::create_generator;
use docqa_core::embedding::EmbeddingTask;

#[derive(Clone)]
struct Mock {
    hits: Arc<AtomicUsize>,
    /// Status codes for the first calls; later calls succeed.
    failures: Arc<Vec<u16>>,
}

impl Mock {
    fn new(failures: Vec<u16>) -> Self {
        Self {
            hits: Arc::new(AtomicUsize::new(0)),
            failures: Arc::new(failures),
        }
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn next_failure(&self) -> Option<StatusCode> {
        let n = self.hits.fetch_add(1, Ordering::SeqCst);
        self.failures
            .get(n)
            .map(|s| StatusCode::from_u16(*s).unwrap())
    }
}

async fn openai_embeddings(
    State(mock): State<Mock>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, String)> {
    if let Some(status) = mock.next_failure() {
        return Err((status, "mock failure".to_string()));
    }
    let inputs = body["input"].as_array().cloned().unwrap_or_default();
    // Reverse order to check index-based reordering.
    let data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .rev()
        .map(|(i, _)| json!({ "index": i, "embedding": [i as f32, 1.0] }))
        .collect();
    Ok(Json(json!({ "data": data })))
}

async fn gemini_generate(
    State(mock): State<Mock>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, String)> {
    if let Some(status) = mock.next_failure() {
        return Err((status, "mock failure".to_string()));
    }
    if params.get("key").map(String::as_str) != Some("gemini-test-key") {
        return Err((StatusCode::UNAUTHORIZED, "bad key".to_string()));
    }
    let prompt = body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    Ok(Json(json!({
        "candidates": [{ "content": { "parts": [{ "text": format!("echo: {}", prompt) }] } }]
    })))
}

async fn spawn(mock: Mock) -> String {
    let app = Router::new()
        .route("/v1/embeddings", post(openai_embeddings))
        .route(
            "/v1beta/models/{model_action}",
            post(gemini_generate),
        )
        .with_state(mock);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn creds() -> Credentials {
    Credentials {
        openai_api_key: Some("sk-test".to_string()),
        gemini_api_key: Some("gemini-test-key".to_string()),
    }
}

fn openai_config(url: String, max_retries: u32) -> EmbeddingConfig {
    EmbeddingConfig {
        provider: "openai".to_string(),
        model: Some("text-embedding-3-small".to_string()),
        dims: Some(2),
        max_retries,
        url: Some(url),
        ..EmbeddingConfig::default()
    }
}

#[tokio::test]
async fn test_openai_embeddings_ordered_by_index() {
    let mock = Mock::new(vec![]);
    let base = spawn(mock.clone()).await;
    let embedder = create_embedder(&openai_config(base, 0), &creds()).unwrap();

    let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let vectors = embedder.embed(&texts, EmbeddingTask::Document).await.unwrap();
    assert_eq!(vectors, vec![vec![0.0, 1.0], vec![1.0, 1.0], vec![2.0, 1.0]]);
    assert_eq!(mock.hits(), 1);
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let mock = Mock::new(vec![503]);
    let base = spawn(mock.clone()).await;
    let embedder = create_embedder(&openai_config(base, 2), &creds()).unwrap();

    let vectors = embedder
        .embed(&["only".to_string()], EmbeddingTask::Query)
        .await
        .unwrap();
    assert_eq!(vectors.len(), 1);
    assert_eq!(mock.hits(), 2);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let mock = Mock::new(vec![400, 400, 400]);
    let base = spawn(mock.clone()).await;
    let embedder = create_embedder(&openai_config(base, 3), &creds()).unwrap();

    let err = embedder
        .embed(&["only".to_string()], EmbeddingTask::Query)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("400"), "error: {}", err);
    assert_eq!(mock.hits(), 1);
}

#[tokio::test]
async fn test_wrong_dimensions_rejected() {
    let mock = Mock::new(vec![]);
    let base = spawn(mock).await;
    let mut config = openai_config(base, 0);
    config.dims = Some(3);
    let embedder = create_embedder(&config, &creds()).unwrap();

    assert!(embedder
        .embed(&["x".to_string()], EmbeddingTask::Document)
        .await
        .is_err());
}

#[tokio::test]
async fn test_gemini_generation_passes_key() {
    let mock = Mock::new(vec![]);
    let base = spawn(mock.clone()).await;
    let config = GenerationConfig {
        provider: "gemini".to_string(),
        model: Some("models/gemini-1.5-flash".to_string()),
        max_retries: 0,
        url: Some(base),
        ..GenerationConfig::default()
    };
    let generator = create_generator(&config, &creds()).unwrap();

    let text = generator.generate("hello").await.unwrap();
    assert_eq!(text, "echo: hello");
    assert_eq!(mock.hits(), 1);
}
