//! HTTP API tests: the router is served in-process with fake providers
//! and called with `reqwest`.

mod common;

use serde_json::{json, Value};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use common::{fake_services, RecordingGenerator};
use docqa::config::RetrievalConfig;
use docqa::ingest::ingest_file;
use docqa::server::router;
use docqa::services::Services;

async fn spawn_server(services: Services) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(services, RetrievalConfig::default());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_health() {
    let tmp = TempDir::new().unwrap();
    let services = fake_services(tmp.path(), Arc::new(RecordingGenerator::new())).await;
    let base = spawn_server(services).await;

    let resp = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_ask_returns_answer_and_sources() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(RecordingGenerator::new());
    let services = fake_services(tmp.path(), generator.clone()).await;
    let notes = tmp.path().join("notes.txt");
    fs::write(&notes, "Deployments run on Fridays. Rollbacks need approval.").unwrap();
    ingest_file(&services, &notes, 8, false).await.unwrap();
    let base = spawn_server(services).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/ask", base))
        .json(&json!({ "question": "When do deployments run?", "top_k": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["answer"], "Fridays.");
    assert_eq!(body["sources"][0]["source_name"], "notes.txt");
    assert_eq!(body["sources"][0]["chunk_index"], 0);
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn test_ask_empty_question_is_bad_request() {
    let tmp = TempDir::new().unwrap();
    let services = fake_services(tmp.path(), Arc::new(RecordingGenerator::new())).await;
    let base = spawn_server(services).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/ask", base))
        .json(&json!({ "question": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_ask_without_embedder() {
    let tmp = TempDir::new().unwrap();
    let mut services = fake_services(tmp.path(), Arc::new(RecordingGenerator::new())).await;
    services.embedder = None;
    let base = spawn_server(services).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/ask", base))
        .json(&json!({ "question": "anything?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "embeddings_disabled");
}

#[tokio::test]
async fn test_chunk_endpoint() {
    let tmp = TempDir::new().unwrap();
    let services = fake_services(tmp.path(), Arc::new(RecordingGenerator::new())).await;
    let base = spawn_server(services).await;
    let client = reqwest::Client::new();

    let text = (1..=6)
        .map(|i| format!("Sentence number {:02} is here.", i))
        .collect::<Vec<_>>()
        .join(" ");
    let resp = client
        .post(format!("{}/chunk", base))
        .json(&json!({ "text": text, "target_size": 60, "overlap_size": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["count"], 3);
    assert_eq!(
        body["chunks"][0],
        "Sentence number 01 is here. Sentence number 02 is here."
    );

    let resp = client
        .post(format!("{}/chunk", base))
        .json(&json!({ "text": "x", "target_size": 10, "overlap_size": 10 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");

    let resp = client
        .post(format!("{}/chunk", base))
        .json(&json!({ "text": "   " }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["count"], 0);
}
