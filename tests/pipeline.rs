//! Ingest and answer against the SQLite store with fake providers.

mod common;

use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use common::{fake_services, RecordingGenerator};
use docqa::ask::ask;
use docqa::ingest::{ingest_file, FileOutcome};
use docqa_core::generation::INSUFFICIENT_CONTEXT_ANSWER;
use docqa_core::pipeline::AnswerOptions;

const NOTES: &str = "Deployments run on Fridays after the deploy freeze lifts. \
                     Rollbacks need approval from the on-call lead.";

#[tokio::test]
async fn test_ingest_skips_already_processed() {
    let tmp = TempDir::new().unwrap();
    let services = fake_services(tmp.path(), Arc::new(RecordingGenerator::new())).await;
    let file = tmp.path().join("notes.txt");
    fs::write(&file, NOTES).unwrap();

    let first = ingest_file(&services, &file, 8, false).await.unwrap();
    let report = match first {
        FileOutcome::Ingested(r) => r,
        other => panic!("expected ingest, got {:?}", other),
    };
    assert_eq!(report.source_name, "notes.txt");
    assert_eq!(report.chunks_stored, 1);

    let second = ingest_file(&services, &file, 8, false).await.unwrap();
    assert!(matches!(second, FileOutcome::AlreadyProcessed(ref n) if n == "notes.txt"));

    // --force re-ingests under the same document.
    let forced = ingest_file(&services, &file, 8, true).await.unwrap();
    match forced {
        FileOutcome::Ingested(r) => assert_eq!(r.document_id, report.document_id),
        other => panic!("expected re-ingest, got {:?}", other),
    }
    let stats = services.store.stats().await.unwrap();
    assert_eq!((stats.documents, stats.chunks, stats.vectors), (1, 1, 1));
}

#[tokio::test]
async fn test_answer_uses_retrieved_context() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(RecordingGenerator::new());
    let services = fake_services(tmp.path(), generator.clone()).await;

    let notes = tmp.path().join("notes.txt");
    fs::write(&notes, NOTES).unwrap();
    let other = tmp.path().join("menu.txt");
    fs::write(&other, "The cafeteria serves soup on Mondays.").unwrap();
    ingest_file(&services, &notes, 8, false).await.unwrap();
    ingest_file(&services, &other, 8, false).await.unwrap();

    let opts = AnswerOptions {
        top_k: 1,
        ..AnswerOptions::default()
    };
    let answer = ask(&services, "When do deploy windows open?", &opts)
        .await
        .unwrap();
    assert_eq!(answer.answer, "Fridays.");
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].source_name, "notes.txt");

    let prompts = generator.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Question: When do deploy windows open?"));
    assert!(prompts[0].contains("Rollbacks need approval"));
    assert!(!prompts[0].contains("cafeteria"));
}

#[tokio::test]
async fn test_source_filter_limits_retrieval() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(RecordingGenerator::new());
    let services = fake_services(tmp.path(), generator.clone()).await;

    let notes = tmp.path().join("notes.txt");
    fs::write(&notes, NOTES).unwrap();
    let other = tmp.path().join("menu.txt");
    fs::write(&other, "The cafeteria serves soup on Mondays.").unwrap();
    ingest_file(&services, &notes, 8, false).await.unwrap();
    ingest_file(&services, &other, 8, false).await.unwrap();

    let opts = AnswerOptions {
        source_filter: Some("menu.txt".to_string()),
        ..AnswerOptions::default()
    };
    let answer = ask(&services, "deploy?", &opts).await.unwrap();
    assert!(answer.sources.iter().all(|s| s.source_name == "menu.txt"));
    assert!(generator.prompts.lock().unwrap()[0].contains("cafeteria"));
}

#[tokio::test]
async fn test_numeric_noise_yields_fixed_answer() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(RecordingGenerator::new());
    let services = fake_services(tmp.path(), generator.clone()).await;

    let dump = tmp.path().join("vectors.txt");
    fs::write(&dump, "0.12, 0.55, 0.91, -0.33, 0.78, 0.05").unwrap();
    ingest_file(&services, &dump, 8, false).await.unwrap();

    let answer = ask(&services, "When do deployments run?", &AnswerOptions::default())
        .await
        .unwrap();
    assert_eq!(answer.answer, INSUFFICIENT_CONTEXT_ANSWER);
    assert!(answer.sources.is_empty());
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_empty_store_yields_fixed_answer() {
    let tmp = TempDir::new().unwrap();
    let generator = Arc::new(RecordingGenerator::new());
    let services = fake_services(tmp.path(), generator.clone()).await;

    let answer = ask(&services, "Anything?", &AnswerOptions::default())
        .await
        .unwrap();
    assert_eq!(answer.answer, INSUFFICIENT_CONTEXT_ANSWER);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_blank_question_rejected() {
    let tmp = TempDir::new().unwrap();
    let services = fake_services(tmp.path(), Arc::new(RecordingGenerator::new())).await;

    let err = ask(&services, "   ", &AnswerOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("must not be empty"));
}
