//! Question answering commands: `docqa ask` and `docqa run`.

use anyhow::Result;
use std::path::Path;

use docqa_core::pipeline::{answer_question, Answer, AnswerOptions};

use crate::config::Config;
use crate::credentials::Credentials;
use crate::ingest::{discover_files, ingest_file, FileOutcome};
use crate::services::Services;

/// Answer with the configured store and providers.
pub async fn ask(services: &Services, question: &str, opts: &AnswerOptions) -> Result<Answer> {
    let embedder = services.embedder()?;
    let generator = services.generator()?;
    answer_question(
        services.store.as_ref(),
        embedder,
        generator,
        question,
        opts,
    )
    .await
}

pub async fn run_ask(
    config: &Config,
    creds: &Credentials,
    question: &str,
    top_k: Option<usize>,
    source: Option<String>,
) -> Result<()> {
    let services = Services::from_config(config, creds).await?;
    let opts = config.retrieval.answer_options(top_k, source);
    let answer = ask(&services, question, &opts).await?;
    print_answer(&answer);
    Ok(())
}

/// `docqa run`: ingest `file` if it has not been processed yet, then
/// answer `question` from that document only.
pub async fn run_workflow(
    config: &Config,
    creds: &Credentials,
    file: &Path,
    question: &str,
) -> Result<()> {
    // Same file checks as `ingest`, but a directory is not accepted here.
    let files = discover_files(file)?;
    let file = match files.as_slice() {
        [single] if single.as_path() == file => single,
        _ => anyhow::bail!("Expected a single .pdf or .txt file: {}", file.display()),
    };

    let services = Services::from_config(config, creds).await?;
    let source_name = match ingest_file(&services, file, config.embedding.batch_size, false).await? {
        FileOutcome::Ingested(report) => {
            println!(
                "Ingested {}: {} chunks stored, {} skipped",
                report.source_name, report.chunks_stored, report.chunks_skipped
            );
            report.source_name
        }
        FileOutcome::AlreadyProcessed(name) => {
            println!("{} already processed, using stored chunks", name);
            name
        }
    };
    println!();

    let opts = config.retrieval.answer_options(None, Some(source_name));
    let answer = ask(&services, question, &opts).await?;
    print_answer(&answer);
    Ok(())
}

fn print_answer(answer: &Answer) {
    println!("{}", answer.answer);
    if answer.sources.is_empty() {
        return;
    }
    println!();
    println!("Sources:");
    for s in &answer.sources {
        match s.score {
            Some(score) => println!("  {} #{} (score {:.4})", s.source_name, s.chunk_index, score),
            None => println!("  {} #{}", s.source_name, s.chunk_index),
        }
    }
}
