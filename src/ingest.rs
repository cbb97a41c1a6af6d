//! Ingestion commands: `docqa ingest` and `docqa chunk`.
//!
//! Coordinates the flow for each file: extraction → chunking → embedding →
//! storage. The chunk/embed/store part is [`docqa_core::pipeline::ingest_text`];
//! this module adds file discovery, the "already processed" skip, and the
//! CLI reports.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use docqa_core::pipeline::{ingest_text, IngestReport};

use crate::config::Config;
use crate::credentials::Credentials;
use crate::extract::{content_type_for_path, read_document, source_name_for};
use crate::services::{build_chunker, Services};

/// Outcome for one file.
#[derive(Debug)]
pub enum FileOutcome {
    Ingested(IngestReport),
    /// Already stored and `force` was not set.
    AlreadyProcessed(String),
}

/// Ingest one file unless its source name is already stored.
pub async fn ingest_file(
    services: &Services,
    path: &Path,
    batch_size: usize,
    force: bool,
) -> Result<FileOutcome> {
    let source_name = source_name_for(path);
    if !force && services.store.has_document(&source_name).await? {
        tracing::info!(source = %source_name, "already processed, skipping");
        return Ok(FileOutcome::AlreadyProcessed(source_name));
    }

    let embedder = services.embedder()?;
    let doc = read_document(path)?;
    let report = ingest_text(
        services.store.as_ref(),
        &services.chunker,
        embedder,
        &doc.source_name,
        doc.content_type,
        &doc.text,
        batch_size,
    )
    .await?;
    Ok(FileOutcome::Ingested(report))
}

/// Files to ingest under `path`: the file itself, or every supported file
/// below a directory, in a stable order.
pub fn discover_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        bail!("Path does not exist: {}", path.display());
    }
    if path.is_file() {
        if content_type_for_path(path).is_none() {
            bail!(
                "Unsupported file type: {} (expected .pdf or .txt)",
                path.display()
            );
        }
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| content_type_for_path(p).is_some())
        .collect();
    files.sort();
    Ok(files)
}

pub async fn run_ingest(
    config: &Config,
    creds: &Credentials,
    path: &Path,
    force: bool,
    dry_run: bool,
    batch_size: Option<usize>,
) -> Result<()> {
    let files = discover_files(path)?;
    let batch_size = batch_size.unwrap_or(config.embedding.batch_size);

    if dry_run {
        return dry_run_report(config, creds, path, &files).await;
    }

    let services = Services::from_config(config, creds).await?;
    // Fail before touching any file if embeddings are off.
    services.embedder()?;

    let mut ingested = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;
    let mut chunks_stored = 0usize;
    let mut chunks_skipped = 0usize;

    for file in &files {
        match ingest_file(&services, file, batch_size, force).await {
            Ok(FileOutcome::Ingested(report)) => {
                println!(
                    "  {}: {} chunks stored, {} skipped",
                    report.source_name, report.chunks_stored, report.chunks_skipped
                );
                ingested += 1;
                chunks_stored += report.chunks_stored;
                chunks_skipped += report.chunks_skipped;
            }
            Ok(FileOutcome::AlreadyProcessed(name)) => {
                println!("  {}: already processed (use --force to re-ingest)", name);
                skipped += 1;
            }
            Err(e) => {
                tracing::error!(file = %file.display(), error = %e, "ingest failed");
                eprintln!("  {}: failed: {:#}", file.display(), e);
                failed += 1;
            }
        }
    }

    println!("ingest {}", path.display());
    println!("  files found: {}", files.len());
    println!("  ingested: {}", ingested);
    println!("  already processed: {}", skipped);
    println!("  failed: {}", failed);
    println!("  chunks stored: {}", chunks_stored);
    if chunks_skipped > 0 {
        println!("  chunks skipped (embedding failed): {}", chunks_skipped);
    }

    if failed > 0 {
        bail!("{} of {} file(s) failed to ingest", failed, files.len());
    }
    println!("ok");
    Ok(())
}

async fn dry_run_report(
    config: &Config,
    creds: &Credentials,
    path: &Path,
    files: &[PathBuf],
) -> Result<()> {
    let chunker = build_chunker(config, creds)?;
    let mut total_chunks = 0usize;

    println!("ingest {} (dry-run)", path.display());
    println!("  files found: {}", files.len());
    for file in files {
        match read_document(file) {
            Ok(doc) => {
                let n = chunker
                    .chunk(&doc.text)
                    .await?
                    .iter()
                    .filter(|c| !c.trim().is_empty())
                    .count();
                println!("  {}: {} chunks", doc.source_name, n);
                total_chunks += n;
            }
            Err(e) => println!("  {}: extraction failed: {}", file.display(), e),
        }
    }
    println!("  estimated chunks: {}", total_chunks);
    Ok(())
}

/// `docqa chunk`: extract a file and print its chunks.
pub async fn run_chunk(
    config: &Config,
    creds: &Credentials,
    file: &Path,
    target_size: Option<usize>,
    overlap_size: Option<usize>,
) -> Result<()> {
    let target = target_size.unwrap_or(config.chunking.target_size);
    let overlap = overlap_size.unwrap_or(config.chunking.overlap_size);
    if target == 0 {
        bail!("--target-size must be > 0");
    }
    if overlap >= target {
        bail!(
            "overlap size ({}) must be smaller than target size ({})",
            overlap,
            target
        );
    }

    let doc = read_document(file)?;
    let chunker = build_chunker(config, creds)?.with_sizes(target, overlap);
    let chunks = chunker.chunk(&doc.text).await?;

    println!(
        "{}: {} chunks (target {}, overlap {}, splitter {})",
        doc.source_name,
        chunks.len(),
        target,
        overlap,
        chunker.splitter_name()
    );
    for (i, chunk) in chunks.iter().enumerate() {
        println!();
        println!("--- chunk {} ({} chars) ---", i, chunk.chars().count());
        println!("{}", chunk);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_discover_files_filters_and_sorts() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("nested/a.pdf"), "a").unwrap();
        fs::write(dir.path().join("skip.xlsx"), "x").unwrap();

        let files = discover_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(names, vec!["b.txt", "nested/a.pdf"]);
    }

    #[test]
    fn test_discover_single_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let txt = dir.path().join("one.txt");
        fs::write(&txt, "x").unwrap();
        assert_eq!(discover_files(&txt).unwrap(), vec![txt]);

        let other = dir.path().join("one.docx");
        fs::write(&other, "x").unwrap();
        assert!(discover_files(&other).is_err());
        assert!(discover_files(&dir.path().join("missing")).is_err());
    }
}
