//! `docqa stats`: what's indexed.
//!
//! Totals come from [`Store::stats`]; the per-document table reads the
//! SQLite tables directly.

use anyhow::Result;
use sqlx::Row;

use docqa_core::store::Store;

use crate::config::Config;
use crate::db;

struct DocumentStats {
    source_name: String,
    chunk_count: i64,
    embedded_count: i64,
    updated_at: i64,
}

pub async fn run_stats(config: &Config) -> Result<()> {
    let store = db::open_store(config).await?;
    let totals = store.stats().await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("docqa database stats");
    println!("====================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Documents:   {}", totals.documents);
    println!("  Chunks:      {}", totals.chunks);
    println!(
        "  Embedded:    {} / {} ({}%)",
        totals.vectors,
        totals.chunks,
        if totals.chunks > 0 {
            (totals.vectors * 100) / totals.chunks
        } else {
            0
        }
    );

    let rows = sqlx::query(
        r#"
        SELECT
            d.source_name,
            d.updated_at,
            COUNT(DISTINCT c.id) AS chunk_count,
            COUNT(DISTINCT cv.chunk_id) AS embedded_count
        FROM documents d
        LEFT JOIN chunks c ON c.document_id = d.id
        LEFT JOIN chunk_vectors cv ON cv.chunk_id = c.id
        GROUP BY d.id
        ORDER BY d.source_name
        "#,
    )
    .fetch_all(store.pool())
    .await?;

    let docs: Vec<DocumentStats> = rows
        .iter()
        .map(|row| DocumentStats {
            source_name: row.get("source_name"),
            chunk_count: row.get("chunk_count"),
            embedded_count: row.get("embedded_count"),
            updated_at: row.get("updated_at"),
        })
        .collect();

    if !docs.is_empty() {
        println!();
        println!("  By document:");
        println!(
            "  {:<32} {:>8} {:>10}   {}",
            "SOURCE", "CHUNKS", "EMBEDDED", "UPDATED"
        );
        println!("  {}", "-".repeat(72));
        for d in &docs {
            println!(
                "  {:<32} {:>8} {:>10}   {}",
                d.source_name,
                d.chunk_count,
                d.embedded_count,
                format_ts_relative(d.updated_at)
            );
        }
    }

    println!();
    store.pool().close().await;
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Relative time for recent timestamps ("3 hours ago"), a date otherwise.
fn format_ts_relative(ts: i64) -> String {
    let delta = chrono::Utc::now().timestamp() - ts;
    if delta < 0 {
        return format_ts_date(ts);
    }
    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        plural(delta / 60, "min")
    } else if delta < 86400 {
        plural(delta / 3600, "hour")
    } else if delta < 86400 * 30 {
        plural(delta / 86400, "day")
    } else {
        format_ts_date(ts)
    }
}

fn plural(n: i64, unit: &str) -> String {
    format!("{} {}{} ago", n, unit, if n == 1 { "" } else { "s" })
}

fn format_ts_date(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
