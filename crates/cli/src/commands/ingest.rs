//! `outreach ingest`: build the knowledge index from a product catalog.

use std::path::PathBuf;

use anyhow::Context;
use outreach_knowledge::ingest_file;
use outreach_providers::build_embedder;

use crate::runtime::load_config;

pub async fn run(source: Option<PathBuf>, index_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config()?;
    let source = source.unwrap_or_else(|| config.knowledge.source_path.clone());
    let index_dir = index_dir.unwrap_or_else(|| config.knowledge.index_dir.clone());

    println!("📚 Ingesting {}", source.display());

    let embedder = build_embedder(&config).context("cannot build embedder")?;
    let report = ingest_file(&source, &index_dir, embedder.as_ref())
        .await
        .with_context(|| format!("ingestion of {} failed", source.display()))?;

    println!(
        "✅ Indexed {} item(s) into {} ({}, {} dims)",
        report.entries,
        report.index_dir.display(),
        report.embedding_model,
        report.dimensions
    );
    Ok(())
}
