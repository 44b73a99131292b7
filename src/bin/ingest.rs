use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use minirag::chunker::chunk_text;
use minirag::config::SharedArgs;
use minirag::embedder::gemini::GeminiEmbedder;
use minirag::index::{ChunkMetadata, VectorIndex};
use minirag::loader::load_paths;

#[derive(Parser, Debug)]
#[command(
    name = "minirag-ingest",
    about = "Chunk and embed documents into the local vector index"
)]
struct IngestCli {
    /// Folder scanned recursively for .txt/.md documents
    #[arg(long, env = "MINIRAG_DOCS", default_value = "data/raw")]
    path: PathBuf,

    /// Discard the existing index before ingesting
    #[arg(long, default_value_t = false)]
    reset: bool,

    #[command(flatten)]
    shared: SharedArgs,
}

fn main() -> Result<()> {
    let cli = IngestCli::parse();
    let settings = cli.shared.build_settings()?;
    let embedder = GeminiEmbedder::new(
        &settings.google_api_key,
        &settings.api_base_url,
        &settings.gemini_embed_model,
        settings.request_timeout,
        settings.retry.clone(),
    )?;
    let index = VectorIndex::new(&settings.index_path, Box::new(embedder));

    if cli.reset {
        index.reset().context("failed to reset index")?;
        eprintln!("index reset.");
    }

    eprintln!("ingest starting, path={}", cli.path.display());
    let docs = load_paths(&cli.path)?;
    anyhow::ensure!(
        !docs.is_empty(),
        "no .txt or .md documents found under {}",
        cli.path.display()
    );

    let mut total_chunks = 0usize;
    for doc in &docs {
        let chunks = chunk_text(&doc.text, settings.chunk_size, settings.chunk_overlap);
        let metas: Vec<ChunkMetadata> = chunks.iter().map(|_| doc.meta.clone()).collect();
        eprintln!(
            "embedding {} chunk(s) from {}...",
            chunks.len(),
            doc.meta.source
        );
        index
            .add(&chunks, &metas)
            .with_context(|| format!("failed to ingest {}", doc.meta.source))?;
        total_chunks += chunks.len();
    }

    let summary = index.summary()?;
    eprintln!(
        "ingest done: {} doc(s), {} chunk(s); index now holds {} chunk(s).",
        docs.len(),
        total_chunks,
        summary.total_chunks
    );
    for (source, count) in &summary.by_source {
        eprintln!("  {source}: {count}");
    }
    Ok(())
}
