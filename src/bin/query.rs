use anyhow::{bail, Result};
use clap::Parser;
use minirag::config::SharedArgs;
use minirag::embedder::gemini::GeminiEmbedder;
use minirag::generator::GeminiGenerator;
use minirag::index::VectorIndex;
use minirag::rag::RagEngine;

#[derive(Parser, Debug)]
#[command(
    name = "minirag-query",
    about = "Answer a question from the indexed documents, with citations"
)]
struct QueryCli {
    /// Question to answer from the indexed documents
    #[arg(long)]
    query: Option<String>,

    /// Print the stored chunk count and exit
    #[arg(long, default_value_t = false)]
    count: bool,

    /// Print per-source chunk totals and exit
    #[arg(long, default_value_t = false)]
    summary: bool,

    /// Retrieve and print the hits without calling the generation model
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Emit machine-readable JSON instead of plain text
    #[arg(long, default_value_t = false)]
    json: bool,

    #[command(flatten)]
    shared: SharedArgs,
}

fn main() -> Result<()> {
    let cli = QueryCli::parse();
    let settings = cli.shared.build_settings()?;
    let embedder = GeminiEmbedder::new(
        &settings.google_api_key,
        &settings.api_base_url,
        &settings.gemini_embed_model,
        settings.request_timeout,
        settings.retry.clone(),
    )?;
    let index = VectorIndex::new(&settings.index_path, Box::new(embedder));

    if cli.count {
        println!("{}", index.count()?);
        return Ok(());
    }
    if cli.summary {
        let summary = index.summary()?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!("total chunks: {}", summary.total_chunks);
            for (source, count) in &summary.by_source {
                println!("  {source}: {count}");
            }
        }
        return Ok(());
    }

    let Some(query) = cli.query else {
        bail!("--query is required unless --count or --summary is set");
    };
    let top_k = settings.top_k;

    if cli.dry_run {
        let hits = index.search(&query, top_k)?;
        if hits.is_empty() {
            println!("no results; has ingestion run?");
            return Ok(());
        }
        for (i, hit) in hits.iter().enumerate() {
            let preview: String = hit.text.chars().take(200).collect();
            println!(
                "[{}] score={:.3} source={}",
                i + 1,
                hit.score,
                hit.meta.source
            );
            println!("{}\n", preview.replace('\n', " "));
        }
        return Ok(());
    }

    let generator = GeminiGenerator::new(
        &settings.google_api_key,
        &settings.api_base_url,
        &settings.gemini_model,
        settings.request_timeout,
    )?;
    let engine = RagEngine::new(&index, &generator);
    let outcome = engine.answer(&query, top_k)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }
    println!("{}\n", outcome.answer);
    if !outcome.citations.is_empty() {
        println!("citations:");
        for citation in &outcome.citations {
            println!(
                "  [{}] {} ({}) score={:.3}",
                citation.index, citation.source, citation.path, citation.score
            );
        }
    }
    Ok(())
}
