//! Runtime settings shared by the binaries.
//!
//! Configuration is an explicitly constructed struct handed by reference into
//! each component constructor. No process-wide singletons.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use crate::embedder::RetryPolicy;

/// Resolved configuration passed into component constructors.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Google AI Studio API key for embedding and generation calls.
    pub google_api_key: String,
    /// Gemini chat model used for answer synthesis.
    pub gemini_model: String,
    /// Gemini embedding model.
    pub gemini_embed_model: String,
    /// Base URL of the Gemini REST API.
    pub api_base_url: String,
    /// Path of the persisted index file.
    pub index_path: PathBuf,
    /// Characters per chunk.
    pub chunk_size: usize,
    /// Overlapping characters between neighboring chunks.
    pub chunk_overlap: usize,
    /// Default number of chunks retrieved per query.
    pub top_k: usize,
    /// Timeout applied to each provider HTTP request.
    pub request_timeout: Duration,
    /// Retry schedule for embedding calls.
    pub retry: RetryPolicy,
}

/// Command-line surface shared by the `ingest` and `query` binaries.
///
/// The required API key is a clap `required` argument with an env fallback,
/// so a missing credential fails at startup rather than at the first
/// provider call.
#[derive(Args, Debug, Clone)]
pub struct SharedArgs {
    /// Google AI Studio API key used for embedding and generation calls
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub google_api_key: String,

    /// Gemini chat model used for answer synthesis
    #[arg(long, env = "MINIRAG_GEMINI_MODEL", default_value = "gemini-1.5-flash")]
    pub gemini_model: String,

    /// Gemini embedding model
    #[arg(long, env = "MINIRAG_EMBED_MODEL", default_value = "text-embedding-004")]
    pub gemini_embed_model: String,

    /// Base URL for the Gemini REST API
    #[arg(
        long,
        env = "MINIRAG_API_BASE",
        default_value = crate::embedder::gemini::GEMINI_API_BASE
    )]
    pub api_base_url: String,

    /// Path of the persisted index file
    #[arg(long, env = "MINIRAG_INDEX", default_value = ".miniindex.json")]
    pub index_path: PathBuf,

    /// Characters per chunk when splitting documents
    #[arg(long, env = "MINIRAG_CHUNK_SIZE", default_value_t = 800)]
    pub chunk_size: usize,

    /// Overlapping characters between neighboring chunks
    #[arg(long, env = "MINIRAG_CHUNK_OVERLAP", default_value_t = 120)]
    pub chunk_overlap: usize,

    /// Default number of chunks retrieved per query
    #[arg(long, env = "MINIRAG_TOP_K", default_value_t = 6)]
    pub top_k: usize,

    /// Max seconds to wait for each provider request
    #[arg(long, env = "MINIRAG_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Attempts per embedding call before giving up
    #[arg(long, env = "MINIRAG_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: usize,
}

impl SharedArgs {
    /// Validates the parsed arguments and converts them into [`Settings`].
    pub fn build_settings(&self) -> Result<Settings> {
        anyhow::ensure!(self.chunk_size > 0, "chunk size must be positive");
        anyhow::ensure!(
            self.chunk_overlap < self.chunk_size,
            "chunk overlap {} must be smaller than chunk size {}",
            self.chunk_overlap,
            self.chunk_size
        );
        anyhow::ensure!(self.top_k > 0, "top-k must be positive");
        Ok(Settings {
            google_api_key: self.google_api_key.clone(),
            gemini_model: self.gemini_model.clone(),
            gemini_embed_model: self.gemini_embed_model.clone(),
            api_base_url: self.api_base_url.clone(),
            index_path: self.index_path.clone(),
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            top_k: self.top_k,
            request_timeout: Duration::from_secs(self.timeout_secs.max(1)),
            retry: RetryPolicy {
                max_attempts: self.max_retries.max(1),
                ..RetryPolicy::default()
            },
        })
    }
}
