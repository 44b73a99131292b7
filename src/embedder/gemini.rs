//! Gemini-based embedding client implementation.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{retrying, CallOutcome, Embedder, EmbeddingTask, RetryPolicy};

/// Default base URL for the Gemini REST API.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Blocking embeddings client that talks to the Gemini `embedContent`
/// endpoint. The upstream API embeds one content per request, so a batch of
/// `n` texts issues `n` sequential calls, each with its own retry budget.
#[derive(Clone)]
pub struct GeminiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    retry: RetryPolicy,
}

impl GeminiEmbedder {
    /// Builds a new Gemini embeddings client.
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing Google API key");
        anyhow::ensure!(!model.trim().is_empty(), "missing embedding model name");
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(api_key.trim()).context("invalid Google API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build Gemini HTTP client")?;
        let model = canon_model(model);
        let endpoint = format!("{}/{}:embedContent", base_url.trim_end_matches('/'), model);
        Ok(Self {
            client,
            endpoint,
            model,
            retry,
        })
    }

    /// Canonical model identifier sent with each request.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_embedding(&self, text: &str, task: EmbeddingTask) -> CallOutcome<Vec<f32>> {
        let request = EmbedRequest {
            model: &self.model,
            content: ContentBody {
                parts: vec![TextPart { text }],
            },
            task_type: task_type_name(task),
        };
        let response = self.client.post(&self.endpoint).json(&request).send();
        match response {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    let parsed: EmbedResponse = match resp.json() {
                        Ok(parsed) => parsed,
                        Err(err) => {
                            return CallOutcome::Fatal(
                                anyhow!(err).context("failed to parse Gemini embedding response"),
                            )
                        }
                    };
                    if parsed.embedding.values.is_empty() {
                        return CallOutcome::Fatal(anyhow!(
                            "Gemini returned an empty embedding vector"
                        ));
                    }
                    return CallOutcome::Ok(parsed.embedding.values);
                }
                let body = resp
                    .text()
                    .unwrap_or_else(|_| "<body unavailable>".to_string());
                let err = anyhow!("Gemini embedding request failed ({status}): {body}");
                if should_retry(status) {
                    CallOutcome::Retry(err)
                } else {
                    CallOutcome::Fatal(err)
                }
            }
            Err(err) => {
                if is_retryable_error(&err) {
                    CallOutcome::Retry(err.into())
                } else {
                    CallOutcome::Fatal(err.into())
                }
            }
        }
    }
}

impl Embedder for GeminiEmbedder {
    fn embed(&self, texts: &[&str], task: EmbeddingTask) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            let vector = retrying(&self.retry, || self.request_embedding(text, task))
                .with_context(|| format!("embedding text {} of {}", i + 1, texts.len()))?;
            vectors.push(vector);
        }
        Ok(vectors)
    }
}

/// Prefixes bare model names with `models/`; names already namespaced with
/// `models/` or `tunedModels/` pass through unchanged.
pub fn canon_model(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return "models/text-embedding-004".to_string();
    }
    if trimmed.starts_with("models/") || trimmed.starts_with("tunedModels/") {
        trimmed.to_string()
    } else {
        format!("models/{trimmed}")
    }
}

fn task_type_name(task: EmbeddingTask) -> &'static str {
    match task {
        EmbeddingTask::Document => "RETRIEVAL_DOCUMENT",
        EmbeddingTask::Query => "RETRIEVAL_QUERY",
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_body() || err.is_request() || err.is_decode()
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    content: ContentBody<'a>,
    #[serde(rename = "taskType")]
    task_type: &'static str,
}

#[derive(Serialize)]
struct ContentBody<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}
