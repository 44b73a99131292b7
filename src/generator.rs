//! Text-generation boundary: trait plus the Gemini client implementation.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::embedder::gemini::canon_model;

/// Trait implemented by concrete answer-generation backends.
pub trait TextGenerator {
    /// Produces generated text for the given prompt.
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Blocking client for the Gemini `generateContent` endpoint.
pub struct GeminiGenerator {
    client: Client,
    endpoint: String,
}

impl GeminiGenerator {
    /// Builds a new Gemini generation client.
    pub fn new(api_key: &str, base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing Google API key");
        anyhow::ensure!(!model.trim().is_empty(), "missing generation model name");
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
        let endpoint = format!(
            "{}/{}:generateContent",
            base_url.trim_end_matches('/'),
            canon_model(model)
        );
        Ok(Self { client, endpoint })
    }
}

impl TextGenerator for GeminiGenerator {
    fn generate(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            contents: vec![ContentBody {
                parts: vec![TextPart { text: prompt }],
            }],
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .context("failed to call Gemini generateContent")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            bail!("Gemini generation request failed ({status}): {text}");
        }
        let parsed: GenerateResponse = resp
            .json()
            .context("failed to parse Gemini generation response")?;
        let answer = parsed
            .candidates
            .into_iter()
            .flat_map(|candidate| candidate.content.parts)
            .map(|part| part.text)
            .collect::<Vec<_>>()
            .join("");
        Ok(answer)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<ContentBody<'a>>,
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
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}
