//! Embedding provider abstraction plus the shared retry policy.

pub mod gemini;

use std::thread;
use std::time::Duration;

use anyhow::Result;
use rand::Rng;

/// Task hint forwarded to the upstream embedding service.
///
/// Documents and queries travel through the same local code path; the hint
/// only changes which task type the provider receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingTask {
    /// Embedding a passage that will be stored in the index.
    Document,
    /// Embedding a search query.
    Query,
}

/// Trait implemented by embedding backends.
pub trait Embedder {
    /// Returns one vector per input text, in input order.
    ///
    /// Implementations must either embed every text or fail the whole batch;
    /// partial results are never returned.
    fn embed(&self, texts: &[&str], task: EmbeddingTask) -> Result<Vec<Vec<f32>>>;
}

/// Bounded retry schedule: linear backoff scaled by attempt number, plus a
/// small uniform jitter so simultaneous clients do not hammer the provider in
/// lockstep.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts before giving up, including the first one.
    pub max_attempts: usize,
    /// Base delay; the wait before retry `n` is `base * n`.
    pub base: Duration,
    /// Upper bound for the random jitter added to each wait.
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base: Duration::from_millis(500),
            jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let mut delay = self.base * attempt.min(u32::MAX as usize) as u32;
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms > 0 {
            delay += Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms));
        }
        delay
    }
}

/// Outcome of a single provider call attempt.
pub enum CallOutcome<T> {
    /// The call succeeded.
    Ok(T),
    /// The call failed transiently and may be retried.
    Retry(anyhow::Error),
    /// The call failed in a way that retrying cannot fix.
    Fatal(anyhow::Error),
}

/// Runs `call` up to `policy.max_attempts` times, sleeping per the policy
/// between transient failures. The last error is returned once attempts are
/// exhausted; fatal errors short-circuit immediately.
pub fn retrying<T>(
    policy: &RetryPolicy,
    mut call: impl FnMut() -> CallOutcome<T>,
) -> Result<T> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0usize;
    loop {
        match call() {
            CallOutcome::Ok(value) => return Ok(value),
            CallOutcome::Fatal(err) => return Err(err),
            CallOutcome::Retry(err) => {
                attempt += 1;
                if attempt >= max_attempts {
                    return Err(err.context(format!("giving up after {attempt} attempts")));
                }
                thread::sleep(policy.delay_for(attempt));
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Deterministic embedders shared by index and answering tests.

    use super::{Embedder, EmbeddingTask};
    use anyhow::{bail, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Embeds text as occurrence counts of a fixed vocabulary, so similarity
    /// behaves predictably without a network call.
    pub struct KeywordEmbedder {
        vocab: Vec<&'static str>,
    }

    impl KeywordEmbedder {
        pub fn new(vocab: &[&'static str]) -> Self {
            Self {
                vocab: vocab.to_vec(),
            }
        }
    }

    impl Embedder for KeywordEmbedder {
        fn embed(&self, texts: &[&str], _task: EmbeddingTask) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|text| {
                    let lowered = text.to_lowercase();
                    self.vocab
                        .iter()
                        .map(|word| lowered.matches(word).count() as f32)
                        .collect()
                })
                .collect())
        }
    }

    /// Always fails, recording how many batches were attempted.
    #[derive(Default)]
    pub struct FailingEmbedder {
        pub calls: Arc<AtomicUsize>,
    }

    impl Embedder for FailingEmbedder {
        fn embed(&self, _texts: &[&str], _task: EmbeddingTask) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            bail!("embedding service unavailable");
        }
    }
}
