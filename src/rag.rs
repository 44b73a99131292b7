//! Retrieval-augmented answering: top-k retrieval, prompt assembly, and
//! citation building.

use anyhow::Result;
use serde::Serialize;

use crate::generator::TextGenerator;
use crate::index::{SearchHit, VectorIndex};

/// Fixed answer used when retrieval finds nothing or the model declines.
pub const NO_ANSWER_FALLBACK: &str = "I don't know based on our docs.";

const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Reference tying an answer back to one retrieved chunk.
#[derive(Debug, Clone, Serialize)]
pub struct Citation {
    /// Retrieval rank, starting at 1.
    pub index: usize,
    /// Source document name of the cited chunk.
    pub source: String,
    /// Path the cited chunk was loaded from.
    pub path: String,
    /// Distance score of the cited chunk (`1.0 - cosine`; lower is closer).
    pub score: f32,
}

/// Answer plus ordered citations for one query.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerOutcome {
    /// Generated (or fallback) answer text.
    pub answer: String,
    /// One citation per retrieved chunk, in retrieval rank order.
    pub citations: Vec<Citation>,
}

/// Combines top-k retrieval with a grounded prompt and one generation call.
pub struct RagEngine<'a> {
    index: &'a VectorIndex,
    generator: &'a dyn TextGenerator,
}

impl<'a> RagEngine<'a> {
    /// Builds an engine over an index and a generation backend.
    pub fn new(index: &'a VectorIndex, generator: &'a dyn TextGenerator) -> Self {
        Self { index, generator }
    }

    /// Answers `query` from the indexed documents.
    ///
    /// Retrieval failures propagate (ingestion-side callers monitor them),
    /// but generation failures never do: they degrade into an apologetic
    /// answer string while the citations from the successful retrieval are
    /// still returned. No hits means the fixed fallback answer with an empty
    /// citation list and no generation call at all.
    pub fn answer(&self, query: &str, top_k: usize) -> Result<AnswerOutcome> {
        let hits = self.index.search(query, top_k)?;
        if hits.is_empty() {
            return Ok(AnswerOutcome {
                answer: NO_ANSWER_FALLBACK.to_string(),
                citations: Vec::new(),
            });
        }

        let prompt = build_prompt(query, &hits);
        let answer = match self.generator.generate(&prompt) {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => NO_ANSWER_FALLBACK.to_string(),
            Err(err) => {
                eprintln!("[chat] LLM error: {err:#}");
                format!("Sorry — the LLM call failed: {err:#}")
            }
        };

        let citations = hits
            .iter()
            .enumerate()
            .map(|(i, hit)| Citation {
                index: i + 1,
                source: hit.meta.source.clone(),
                path: hit.meta.path.clone(),
                score: hit.score,
            })
            .collect();
        Ok(AnswerOutcome { answer, citations })
    }
}

fn build_prompt(query: &str, hits: &[SearchHit]) -> String {
    let context = hits
        .iter()
        .map(|hit| hit.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);
    format!(
        "You are a precise support assistant. Answer ONLY using the CONTEXT below.\n\
         If the answer is not in the context, say: \"{NO_ANSWER_FALLBACK}\"\n\
         \n\
         CONTEXT:\n\
         {context}\n\
         \n\
         USER QUESTION:\n\
         {query}\n\
         \n\
         RESPONSE RULES:\n\
         - Be concise (2-5 sentences).\n\
         - At the end, add 'Sources:' and list [1], [2], ... based on the order of retrieved chunks.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::testing::KeywordEmbedder;
    use crate::index::{ChunkMetadata, VectorIndex};
    use anyhow::bail;
    use tempfile::TempDir;

    struct StaticGenerator(&'static str);

    impl TextGenerator for StaticGenerator {
        fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingGenerator;

    impl TextGenerator for FailingGenerator {
        fn generate(&self, _prompt: &str) -> Result<String> {
            bail!("model overloaded")
        }
    }

    struct CapturingGenerator {
        seen: std::cell::RefCell<Vec<String>>,
    }

    impl TextGenerator for CapturingGenerator {
        fn generate(&self, prompt: &str) -> Result<String> {
            self.seen.borrow_mut().push(prompt.to_string());
            Ok("Refunds are accepted within 30 days. Sources: [1]".to_string())
        }
    }

    fn seeded_index(dir: &TempDir) -> VectorIndex {
        let index = VectorIndex::new(
            dir.path().join("index.json"),
            Box::new(KeywordEmbedder::new(&["refund", "shipping", "days"])),
        );
        let texts = vec![
            "refund window is 30 days".to_string(),
            "shipping takes 5 days".to_string(),
        ];
        let metas = vec![
            ChunkMetadata {
                source: "faq.txt".to_string(),
                path: "data/raw/faq.txt".to_string(),
            },
            ChunkMetadata {
                source: "faq.txt".to_string(),
                path: "data/raw/faq.txt".to_string(),
            },
        ];
        index.add(&texts, &metas).unwrap();
        index
    }

    #[test]
    fn empty_index_returns_fallback_without_generating() {
        let dir = TempDir::new().unwrap();
        let index = VectorIndex::new(
            dir.path().join("index.json"),
            Box::new(KeywordEmbedder::new(&["refund"])),
        );
        // A generator that panics on use would also work; failing is enough
        // to prove it was never called, since the outcome is still Ok.
        let engine = RagEngine::new(&index, &FailingGenerator);
        let outcome = engine.answer("anything at all", 3).unwrap();
        assert_eq!(outcome.answer, NO_ANSWER_FALLBACK);
        assert!(outcome.citations.is_empty());
    }

    #[test]
    fn citations_match_hits_with_one_based_ranks() {
        let dir = TempDir::new().unwrap();
        let index = seeded_index(&dir);
        let generator = StaticGenerator("The refund window is 30 days. Sources: [1]");
        let engine = RagEngine::new(&index, &generator);

        let outcome = engine.answer("how long is the refund window", 2).unwrap();
        assert_eq!(outcome.citations.len(), 2);
        assert_eq!(outcome.citations[0].index, 1);
        assert_eq!(outcome.citations[1].index, 2);
        assert_eq!(outcome.citations[0].source, "faq.txt");
        // Best hit first, so the first citation's distance is the smallest.
        assert!(outcome.citations[0].score <= outcome.citations[1].score);
    }

    #[test]
    fn generation_failure_degrades_instead_of_erroring() {
        let dir = TempDir::new().unwrap();
        let index = seeded_index(&dir);
        let engine = RagEngine::new(&index, &FailingGenerator);

        let outcome = engine.answer("refund window", 2).unwrap();
        assert!(outcome.answer.starts_with("Sorry — the LLM call failed:"));
        assert!(outcome.answer.contains("model overloaded"));
        assert_eq!(outcome.citations.len(), 2);
    }

    #[test]
    fn blank_generation_falls_back_to_the_no_answer_string() {
        let dir = TempDir::new().unwrap();
        let index = seeded_index(&dir);
        let generator = StaticGenerator("   \n ");
        let engine = RagEngine::new(&index, &generator);

        let outcome = engine.answer("refund window", 1).unwrap();
        assert_eq!(outcome.answer, NO_ANSWER_FALLBACK);
        assert_eq!(outcome.citations.len(), 1);
    }

    #[test]
    fn prompt_contains_context_in_rank_order_and_the_question() {
        let dir = TempDir::new().unwrap();
        let index = seeded_index(&dir);
        let generator = CapturingGenerator {
            seen: Default::default(),
        };
        let engine = RagEngine::new(&index, &generator);

        engine.answer("how long is the refund window", 2).unwrap();
        let prompts = generator.seen.borrow();
        assert_eq!(prompts.len(), 1);
        let prompt = &prompts[0];
        let refund_pos = prompt.find("refund window is 30 days").unwrap();
        let shipping_pos = prompt.find("shipping takes 5 days").unwrap();
        assert!(refund_pos < shipping_pos, "context must follow rank order");
        assert!(prompt.contains("USER QUESTION:\nhow long is the refund window"));
        assert!(prompt.contains(CONTEXT_SEPARATOR));
    }
}
