//! Grounded answer synthesis.
//!
//! Takes the top re-ranked chunks, assembles a grounding context and a
//! deterministic prompt, and issues one generation call. An empty candidate
//! list short-circuits to a fixed fallback answer without contacting the
//! provider.

use std::sync::Arc;

use tracing::{debug, info};

use crate::document::{AnswerResult, ScoredChunk};
use crate::error::Result;
use crate::generation::GenerationProvider;

/// The fixed answer returned when no relevant chunks exist.
pub const NO_CONTEXT_ANSWER: &str =
    "I couldn't find any relevant information in the documents to answer your question.";

/// The fixed system instruction for grounded answering.
const SYSTEM_INSTRUCTION: &str = "You are a helpful documents assistant. Only provide \
     information that is supported by the context. Respond concisely and accurately.";

/// Assembles grounded prompts and calls the generation provider.
pub struct AnswerSynthesizer {
    provider: Arc<dyn GenerationProvider>,
    max_chunks: usize,
}

impl AnswerSynthesizer {
    /// Create a synthesizer that includes at most `max_chunks` chunks in
    /// the generation prompt.
    pub fn new(provider: Arc<dyn GenerationProvider>, max_chunks: usize) -> Self {
        Self { provider, max_chunks }
    }

    /// Synthesize an answer to `query` grounded in the top `max_chunks` of
    /// `ranked`.
    ///
    /// Returns the provider's answer verbatim, the ids of the chunks that
    /// were actually included in the prompt, and the full ranked candidate
    /// list. An empty `ranked` yields [`NO_CONTEXT_ANSWER`] with empty
    /// chunk lists and no provider call.
    pub async fn synthesize(&self, query: &str, ranked: Vec<ScoredChunk>) -> Result<AnswerResult> {
        if ranked.is_empty() {
            info!("no candidate chunks; returning fallback answer");
            return Ok(AnswerResult {
                answer: NO_CONTEXT_ANSWER.to_string(),
                used_chunks: Vec::new(),
                all_chunks: Vec::new(),
            });
        }

        let top = &ranked[..ranked.len().min(self.max_chunks)];
        let context: Vec<&str> = top.iter().map(|scored| scored.chunk.text.as_str()).collect();
        let prompt = build_prompt(&context.join("\n\n"), query);

        debug!(context_chunks = top.len(), prompt_len = prompt.len(), "calling generation provider");
        let answer = self.provider.generate(SYSTEM_INSTRUCTION, &prompt).await?;

        Ok(AnswerResult {
            answer,
            used_chunks: top.iter().map(|scored| scored.chunk.id).collect(),
            all_chunks: ranked,
        })
    }
}

/// The deterministic user-prompt template embedding the grounding context
/// and the question.
fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are an AI assistant specializing in answering questions based on provided \
         document content.\n\
         \n\
         Here is the context from the document:\n\
         ---\n\
         {context}\n\
         ---\n\
         \n\
         Question: {question}\n\
         \n\
         Please provide a comprehensive and accurate answer based solely on the information \
         in the provided context. If the context doesn't contain enough information to \
         answer the question, please state that clearly."
    )
}
