//! Prompt assembly.
//!
//! Deterministic and stateless: a grounding preamble, the retrieved
//! excerpts with citation markers, then the question. Retrieved context is
//! truncated to a character budget by dropping the lowest-ranked excerpts;
//! the question itself is never dropped.

use super::store::SearchHit;

const PREAMBLE: &str = "You are an impartial financial assistant for CrediTrust Financial. \
Your task is to answer business questions using only the information provided in the \
retrieved customer complaint narratives.

Instructions:
- Base your answer strictly on the retrieved context below.
- Do not add information, speculate, or make assumptions beyond the given context.
- If the context does not contain enough information to confidently answer the question, \
clearly say: \"The available complaint data does not provide enough information to answer \
this question.\"";

const EMPTY_CONTEXT: &str = "(no matching complaint narratives were found)";

#[derive(Debug, Clone)]
pub struct PromptAssembler {
    max_context_chars: usize,
}

impl PromptAssembler {
    pub fn new(max_context_chars: usize) -> Self {
        Self { max_context_chars }
    }

    /// Builds the generation payload from a question and its retrieval
    /// result. `hits` must already be ranked score-descending.
    pub fn assemble(&self, question: &str, hits: &[SearchHit]) -> String {
        let context = self.build_context(hits);
        let context = if context.is_empty() {
            EMPTY_CONTEXT.to_string()
        } else {
            context
        };

        format!(
            "{}\n\nRetrieved Complaint Narratives:\n{}\n\nBusiness Question:\n{}\n\nAnswer:",
            PREAMBLE, context, question
        )
    }

    fn build_context(&self, hits: &[SearchHit]) -> String {
        let mut blocks: Vec<String> = Vec::new();
        let mut used_chars = 0;

        for (i, hit) in hits.iter().enumerate() {
            let block = format!(
                "[{}] (Complaint {}, Product: {})\n{}",
                i + 1,
                hit.chunk.complaint_id,
                hit.chunk.product,
                hit.chunk.content
            );

            let block_chars = block.chars().count();
            if used_chars + block_chars > self.max_context_chars {
                // Everything below this rank is dropped too.
                break;
            }

            used_chars += block_chars;
            blocks.push(block);
        }

        blocks.join("\n---\n")
    }
}
