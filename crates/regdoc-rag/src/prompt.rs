//! Prompt assembly under a token budget.
use std::path::Path;

use regdoc_core::config::{resolve_with_base, LlmSettings, PromptSettings};
use regdoc_core::error::{Error, Result};
use regdoc_core::types::RetrievedChunk;

use crate::template::Template;

const CONTEXT_SEPARATOR: &str = "\n\n";

/// Rough token count used for budgeting: one token per four characters, rounded up.
pub fn estimate_tokens(chars: usize) -> usize {
    chars.div_ceil(4)
}

#[derive(Debug, Clone)]
pub struct ComposedPrompt {
    pub text: String,
    /// Leading retrieved chunks that made it into the context block.
    pub included: usize,
    /// Trailing retrieved chunks left out to respect the budget.
    pub dropped: usize,
    pub estimated_tokens: usize,
}

#[derive(Debug, Clone)]
pub struct PromptComposer {
    template: Template,
    budget_tokens: usize,
    annotate_sources: bool,
}

impl PromptComposer {
    pub fn new(template: Template, budget_tokens: usize, annotate_sources: bool) -> Self {
        Self { template, budget_tokens, annotate_sources }
    }

    /// Budget is the model's context window minus the tokens kept free for the answer.
    pub fn from_settings(prompt: &PromptSettings, llm: &LlmSettings, base: &Path) -> Result<Self> {
        let template = match &prompt.template_file {
            Some(file) => {
                let path = resolve_with_base(base, file);
                let text = std::fs::read_to_string(&path).map_err(|e| {
                    Error::InvalidConfig(format!("prompt.template_file {}: {}", path.display(), e))
                })?;
                Template::parse(&text)?
            }
            None => Template::builtin()?,
        };
        let budget = llm.context_window.saturating_sub(prompt.reserved_output_tokens);
        Ok(Self::new(template, budget, prompt.annotate_sources))
    }

    pub fn budget_tokens(&self) -> usize {
        self.budget_tokens
    }

    /// Fill the template with as many leading chunks as fit. Chunks are never cut;
    /// the first one that does not fit is dropped together with everything after it.
    pub fn compose(&self, retrieved: &[RetrievedChunk], question: &str) -> ComposedPrompt {
        let mut used_chars = self.template.fixed_chars() + question.chars().count();
        let mut context = String::new();
        let mut included = 0;

        for (i, r) in retrieved.iter().enumerate() {
            let block = self.context_block(i + 1, r);
            let extra = block.chars().count() + if included > 0 { CONTEXT_SEPARATOR.len() } else { 0 };
            if estimate_tokens(used_chars + extra) > self.budget_tokens {
                break;
            }
            if included > 0 {
                context.push_str(CONTEXT_SEPARATOR);
            }
            context.push_str(&block);
            used_chars += extra;
            included += 1;
        }

        let text = self.template.render(&context, question);
        ComposedPrompt {
            estimated_tokens: estimate_tokens(text.chars().count()),
            text,
            included,
            dropped: retrieved.len() - included,
        }
    }

    fn context_block(&self, n: usize, r: &RetrievedChunk) -> String {
        if !self.annotate_sources {
            return r.chunk.text.clone();
        }
        match r.chunk.page {
            Some(page) => format!("[Source {}] {} (page {})\n{}", n, r.chunk.source, page, r.chunk.text),
            None => format!("[Source {}] {}\n{}", n, r.chunk.source, r.chunk.text),
        }
    }
}
