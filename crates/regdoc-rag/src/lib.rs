//! Retrieval-augmented answering over a corpus of regulatory documents.
//!
//! [`QueryOrchestrator`] is the entry point: build once with
//! [`QueryOrchestrator::initialize`], then call [`QueryOrchestrator::query`] or
//! [`QueryOrchestrator::analyze_case`].

pub mod build;
pub mod cancel;
pub mod case;
pub mod orchestrator;
pub mod prompt;
pub mod template;

pub use build::{build_index, BuildReport};
pub use cancel::CancelToken;
pub use case::compose_case_question;
pub use orchestrator::{QueryOptions, QueryOrchestrator};
pub use prompt::{estimate_tokens, ComposedPrompt, PromptComposer};
pub use template::{Template, DEFAULT_TEMPLATE};
