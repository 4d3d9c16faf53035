pub mod provider;
pub mod providers;

pub use provider::{LanguageModel, LlmError};
pub use providers::ollama::OllamaModel;
