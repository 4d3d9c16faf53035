pub mod chunker;
pub mod config;
pub mod error;
pub mod loader;
pub mod traits;
pub mod types;

pub use chunker::Chunker;
pub use config::{expand_path, resolve_with_base, Config, Settings};
pub use error::{Error, LifecycleState, Result, Stage};
pub use loader::DocumentLoader;
pub use traits::{DocumentParser, Embedder};
