use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::types::LoadFailure;

/// Lifecycle of a query orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Building,
    Ready,
    Error,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Building => "building",
            LifecycleState::Ready => "ready",
            LifecycleState::Error => "error",
        };
        f.write_str(s)
    }
}

/// External dependency a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Embedding,
    Generation,
    Persistence,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Embedding => "embedding service",
            Stage::Generation => "language model",
            Stage::Persistence => "index store",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("no documents could be loaded from {}: {} file(s) failed, {skipped} unsupported", path.display(), failures.len())]
    CorpusEmpty { path: PathBuf, failures: Vec<LoadFailure>, skipped: usize },

    #[error("corpus directory not found: {}", .0.display())]
    CorpusNotFound(PathBuf),

    #[error("system is not ready (state: {state}); call initialize() first")]
    Uninitialized { state: LifecycleState },

    #[error("{stage} failed: {source}")]
    ExternalService {
        stage: Stage,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{stage} did not answer within {after:?}")]
    Timeout { stage: Stage, after: Duration },

    #[error("query cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("index build failed: {0}")]
    Build(String),
}

impl Error {
    pub fn external(stage: Stage, err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::ExternalService { stage, source: err.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
