//! Query orchestrator: owns the one-time build and drives each query through
//! retrieval, prompt composition and generation.
//!
//! Lifecycle: `Uninitialized -> Building -> Ready | Error`. Queries are refused
//! unless the state is `Ready`. A failed query never changes the state.
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use regdoc_core::config::Settings;
use regdoc_core::error::{Error, LifecycleState, Result, Stage};
use regdoc_core::loader::DocumentLoader;
use regdoc_core::traits::Embedder;
use regdoc_core::types::{Answer, CaseFields, PromptOverflow, QueryMode, SourceRef};
use regdoc_llm::LanguageModel;
use regdoc_vector::{mmr, save_snapshot, EmbeddingIndex, MmrParams};

use crate::build::{build_index, BuildReport};
use crate::cancel::CancelToken;
use crate::case::compose_case_question;
use crate::prompt::PromptComposer;

/// Per-query knobs.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub cancel: Option<CancelToken>,
}

struct Pipeline {
    index: EmbeddingIndex,
    report: BuildReport,
}

enum Slot {
    Uninitialized,
    Building,
    Ready(Arc<Pipeline>),
    Failed(String),
}

/// Everything a build needs, owned so it can outlive the call that started it.
struct BuildJob {
    settings: Settings,
    base: PathBuf,
    loader: Arc<DocumentLoader>,
    embedder: Arc<dyn Embedder>,
    slot: Arc<RwLock<Slot>>,
}

impl BuildJob {
    async fn run(self) -> Result<BuildReport> {
        let (settings, base, loader, embedder) =
            (self.settings.clone(), self.base.clone(), self.loader.clone(), self.embedder.clone());
        let built = tokio::task::spawn_blocking(move || build_index(&settings, &base, &loader, embedder.as_ref()))
            .await
            .map_err(|e| Error::Build(format!("build worker failed: {}", e)))
            .and_then(|r| r);

        let (index, mut report) = match built {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, "index build failed");
                *self.slot.write() = Slot::Failed(e.to_string());
                return Err(e);
            }
        };

        if let Some(dir) = self.settings.persist_dir(&self.base) {
            match save_snapshot(&index, &dir, &self.settings.index.table).await {
                Ok(info) => report.snapshot = Some(info),
                Err(e) => {
                    let e = Error::external(Stage::Persistence, e);
                    warn!(error = %e, "index snapshot not written; continuing with in-memory index");
                    report.persist_error = Some(e.to_string());
                }
            }
        }

        info!(
            documents = report.documents,
            chunks = report.chunks,
            failed_files = report.failures.len(),
            "orchestrator ready"
        );
        *self.slot.write() = Slot::Ready(Arc::new(Pipeline { index, report: report.clone() }));
        Ok(report)
    }
}

pub struct QueryOrchestrator {
    settings: Settings,
    base_dir: PathBuf,
    loader: Arc<DocumentLoader>,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn LanguageModel>,
    composer: PromptComposer,
    slot: Arc<RwLock<Slot>>,
    init_lock: Arc<Mutex<()>>,
}

impl QueryOrchestrator {
    /// Relative paths in `settings` resolve against `base_dir`.
    pub fn new(
        settings: Settings,
        base_dir: impl Into<PathBuf>,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn LanguageModel>,
    ) -> Result<Self> {
        settings.validate()?;
        let base_dir = base_dir.into();
        let composer = PromptComposer::from_settings(&settings.prompt, &settings.llm, &base_dir)?;
        Ok(Self {
            settings,
            base_dir,
            loader: Arc::new(DocumentLoader::new()),
            embedder,
            llm,
            composer,
            slot: Arc::new(RwLock::new(Slot::Uninitialized)),
            init_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Replace the default PDF + plain-text loader.
    pub fn with_loader(mut self, loader: DocumentLoader) -> Self {
        self.loader = Arc::new(loader);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> LifecycleState {
        match &*self.slot.read() {
            Slot::Uninitialized => LifecycleState::Uninitialized,
            Slot::Building => LifecycleState::Building,
            Slot::Ready(_) => LifecycleState::Ready,
            Slot::Failed(_) => LifecycleState::Error,
        }
    }

    /// Reason of the last failed build, if the state is `Error`.
    pub fn last_error(&self) -> Option<String> {
        match &*self.slot.read() {
            Slot::Failed(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// Build the index once. Concurrent callers wait for the first build and get its
    /// report; calling again when `Ready` returns the existing report without work.
    /// From `Error` this builds again.
    pub async fn initialize(&self) -> Result<BuildReport> {
        let guard = self.init_lock.clone().lock_owned().await;
        if let Some(ready) = self.ready_pipeline() {
            debug!("initialize called on a ready orchestrator");
            return Ok(ready.report.clone());
        }
        self.spawn_build(guard).await
    }

    /// Build a fresh index and swap it in. Queries keep using the previous index
    /// until the new one is ready; on failure the state becomes `Error`.
    pub async fn rebuild(&self) -> Result<BuildReport> {
        let guard = self.init_lock.clone().lock_owned().await;
        self.spawn_build(guard).await
    }

    /// The build runs in its own task that holds the init lock until the slot is
    /// updated. Dropping the caller's future leaves it running, and the next
    /// `initialize` waits for it instead of starting another one.
    async fn spawn_build(&self, guard: OwnedMutexGuard<()>) -> Result<BuildReport> {
        {
            let mut slot = self.slot.write();
            if !matches!(*slot, Slot::Ready(_)) {
                *slot = Slot::Building;
            }
        }
        let job = BuildJob {
            settings: self.settings.clone(),
            base: self.base_dir.clone(),
            loader: self.loader.clone(),
            embedder: self.embedder.clone(),
            slot: self.slot.clone(),
        };
        let slot = self.slot.clone();
        tokio::spawn(async move {
            let result = job.run().await;
            drop(guard);
            result
        })
        .await
        .unwrap_or_else(|e| {
            let e = Error::Build(format!("build task failed: {}", e));
            *slot.write() = Slot::Failed(e.to_string());
            Err(e)
        })
    }

    fn ready_pipeline(&self) -> Option<Arc<Pipeline>> {
        match &*self.slot.read() {
            Slot::Ready(p) => Some(p.clone()),
            _ => None,
        }
    }

    pub async fn query(&self, question: &str) -> Result<Answer> {
        self.query_with(question, &QueryOptions::default()).await
    }

    pub async fn query_with(&self, question: &str, opts: &QueryOptions) -> Result<Answer> {
        self.run_query(question, QueryMode::Plain, opts).await
    }

    pub async fn analyze_case(&self, case: &CaseFields) -> Result<Answer> {
        self.analyze_case_with(case, &QueryOptions::default()).await
    }

    pub async fn analyze_case_with(&self, case: &CaseFields, opts: &QueryOptions) -> Result<Answer> {
        let question = compose_case_question(case);
        self.run_query(&question, QueryMode::CaseAnalysis, opts).await
    }

    async fn run_query(&self, question: &str, mode: QueryMode, opts: &QueryOptions) -> Result<Answer> {
        let pipeline = self.ready_pipeline().ok_or_else(|| Error::Uninitialized { state: self.state() })?;
        if opts.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
            return Err(Error::Cancelled);
        }

        let embedder = self.embedder.clone();
        let text = question.to_string();
        let query_vec = tokio::task::spawn_blocking(move || embedder.embed_one(&text))
            .await
            .map_err(|e| Error::external(Stage::Embedding, e))?
            .map_err(|e| Error::external(Stage::Embedding, e))?;

        let r = &self.settings.retrieval;
        let retrieved = mmr::select(&pipeline.index, &query_vec, MmrParams::new(r.k, r.fetch_k, r.lambda));
        let composed = self.composer.compose(&retrieved, question);
        if composed.dropped > 0 {
            warn!(
                dropped = composed.dropped,
                kept = composed.included,
                budget = self.composer.budget_tokens(),
                "context truncated to fit the model window"
            );
        }
        debug!(model = self.llm.model_id(), tokens = composed.estimated_tokens, "generating answer");

        let text = self.generate(&composed.text, opts).await?;

        let sources: Vec<SourceRef> = retrieved[..composed.included].iter().map(SourceRef::from).collect();
        Ok(Answer {
            text,
            source_count: sources.len(),
            sources,
            mode,
            truncation: (composed.dropped > 0).then_some(PromptOverflow { dropped_chunks: composed.dropped }),
        })
    }

    /// One LLM call, bounded by the request timeout and raced against cancellation.
    /// Never retried.
    async fn generate(&self, prompt: &str, opts: &QueryOptions) -> Result<String> {
        let after = Duration::from_millis(self.settings.llm.request_timeout_ms);
        let call = tokio::time::timeout(after, self.llm.generate(prompt));
        let outcome = match &opts.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(Error::Cancelled),
                    r = call => r,
                }
            }
            None => call.await,
        };
        match outcome {
            Err(_) => Err(Error::Timeout { stage: Stage::Generation, after }),
            Ok(Err(e)) => Err(Error::external(Stage::Generation, e)),
            Ok(Ok(text)) => Ok(text),
        }
    }
}
