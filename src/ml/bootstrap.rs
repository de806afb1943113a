//! Fit-or-load initialization of the shared classification engine.
//!
//! [`Bootstrapper`] performs one attempt: load a compatible artifact from the
//! store, or train on the corpus and persist the result. [`EngineHandle`]
//! runs that attempt at most once per handle, no matter how many threads ask
//! for the engine concurrently, and gates retries after a failure behind an
//! exponential backoff window.

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use parking_lot::Mutex;

use crate::config::VerityConfig;
use crate::error::{Result, VerityError};
use crate::ml::artifact::ModelArtifact;
use crate::ml::classifier::TextClassifier;
use crate::ml::corpus::{BuiltinCorpus, CorpusSource, stratified_split};
use crate::ml::report::{self, ClassificationReport};
use crate::storage::{ArtifactStore, FileArtifactStore};

/// Result of a training run.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub classifier: Arc<TextClassifier>,
    /// Validation metrics, when the validation partition was usable.
    pub report: Option<ClassificationReport>,
    pub train_size: usize,
    pub validation_size: usize,
    /// Malformed corpus rows that were ignored.
    pub skipped: usize,
}

/// Loads or trains a [`TextClassifier`].
pub struct Bootstrapper {
    config: VerityConfig,
    store: Arc<dyn ArtifactStore>,
    corpus: Arc<dyn CorpusSource>,
}

impl std::fmt::Debug for Bootstrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bootstrapper")
            .field("artifact", &self.config.bootstrap.artifact_name)
            .field("store", &self.store)
            .field("corpus", &self.corpus.describe())
            .finish()
    }
}

impl Bootstrapper {
    pub fn new(
        config: VerityConfig,
        store: Arc<dyn ArtifactStore>,
        corpus: Arc<dyn CorpusSource>,
    ) -> Self {
        Self {
            config,
            store,
            corpus,
        }
    }

    /// File-backed store under `bootstrap.artifact_dir` and the built-in
    /// corpus.
    pub fn from_config(config: VerityConfig) -> Result<Self> {
        let store = FileArtifactStore::new(&config.bootstrap.artifact_dir)?;
        Ok(Self::new(config, Arc::new(store), Arc::new(BuiltinCorpus)))
    }

    pub fn config(&self) -> &VerityConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    fn artifact_name(&self) -> &str {
        &self.config.bootstrap.artifact_name
    }

    /// Load the stored artifact. `Ok(None)` when there is none; a
    /// configuration error when it exists but cannot be served.
    pub fn load_artifact(&self) -> Result<Option<TextClassifier>> {
        let Some(bytes) = self.store.read(self.artifact_name())? else {
            return Ok(None);
        };
        let artifact = ModelArtifact::decode(&bytes)?;
        let classifier = artifact.into_classifier(self.config.explain.clone())?;
        Ok(Some(classifier))
    }

    /// Split the corpus, fit on the training partition and score the
    /// validation partition. Nothing is persisted.
    pub fn train(&self) -> Result<TrainingOutcome> {
        let load = self.corpus.load()?;
        if load.skipped > 0 {
            log::debug!(
                "skipped {} malformed rows from {}",
                load.skipped,
                self.corpus.describe()
            );
        }
        load.ensure_trainable()?;

        let training = &self.config.training;
        let split = stratified_split(&load.samples, training.test_size, training.seed);
        let classifier = TextClassifier::fit(&split.train, &self.config)?;

        let report = match report::evaluate(&classifier, &split.validation) {
            Ok(report) => {
                log::debug!("validation report:\n{}", report);
                Some(report)
            }
            Err(e) => {
                log::debug!("validation report unavailable: {}", e);
                None
            }
        };

        Ok(TrainingOutcome {
            classifier: Arc::new(classifier),
            report,
            train_size: split.train.len(),
            validation_size: split.validation.len(),
            skipped: load.skipped,
        })
    }

    /// Write `classifier` to the store, replacing any previous artifact.
    pub fn persist(&self, classifier: &TextClassifier) -> Result<()> {
        let bytes = ModelArtifact::from_classifier(classifier).encode()?;
        self.store.write(self.artifact_name(), &bytes)?;
        log::info!(
            "persisted model artifact {} ({} bytes)",
            self.artifact_name(),
            bytes.len()
        );
        Ok(())
    }

    /// One fit-or-load attempt.
    ///
    /// Incompatible artifacts are discarded and replaced by a freshly trained
    /// model. Failing to persist that model is logged, not returned.
    pub fn load_or_train(&self) -> Result<Arc<TextClassifier>> {
        match self.load_artifact() {
            Ok(Some(classifier)) => {
                log::info!(
                    "loaded model artifact {} trained at {}",
                    self.artifact_name(),
                    classifier.trained_at()
                );
                return Ok(Arc::new(classifier));
            }
            Ok(None) => {
                log::info!(
                    "no model artifact {}, training from {}",
                    self.artifact_name(),
                    self.corpus.describe()
                );
            }
            Err(e) => {
                log::warn!(
                    "discarding model artifact {}: {}",
                    self.artifact_name(),
                    e
                );
                if e.is_configuration() {
                    if let Err(e) = self.store.remove(self.artifact_name()) {
                        log::warn!("failed to remove model artifact: {}", e);
                    }
                }
            }
        }

        let outcome = self.train()?;
        if let Err(e) = self.persist(&outcome.classifier) {
            log::warn!(
                "failed to persist model artifact {}: {}",
                self.artifact_name(),
                e
            );
        }
        Ok(outcome.classifier)
    }
}

struct FailureRecord {
    error: VerityError,
    at: Instant,
}

#[derive(Default)]
struct InitState {
    failures: u32,
    last_failure: Option<FailureRecord>,
}

/// Lazily initialized, shared classification engine.
///
/// The first successful [`ensure_ready`](Self::ensure_ready) call fixes the
/// engine for the lifetime of the handle; every later call returns the same
/// `Arc` without locking.
pub struct EngineHandle {
    engine: OnceLock<Arc<TextClassifier>>,
    state: Mutex<InitState>,
    bootstrapper: Bootstrapper,
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("ready", &self.engine.get().is_some())
            .field("bootstrapper", &self.bootstrapper)
            .finish()
    }
}

impl EngineHandle {
    pub fn new(bootstrapper: Bootstrapper) -> Self {
        Self {
            engine: OnceLock::new(),
            state: Mutex::new(InitState::default()),
            bootstrapper,
        }
    }

    /// Handle over [`Bootstrapper::from_config`].
    pub fn from_config(config: VerityConfig) -> Result<Self> {
        Ok(Self::new(Bootstrapper::from_config(config)?))
    }

    /// The engine, fitting or loading it on first use.
    ///
    /// Concurrent first callers block until the single attempt finishes. A
    /// failed attempt is returned to its caller and to every caller arriving
    /// before the retry backoff has elapsed.
    pub fn ensure_ready(&self) -> Result<Arc<TextClassifier>> {
        if let Some(engine) = self.engine.get() {
            return Ok(Arc::clone(engine));
        }

        let mut state = self.state.lock();
        if let Some(engine) = self.engine.get() {
            return Ok(Arc::clone(engine));
        }

        if let Some(failure) = &state.last_failure {
            let backoff = self.bootstrapper.config.bootstrap.backoff_after(state.failures);
            if failure.at.elapsed() < backoff {
                return Err(failure.error.replicate());
            }
        }

        match self.bootstrapper.load_or_train() {
            Ok(engine) => {
                let engine = Arc::clone(self.engine.get_or_init(|| engine));
                state.failures = 0;
                state.last_failure = None;
                Ok(engine)
            }
            Err(error) => {
                state.failures += 1;
                log::error!(
                    "engine initialization failed (attempt {}): {}",
                    state.failures,
                    error
                );
                let returned = error.replicate();
                state.last_failure = Some(FailureRecord {
                    error,
                    at: Instant::now(),
                });
                Err(returned)
            }
        }
    }

    /// The engine if it is already initialized.
    pub fn get(&self) -> Option<Arc<TextClassifier>> {
        self.engine.get().cloned()
    }

    /// Train from the corpus regardless of any stored artifact and overwrite
    /// the artifact.
    ///
    /// Unlike initialization, a persist failure is returned. The new engine
    /// becomes this handle's engine only if none was initialized yet.
    pub fn force_retrain(&self) -> Result<TrainingOutcome> {
        let _state = self.state.lock();
        let outcome = self.bootstrapper.train()?;
        self.bootstrapper.persist(&outcome.classifier)?;
        let _ = self.engine.set(Arc::clone(&outcome.classifier));
        Ok(outcome)
    }

    pub fn bootstrapper(&self) -> &Bootstrapper {
        &self.bootstrapper
    }
}
