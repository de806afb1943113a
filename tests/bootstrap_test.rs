use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use tempfile::TempDir;

use verity::config::{BootstrapConfig, VerityConfig};
use verity::error::{Result, VerityError};
use verity::ml::{
    BuiltinCorpus, Bootstrapper, CorpusLoad, CorpusSource, EngineHandle, InMemoryCorpus,
    LabeledText, MODEL_VERSION, ModelArtifact, TextClassifier,
};
use verity::storage::{ArtifactStore, FileArtifactStore, MemoryArtifactStore};

const ARTIFACT: &str = "text_classifier.vrty";

/// Corpus source that counts how often it is read.
#[derive(Debug)]
struct CountingCorpus {
    inner: InMemoryCorpus,
    loads: Arc<AtomicUsize>,
}

impl CorpusSource for CountingCorpus {
    fn load(&self) -> Result<CorpusLoad> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        // widen the window in which concurrent callers could race
        thread::sleep(Duration::from_millis(20));
        self.inner.load()
    }

    fn describe(&self) -> String {
        "counting corpus".to_string()
    }
}

/// Store that counts reads and can refuse writes.
#[derive(Debug, Default)]
struct CountingStore {
    inner: MemoryArtifactStore,
    reads: AtomicUsize,
    read_only: bool,
}

impl ArtifactStore for CountingStore {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(name)
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        if self.read_only {
            return Err(VerityError::storage("store is read-only"));
        }
        self.inner.write(name, bytes)
    }

    fn exists(&self, name: &str) -> bool {
        self.inner.exists(name)
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.inner.remove(name)
    }
}

fn samples() -> Vec<LabeledText> {
    let mut samples = Vec::new();
    for text in [
        "city council approves new budget",
        "mayor signs new budget bill",
        "senate passes transit bill",
        "court upholds zoning ruling",
    ] {
        samples.push(LabeledText::new(text, "real"));
    }
    for text in [
        "aliens sighted in parking lot",
        "alien spaceship lands downtown",
        "miracle cure hidden by insiders",
        "shocking secret weather machine",
    ] {
        samples.push(LabeledText::new(text, "fake"));
    }
    samples
}

fn counting_corpus(samples: Vec<LabeledText>) -> (Arc<CountingCorpus>, Arc<AtomicUsize>) {
    let loads = Arc::new(AtomicUsize::new(0));
    let corpus = Arc::new(CountingCorpus {
        inner: InMemoryCorpus::new(samples),
        loads: Arc::clone(&loads),
    });
    (corpus, loads)
}

#[test]
fn concurrent_first_access_initializes_once() -> Result<()> {
    let (corpus, loads) = counting_corpus(samples());
    let store = Arc::new(CountingStore::default());
    let handle = Arc::new(EngineHandle::new(Bootstrapper::new(
        VerityConfig::default(),
        store.clone(),
        corpus,
    )));

    let threads: Vec<_> = (0..16)
        .map(|_| {
            let handle = Arc::clone(&handle);
            thread::spawn(move || handle.ensure_ready())
        })
        .collect();
    let engines: Vec<Arc<TextClassifier>> = threads
        .into_iter()
        .map(|t| t.join().unwrap())
        .collect::<Result<_>>()?;

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(store.reads.load(Ordering::SeqCst), 1);
    assert!(engines.iter().all(|e| Arc::ptr_eq(e, &engines[0])));
    Ok(())
}

#[test]
fn compatible_artifact_is_loaded_without_training() -> Result<()> {
    let store = MemoryArtifactStore::new();
    let trained = TextClassifier::fit(&samples(), &VerityConfig::default())?;
    store.write(ARTIFACT, &ModelArtifact::from_classifier(&trained).encode()?)?;

    let (corpus, loads) = counting_corpus(samples());
    let handle = EngineHandle::new(Bootstrapper::new(
        VerityConfig::default(),
        Arc::new(store),
        corpus,
    ));
    let engine = handle.ensure_ready()?;

    assert_eq!(loads.load(Ordering::SeqCst), 0);
    assert_eq!(engine.trained_at(), trained.trained_at());
    assert_eq!(engine.model(), trained.model());
    Ok(())
}

#[test]
fn foreign_model_version_is_discarded_and_retrained() -> Result<()> {
    let store = MemoryArtifactStore::new();
    let trained = TextClassifier::fit(&samples(), &VerityConfig::default())?;
    let mut artifact = ModelArtifact::from_classifier(&trained);
    artifact.model_version = "tfidf-logreg-v0".to_string();
    store.write(ARTIFACT, &artifact.encode()?)?;

    let handle = EngineHandle::new(Bootstrapper::new(
        VerityConfig::default(),
        Arc::new(store.clone()),
        Arc::new(BuiltinCorpus),
    ));
    let engine = handle.ensure_ready()?;
    assert_eq!(engine.classes(), &["fake".to_string(), "real".to_string()]);

    // the stale artifact was replaced by the retrained model
    let bytes = store.read(ARTIFACT)?.unwrap();
    let replaced = ModelArtifact::decode(&bytes)?;
    assert_eq!(replaced.model_version, MODEL_VERSION);
    assert_eq!(replaced.trained_at, engine.trained_at());
    Ok(())
}

#[test]
fn corrupted_artifact_is_discarded_and_retrained() -> Result<()> {
    let store = MemoryArtifactStore::new();
    let trained = TextClassifier::fit(&samples(), &VerityConfig::default())?;
    let mut bytes = ModelArtifact::from_classifier(&trained).encode()?;
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0x55;
    store.write(ARTIFACT, &bytes)?;

    let (corpus, loads) = counting_corpus(samples());
    let handle = EngineHandle::new(Bootstrapper::new(
        VerityConfig::default(),
        Arc::new(store.clone()),
        corpus,
    ));
    handle.ensure_ready()?;

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(ModelArtifact::decode(&store.read(ARTIFACT)?.unwrap()).is_ok());
    Ok(())
}

#[test]
fn misshapen_artifact_weights_are_discarded_and_retrained() -> Result<()> {
    let store = MemoryArtifactStore::new();
    let trained = TextClassifier::fit(&samples(), &VerityConfig::default())?;
    let mut artifact = ModelArtifact::from_classifier(&trained);
    artifact.classifier = serde_json::from_value(serde_json::json!({
        "classes": ["fake", "real"],
        "coef": [],
        "intercept": [],
        "n_features": trained.vectorizer().vocabulary_size(),
        "n_iter": 0,
    }))
    .unwrap();
    store.write(ARTIFACT, &artifact.encode()?)?;

    let (corpus, loads) = counting_corpus(samples());
    let handle = EngineHandle::new(Bootstrapper::new(
        VerityConfig::default(),
        Arc::new(store.clone()),
        corpus,
    ));
    let engine = handle.ensure_ready()?;

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(engine.predict("council approves budget bill")?.label, "real");
    let replaced = ModelArtifact::decode(&store.read(ARTIFACT)?.unwrap())?;
    assert!(replaced.into_classifier(Default::default()).is_ok());
    Ok(())
}

#[test]
fn persist_failure_does_not_fail_initialization() -> Result<()> {
    let store = Arc::new(CountingStore {
        read_only: true,
        ..Default::default()
    });
    let (corpus, _) = counting_corpus(samples());
    let handle = EngineHandle::new(Bootstrapper::new(
        VerityConfig::default(),
        store.clone(),
        corpus,
    ));

    let engine = handle.ensure_ready()?;
    assert_eq!(engine.predict("council approves budget bill")?.label, "real");
    assert!(!store.exists(ARTIFACT));
    Ok(())
}

#[test]
fn unusable_corpus_is_a_configuration_error() {
    let single_label = vec![
        LabeledText::new("council approves budget", "real"),
        LabeledText::new("mayor signs bill", "real"),
    ];
    for corpus in [InMemoryCorpus::default(), InMemoryCorpus::new(single_label)] {
        let handle = EngineHandle::new(Bootstrapper::new(
            VerityConfig::default(),
            Arc::new(MemoryArtifactStore::new()),
            Arc::new(corpus),
        ));
        assert!(matches!(
            handle.ensure_ready(),
            Err(VerityError::Configuration(_))
        ));
        assert!(handle.get().is_none());
    }
}

#[test]
fn failures_are_replayed_until_backoff_elapses() {
    let (corpus, loads) = counting_corpus(Vec::new());
    let config = VerityConfig {
        bootstrap: BootstrapConfig {
            retry_backoff_ms: 200,
            max_retry_backoff_ms: 200,
            ..Default::default()
        },
        ..Default::default()
    };
    let handle = EngineHandle::new(Bootstrapper::new(
        config,
        Arc::new(MemoryArtifactStore::new()),
        corpus,
    ));

    let first = handle.ensure_ready().unwrap_err();
    let replayed = handle.ensure_ready().unwrap_err();
    assert!(replayed.is_configuration());
    assert_eq!(first.to_string(), replayed.to_string());
    assert_eq!(loads.load(Ordering::SeqCst), 1);

    thread::sleep(Duration::from_millis(250));
    assert!(handle.ensure_ready().is_err());
    assert_eq!(loads.load(Ordering::SeqCst), 2);
}

#[test]
fn file_store_round_trip_across_handles() -> Result<()> {
    let temp_dir = TempDir::new().unwrap();
    let config = VerityConfig {
        bootstrap: BootstrapConfig {
            artifact_dir: temp_dir.path().join("models"),
            ..Default::default()
        },
        ..Default::default()
    };

    let first = EngineHandle::from_config(config.clone())?.ensure_ready()?;
    let path = temp_dir.path().join("models").join(ARTIFACT);
    assert!(path.is_file());

    let (corpus, loads) = counting_corpus(samples());
    let store = FileArtifactStore::new(temp_dir.path().join("models"))?;
    let second = EngineHandle::new(Bootstrapper::new(config, Arc::new(store), corpus))
        .ensure_ready()?;

    assert_eq!(loads.load(Ordering::SeqCst), 0);
    assert_eq!(first.model(), second.model());
    assert_eq!(first.vectorizer().state(), second.vectorizer().state());
    Ok(())
}
