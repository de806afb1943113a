//! Labeled training corpora.
//!
//! A corpus is a `text,label` table: a header row, then one sample per line
//! split at the last comma. Rows without a comma or with an empty side are
//! skipped and counted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VerityError};

/// Sample corpus compiled into the crate.
const BUILTIN_CORPUS: &str = include_str!("../../data/fake_news_samples.csv");

/// One labeled sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledText {
    pub text: String,
    pub label: String,
}

impl LabeledText {
    pub fn new<T: Into<String>, L: Into<String>>(text: T, label: L) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
        }
    }
}

/// Parsed corpus plus the number of rows that were skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorpusLoad {
    pub samples: Vec<LabeledText>,
    pub skipped: usize,
}

impl CorpusLoad {
    /// Number of samples per label, in label order.
    pub fn label_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for sample in &self.samples {
            *counts.entry(sample.label.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Fail unless the corpus can train a classifier.
    pub fn ensure_trainable(&self) -> Result<()> {
        if self.samples.is_empty() {
            return Err(VerityError::configuration(
                "corpus contains no usable rows",
            ));
        }
        let labels = self.label_counts().len();
        if labels < 2 {
            return Err(VerityError::configuration(format!(
                "corpus needs at least 2 distinct labels, found {labels}"
            )));
        }
        Ok(())
    }
}

/// Parse `text,label` rows. The first line is a header and is ignored.
pub fn parse_corpus(content: &str) -> CorpusLoad {
    let mut load = CorpusLoad::default();
    for line in content.lines().skip(1) {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        match line.rsplit_once(',') {
            Some((text, label)) if !text.trim().is_empty() && !label.trim().is_empty() => {
                load.samples.push(LabeledText::new(text.trim(), label.trim()));
            }
            _ => load.skipped += 1,
        }
    }
    load
}

/// Where training samples come from.
pub trait CorpusSource: Send + Sync {
    /// Read and parse the corpus.
    fn load(&self) -> Result<CorpusLoad>;

    /// Human-readable origin, for logs.
    fn describe(&self) -> String;
}

/// The sample corpus shipped with the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCorpus;

impl CorpusSource for BuiltinCorpus {
    fn load(&self) -> Result<CorpusLoad> {
        Ok(parse_corpus(BUILTIN_CORPUS))
    }

    fn describe(&self) -> String {
        "built-in sample corpus".to_string()
    }
}

/// A corpus read from a CSV file.
#[derive(Debug, Clone)]
pub struct CsvFileCorpus {
    path: PathBuf,
}

impl CsvFileCorpus {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CorpusSource for CsvFileCorpus {
    fn load(&self) -> Result<CorpusLoad> {
        let content = std::fs::read_to_string(&self.path)?;
        Ok(parse_corpus(&content))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Samples in memory, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCorpus {
    samples: Vec<LabeledText>,
}

impl InMemoryCorpus {
    pub fn new(samples: Vec<LabeledText>) -> Self {
        Self { samples }
    }
}

impl CorpusSource for InMemoryCorpus {
    fn load(&self) -> Result<CorpusLoad> {
        Ok(CorpusLoad {
            samples: self.samples.clone(),
            skipped: 0,
        })
    }

    fn describe(&self) -> String {
        format!("in-memory corpus ({} samples)", self.samples.len())
    }
}

/// Training and validation partitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorpusSplit {
    pub train: Vec<LabeledText>,
    pub validation: Vec<LabeledText>,
}

/// Split each label's samples independently, holding out `test_size` of
/// them (rounded) for validation.
///
/// Every label keeps at least one training sample. Both partitions preserve
/// corpus order. The result depends only on the samples and `seed`.
pub fn stratified_split(samples: &[LabeledText], test_size: f64, seed: u64) -> CorpusSplit {
    let mut by_label: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (idx, sample) in samples.iter().enumerate() {
        by_label.entry(sample.label.as_str()).or_default().push(idx);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut held_out = vec![false; samples.len()];
    for indices in by_label.values_mut() {
        indices.shuffle(&mut rng);
        let n_test = ((indices.len() as f64) * test_size).round() as usize;
        let n_test = n_test.min(indices.len().saturating_sub(1));
        for &idx in indices.iter().take(n_test) {
            held_out[idx] = true;
        }
    }

    let mut split = CorpusSplit::default();
    for (sample, held) in samples.iter().zip(held_out) {
        if held {
            split.validation.push(sample.clone());
        } else {
            split.train.push(sample.clone());
        }
    }
    split
}
