//! Engine configuration.
//!
//! Every section has a `Default` matching the reference feature scheme, and
//! every field is optional when loading from JSON, so a config file only has
//! to mention what it changes:
//!
//! ```
//! use verity::config::VerityConfig;
//!
//! let config: VerityConfig =
//!     serde_json::from_str(r#"{ "explain": { "max_highlights": 5 } }"#).unwrap();
//! assert_eq!(config.explain.max_highlights, 5);
//! assert_eq!(config.explain.summary_tokens, 3);
//! assert_eq!(config.vectorizer.max_ngram, 2);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VerityError};

/// Top-level configuration for the classification engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerityConfig {
    /// Feature extraction settings.
    pub vectorizer: VectorizerConfig,
    /// Classifier fitting and bootstrap split settings.
    pub training: TrainingConfig,
    /// Attribution output settings.
    pub explain: ExplainConfig,
    /// Fit-or-load settings.
    pub bootstrap: BootstrapConfig,
}

impl VerityConfig {
    /// Load a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: VerityConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.vectorizer.max_ngram == 0 {
            return Err(VerityError::configuration("vectorizer.max_ngram must be >= 1"));
        }
        if self.vectorizer.min_df == 0 {
            return Err(VerityError::configuration("vectorizer.min_df must be >= 1"));
        }
        if self.vectorizer.max_features == Some(0) {
            return Err(VerityError::configuration(
                "vectorizer.max_features must be >= 1 when set",
            ));
        }
        if !(self.training.test_size > 0.0 && self.training.test_size < 1.0) {
            return Err(VerityError::configuration(
                "training.test_size must be in (0, 1)",
            ));
        }
        if self.training.c <= 0.0 {
            return Err(VerityError::configuration("training.c must be positive"));
        }
        if self.training.learning_rate <= 0.0 {
            return Err(VerityError::configuration(
                "training.learning_rate must be positive",
            ));
        }
        Ok(())
    }
}

/// TF-IDF vectorizer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerConfig {
    /// Lowercase text before tokenizing.
    pub lowercase: bool,
    /// Longest word n-gram counted as a feature.
    pub max_ngram: usize,
    /// Cap on vocabulary size. `None` keeps every term.
    pub max_features: Option<usize>,
    /// Minimum number of documents a term must appear in.
    pub min_df: usize,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            max_ngram: 2,
            max_features: Some(30_000),
            min_df: 1,
        }
    }
}

/// Logistic regression and train/validation split settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Fraction of each label held out for validation.
    pub test_size: f64,
    /// Seed for the train/validation shuffle.
    pub seed: u64,
    /// Maximum gradient descent iterations.
    pub max_iter: usize,
    /// Inverse L2 regularization strength.
    pub c: f64,
    /// Gradient descent step size.
    pub learning_rate: f64,
    /// Stop once every gradient component is smaller than this.
    pub tol: f64,
    /// Weight samples inversely to their class frequency.
    pub balanced: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_size: 0.25,
            seed: 42,
            max_iter: 1000,
            c: 1.0,
            learning_rate: 1.0,
            tol: 1e-4,
            balanced: true,
        }
    }
}

/// Attribution output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainConfig {
    /// Maximum number of ranked token attributions returned.
    pub max_highlights: usize,
    /// Number of token strings named in the short summary.
    pub summary_tokens: usize,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            max_highlights: 20,
            summary_tokens: 3,
        }
    }
}

/// Fit-or-load settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Directory holding persisted model artifacts.
    pub artifact_dir: PathBuf,
    /// File name of the model artifact inside `artifact_dir`.
    pub artifact_name: String,
    /// JSON Lines log of label feedback, kept beside the artifact.
    pub feedback_name: String,
    /// Wait before the first retry after a failed initialization.
    pub retry_backoff_ms: u64,
    /// Upper bound for the doubling retry wait.
    pub max_retry_backoff_ms: u64,
}

impl BootstrapConfig {
    /// Backoff after `failures` consecutive failed attempts.
    pub fn backoff_after(&self, failures: u32) -> Duration {
        let shift = failures.saturating_sub(1).min(16);
        let millis = self
            .retry_backoff_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_retry_backoff_ms);
        Duration::from_millis(millis)
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("./artifacts"),
            artifact_name: "text_classifier.vrty".to_string(),
            feedback_name: "feedback.jsonl".to_string(),
            retry_backoff_ms: 1_000,
            max_retry_backoff_ms: 60_000,
        }
    }
}
