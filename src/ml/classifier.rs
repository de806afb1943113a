//! A fitted vectorizer and classifier pair.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{ExplainConfig, VerityConfig};
use crate::error::{Result, VerityError};
use crate::ml::attribution::{self, TokenAttribution};
use crate::ml::corpus::LabeledText;
use crate::ml::logistic::LogisticRegression;
use crate::ml::sparse::SparseVector;
use crate::ml::tfidf::TfIdfVectorizer;

/// Outcome of classifying one text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub confidence: f64,
    /// Probability per class, in class order.
    pub probabilities: Vec<(String, f64)>,
    /// Short human-readable summaries; empty when no token was attributed.
    pub reasons: Vec<String>,
    /// Ranked token attributions.
    pub highlights: Vec<TokenAttribution>,
    /// Wall-clock time spent in transform, scoring and attribution.
    pub latency: Duration,
}

/// Text classification engine.
///
/// Immutable once built; share it through an `Arc`.
pub struct TextClassifier {
    vectorizer: TfIdfVectorizer,
    model: LogisticRegression,
    explain: ExplainConfig,
    trained_at: DateTime<Utc>,
}

impl std::fmt::Debug for TextClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextClassifier")
            .field("classes", &self.model.classes())
            .field("vocabulary_size", &self.vectorizer.vocabulary_size())
            .field("trained_at", &self.trained_at)
            .finish()
    }
}

impl TextClassifier {
    /// Fit the vectorizer, then the classifier, on labeled samples.
    pub fn fit(samples: &[LabeledText], config: &VerityConfig) -> Result<Self> {
        if samples.is_empty() {
            return Err(VerityError::configuration("training corpus is empty"));
        }
        let texts: Vec<String> = samples.iter().map(|s| s.text.clone()).collect();
        let labels: Vec<String> = samples.iter().map(|s| s.label.clone()).collect();

        let mut vectorizer = TfIdfVectorizer::new(config.vectorizer.clone())?;
        vectorizer.fit(&texts)?;
        let vectors = vectorizer.transform_batch(&texts)?;
        let model = LogisticRegression::fit(
            &vectors,
            &labels,
            vectorizer.vocabulary_size(),
            &config.training,
        )?;

        log::info!(
            "fitted classifier on {} samples: {} features, classes {:?}, {} iterations",
            samples.len(),
            vectorizer.vocabulary_size(),
            model.classes(),
            model.n_iter()
        );

        Ok(Self {
            vectorizer,
            model,
            explain: config.explain.clone(),
            trained_at: Utc::now(),
        })
    }

    /// Assemble an engine from previously fitted parts.
    pub fn from_parts(
        vectorizer: TfIdfVectorizer,
        model: LogisticRegression,
        explain: ExplainConfig,
        trained_at: DateTime<Utc>,
    ) -> Result<Self> {
        if !vectorizer.is_fitted() {
            return Err(VerityError::uninitialized("vectorizer has not been fitted"));
        }
        if !model.is_fitted() {
            return Err(VerityError::uninitialized("classifier has not been fitted"));
        }
        model.validate()?;
        if model.n_features() != vectorizer.vocabulary_size() {
            return Err(VerityError::configuration(format!(
                "classifier expects {} features but vocabulary has {}",
                model.n_features(),
                vectorizer.vocabulary_size()
            )));
        }
        Ok(Self {
            vectorizer,
            model,
            explain,
            trained_at,
        })
    }

    /// TF-IDF vector for `text`.
    pub fn transform(&self, text: &str) -> Result<SparseVector> {
        self.vectorizer.transform(text)
    }

    /// Classify `text` and explain the decision.
    pub fn predict(&self, text: &str) -> Result<Classification> {
        let start = Instant::now();
        let vector = self.vectorizer.transform(text)?;
        let prediction = self.model.predict(&vector)?;
        let highlights = attribution::explain(
            text,
            &vector,
            &self.vectorizer,
            &self.model,
            &prediction.label,
            self.explain.max_highlights,
        )?;
        let reasons = attribution::summarize(&highlights, self.explain.summary_tokens)
            .into_iter()
            .collect();

        Ok(Classification {
            label: prediction.label,
            confidence: prediction.confidence,
            probabilities: prediction.probabilities,
            reasons,
            highlights,
            latency: start.elapsed(),
        })
    }

    /// Attributions of `text` toward `label`, at most `limit` entries.
    pub fn explain(&self, text: &str, label: &str, limit: usize) -> Result<Vec<TokenAttribution>> {
        let vector = self.vectorizer.transform(text)?;
        attribution::explain(text, &vector, &self.vectorizer, &self.model, label, limit)
    }

    /// Labels in canonical order.
    pub fn classes(&self) -> &[String] {
        self.model.classes()
    }

    pub fn vectorizer(&self) -> &TfIdfVectorizer {
        &self.vectorizer
    }

    pub fn model(&self) -> &LogisticRegression {
        &self.model
    }

    pub fn explain_config(&self) -> &ExplainConfig {
        &self.explain
    }

    /// When the weights were fitted.
    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<LabeledText> {
        [
            ("city council approves new budget", "real"),
            ("aliens secretly control the weather", "fake"),
            ("mayor signs budget bill", "real"),
            ("miracle cure discovered by aliens", "fake"),
        ]
        .iter()
        .map(|(t, l)| LabeledText::new(*t, *l))
        .collect()
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_classifier_is_send_sync() {
        assert_send_sync::<TextClassifier>();
    }

    #[test]
    fn test_fit_and_predict() {
        let classifier = TextClassifier::fit(&samples(), &VerityConfig::default()).unwrap();
        assert_eq!(classifier.classes(), &["fake".to_string(), "real".to_string()]);

        let result = classifier.predict("council approves budget bill").unwrap();
        assert_eq!(result.label, "real");
        assert!(result.confidence > 0.5);
        assert_eq!(result.reasons.len(), 1);
        assert!(result.reasons[0].starts_with("Top cues: "));
        assert!(result.highlights.len() <= 20);
        let sum: f64 = result.probabilities.iter().map(|(_, p)| p).sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_predict_without_known_tokens() {
        let classifier = TextClassifier::fit(&samples(), &VerityConfig::default()).unwrap();
        let result = classifier.predict("zzz qqq").unwrap();
        assert!(result.highlights.is_empty());
        assert!(result.reasons.is_empty());
    }

    #[test]
    fn test_from_parts_rejects_unfitted() {
        let vectorizer = TfIdfVectorizer::new(Default::default()).unwrap();
        let result = TextClassifier::from_parts(
            vectorizer,
            LogisticRegression::default(),
            ExplainConfig::default(),
            Utc::now(),
        );
        assert!(matches!(result, Err(VerityError::Uninitialized(_))));
    }

    #[test]
    fn test_empty_corpus() {
        let result = TextClassifier::fit(&[], &VerityConfig::default());
        assert!(matches!(result, Err(VerityError::Configuration(_))));
    }
}
