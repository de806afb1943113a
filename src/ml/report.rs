//! Validation metrics for a fitted classifier.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VerityError};
use crate::ml::classifier::TextClassifier;
use crate::ml::corpus::LabeledText;

/// Precision, recall and F1 for one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of samples whose true label is `label`.
    pub support: usize,
}

/// Per-label metrics plus accuracy and macro averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub labels: Vec<LabelMetrics>,
    pub accuracy: f64,
    pub macro_precision: f64,
    pub macro_recall: f64,
    pub macro_f1: f64,
    pub total: usize,
}

#[derive(Default)]
struct Counts {
    true_positive: usize,
    predicted: usize,
    actual: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Score `classifier` on held-out samples.
pub fn evaluate(classifier: &TextClassifier, samples: &[LabeledText]) -> Result<ClassificationReport> {
    if samples.is_empty() {
        return Err(VerityError::validation("validation partition is empty"));
    }

    let mut counts: BTreeMap<String, Counts> = BTreeMap::new();
    for class in classifier.classes() {
        counts.insert(class.clone(), Counts::default());
    }

    let mut correct = 0;
    for sample in samples {
        let vector = classifier.transform(&sample.text)?;
        let predicted = classifier.model().predict(&vector)?.label;
        if predicted == sample.label {
            correct += 1;
            counts.entry(predicted.clone()).or_default().true_positive += 1;
        }
        counts.entry(predicted).or_default().predicted += 1;
        counts.entry(sample.label.clone()).or_default().actual += 1;
    }

    let labels: Vec<LabelMetrics> = counts
        .into_iter()
        .map(|(label, c)| {
            let precision = ratio(c.true_positive, c.predicted);
            let recall = ratio(c.true_positive, c.actual);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            LabelMetrics {
                label,
                precision,
                recall,
                f1,
                support: c.actual,
            }
        })
        .collect();

    let n = labels.len() as f64;
    Ok(ClassificationReport {
        accuracy: ratio(correct, samples.len()),
        macro_precision: labels.iter().map(|m| m.precision).sum::<f64>() / n,
        macro_recall: labels.iter().map(|m| m.recall).sum::<f64>() / n,
        macro_f1: labels.iter().map(|m| m.f1).sum::<f64>() / n,
        total: samples.len(),
        labels,
    })
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .labels
            .iter()
            .map(|m| m.label.len())
            .chain(["macro avg".len()])
            .max()
            .unwrap_or(0);
        writeln!(
            f,
            "{:>width$}  {:>9}  {:>9}  {:>9}  {:>7}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for m in &self.labels {
            writeln!(
                f,
                "{:>width$}  {:>9.2}  {:>9.2}  {:>9.2}  {:>7}",
                m.label, m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(
            f,
            "{:>width$}  {:>9}  {:>9}  {:>9.2}  {:>7}",
            "accuracy", "", "", self.accuracy, self.total
        )?;
        write!(
            f,
            "{:>width$}  {:>9.2}  {:>9.2}  {:>9.2}  {:>7}",
            "macro avg", self.macro_precision, self.macro_recall, self.macro_f1, self.total
        )
    }
}
