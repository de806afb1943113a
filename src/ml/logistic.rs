//! L2-regularized logistic regression over sparse TF-IDF vectors.
//!
//! Two classes are fitted as a single binary logistic model whose weight row
//! points toward the second (lexicographically larger) class. More classes
//! are fitted as a multinomial softmax model with one row per class.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::TrainingConfig;
use crate::error::{Result, VerityError};
use crate::ml::sparse::SparseVector;

/// Label and probability distribution for one vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Most probable class.
    pub label: String,
    /// Probability of `label`.
    pub confidence: f64,
    /// Probability of every class, in class order.
    pub probabilities: Vec<(String, f64)>,
}

/// Linear classifier weights.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Class labels, sorted and unique.
    classes: Vec<String>,
    /// One row for binary models, one row per class otherwise.
    coef: Vec<Vec<f64>>,
    /// One intercept per row.
    intercept: Vec<f64>,
    /// Feature dimensionality.
    n_features: usize,
    /// Gradient descent iterations run during fitting.
    n_iter: usize,
}

impl LogisticRegression {
    /// Fit on TF-IDF vectors and their labels.
    pub fn fit(
        vectors: &[SparseVector],
        labels: &[String],
        n_features: usize,
        config: &TrainingConfig,
    ) -> Result<Self> {
        if vectors.len() != labels.len() {
            return Err(VerityError::configuration(format!(
                "{} feature vectors but {} labels",
                vectors.len(),
                labels.len()
            )));
        }
        if vectors.is_empty() {
            return Err(VerityError::configuration(
                "cannot fit a classifier without samples",
            ));
        }

        let mut class_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for label in labels {
            *class_counts.entry(label.as_str()).or_insert(0) += 1;
        }
        if class_counts.len() < 2 {
            return Err(VerityError::configuration(format!(
                "need at least 2 distinct labels, found {}",
                class_counts.len()
            )));
        }
        let classes: Vec<String> = class_counts.keys().map(|c| c.to_string()).collect();
        let n_classes = classes.len();
        let targets: Vec<usize> = labels
            .iter()
            .map(|l| classes.binary_search(l).unwrap_or_default())
            .collect();

        // Balanced weighting: n / (k * count(class))
        let n_samples = vectors.len() as f64;
        let class_weight: Vec<f64> = classes
            .iter()
            .map(|c| {
                if config.balanced {
                    n_samples / (n_classes as f64 * class_counts[c.as_str()] as f64)
                } else {
                    1.0
                }
            })
            .collect();
        let sample_weight: Vec<f64> = targets.iter().map(|&t| class_weight[t]).collect();
        let weight_sum: f64 = sample_weight.iter().sum();
        let alpha = 1.0 / (config.c * weight_sum);

        let n_rows = if n_classes == 2 { 1 } else { n_classes };
        let mut model = LogisticRegression {
            classes,
            coef: vec![vec![0.0; n_features]; n_rows],
            intercept: vec![0.0; n_rows],
            n_features,
            n_iter: 0,
        };

        let mut grad_w = vec![vec![0.0; n_features]; n_rows];
        let mut grad_b = vec![0.0; n_rows];
        let mut residual = vec![0.0; n_rows];
        let mut converged = false;

        for iter in 0..config.max_iter {
            for row in &mut grad_w {
                row.iter_mut().for_each(|g| *g = 0.0);
            }
            grad_b.iter_mut().for_each(|g| *g = 0.0);

            for ((x, &target), &sw) in vectors.iter().zip(&targets).zip(&sample_weight) {
                let raw = model.raw_scores(x);
                if n_rows == 1 {
                    let y = if target == 1 { 1.0 } else { 0.0 };
                    residual[0] = sigmoid(raw[0]) - y;
                } else {
                    let probs = softmax(&raw);
                    for (c, r) in residual.iter_mut().enumerate() {
                        *r = probs[c] - if c == target { 1.0 } else { 0.0 };
                    }
                }
                let scale = sw / weight_sum;
                for (row, &r) in residual.iter().enumerate() {
                    grad_b[row] += scale * r;
                    x.add_scaled_to(&mut grad_w[row], scale * r);
                }
            }

            let mut max_grad = grad_b.iter().fold(0.0f64, |m, g| m.max(g.abs()));
            for (grad_row, coef_row) in grad_w.iter_mut().zip(&model.coef) {
                for (g, w) in grad_row.iter_mut().zip(coef_row) {
                    *g += alpha * w;
                    max_grad = max_grad.max(g.abs());
                }
            }

            model.n_iter = iter + 1;
            if max_grad < config.tol {
                converged = true;
                break;
            }

            for (coef_row, grad_row) in model.coef.iter_mut().zip(&grad_w) {
                for (w, g) in coef_row.iter_mut().zip(grad_row) {
                    *w -= config.learning_rate * g;
                }
            }
            for (b, g) in model.intercept.iter_mut().zip(&grad_b) {
                *b -= config.learning_rate * g;
            }
        }

        if !converged {
            log::debug!(
                "logistic regression stopped after {} iterations without reaching tol={}",
                model.n_iter,
                config.tol
            );
        }
        Ok(model)
    }

    /// Assemble a model from explicit weights.
    pub fn from_parts(
        classes: Vec<String>,
        coef: Vec<Vec<f64>>,
        intercept: Vec<f64>,
    ) -> Result<Self> {
        let n_features = coef.first().map_or(0, Vec::len);
        let model = Self {
            classes,
            coef,
            intercept,
            n_features,
            n_iter: 0,
        };
        model.validate()?;
        Ok(model)
    }

    /// Check that the weights have the shape the classes require.
    ///
    /// Classes must be sorted and unique, there must be one weight row and
    /// one intercept per row, and every row must hold `n_features` weights.
    pub fn validate(&self) -> Result<()> {
        if self.classes.len() < 2 {
            return Err(VerityError::configuration(
                "need at least 2 distinct labels",
            ));
        }
        if !self.classes.windows(2).all(|w| w[0] < w[1]) {
            return Err(VerityError::configuration(
                "classes must be sorted and unique",
            ));
        }
        let n_rows = if self.is_binary() { 1 } else { self.classes.len() };
        if self.coef.len() != n_rows || self.intercept.len() != n_rows {
            return Err(VerityError::configuration(format!(
                "{} classes need {} weight rows and intercepts, found {} and {}",
                self.classes.len(),
                n_rows,
                self.coef.len(),
                self.intercept.len()
            )));
        }
        if let Some(row) = self.coef.iter().find(|row| row.len() != self.n_features) {
            return Err(VerityError::configuration(format!(
                "weight row has {} entries, expected {}",
                row.len(),
                self.n_features
            )));
        }
        Ok(())
    }

    fn ensure_fitted(&self) -> Result<()> {
        if self.is_fitted() {
            Ok(())
        } else {
            Err(VerityError::uninitialized("classifier has not been fitted"))
        }
    }

    /// Whether the model holds fitted weights.
    pub fn is_fitted(&self) -> bool {
        !self.classes.is_empty()
    }

    /// Class labels in canonical (sorted) order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Whether this is a two-class model with a single weight row.
    pub fn is_binary(&self) -> bool {
        self.classes.len() == 2
    }

    /// Feature dimensionality.
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Gradient descent iterations run during fitting.
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Weight row explaining a prediction of `label`.
    ///
    /// Binary models have a single row oriented toward `classes[1]`; it is
    /// returned for either label. Multi-class models return the label's row.
    pub fn attribution_weights(&self, label: &str) -> Option<&[f64]> {
        if self.is_binary() {
            return self.coef.first().map(Vec::as_slice);
        }
        let row = self.classes.binary_search_by(|c| c.as_str().cmp(label)).ok()?;
        self.coef.get(row).map(Vec::as_slice)
    }

    /// Per-feature weights pushing toward `label`.
    ///
    /// For binary models the reference class gets the negated single row.
    pub fn weights_toward(&self, label: &str) -> Option<Vec<f64>> {
        let class = self.classes.binary_search_by(|c| c.as_str().cmp(label)).ok()?;
        if self.is_binary() {
            let row = self.coef.first()?;
            if class == 0 {
                Some(row.iter().map(|w| -w).collect())
            } else {
                Some(row.clone())
            }
        } else {
            self.coef.get(class).cloned()
        }
    }

    fn raw_scores(&self, vector: &SparseVector) -> Vec<f64> {
        self.coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, b)| vector.dot_dense(row) + b)
            .collect()
    }

    /// Raw score per class: `dot(weights[class], vector) + bias[class]`.
    ///
    /// In the binary case `classes[0]` is the reference class with score 0.
    pub fn score(&self, vector: &SparseVector) -> Result<Vec<(String, f64)>> {
        self.ensure_fitted()?;
        let raw = self.raw_scores(vector);
        let scores = if self.is_binary() {
            vec![0.0, raw[0]]
        } else {
            raw
        };
        Ok(self.classes.iter().cloned().zip(scores).collect())
    }

    /// Probability per class, in class order. Sums to 1.
    pub fn predict_proba(&self, vector: &SparseVector) -> Result<Vec<f64>> {
        self.ensure_fitted()?;
        let raw = self.raw_scores(vector);
        if self.is_binary() {
            let p = sigmoid(raw[0]);
            Ok(vec![1.0 - p, p])
        } else {
            Ok(softmax(&raw))
        }
    }

    /// Most probable label and the full distribution.
    ///
    /// Exact ties resolve to the lexicographically lowest label.
    pub fn predict(&self, vector: &SparseVector) -> Result<Prediction> {
        let probs = self.predict_proba(vector)?;
        let mut best = 0;
        for (idx, &p) in probs.iter().enumerate().skip(1) {
            if p > probs[best] {
                best = idx;
            }
        }
        Ok(Prediction {
            label: self.classes[best].clone(),
            confidence: probs[best],
            probabilities: self.classes.iter().cloned().zip(probs).collect(),
        })
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn onehot(idx: usize) -> SparseVector {
        SparseVector::from_entries(vec![(idx, 1.0)])
    }

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_binary_fit_separates_classes() {
        let vectors = vec![onehot(0), onehot(0), onehot(1), onehot(1)];
        let y = labels(&["real", "real", "fake", "fake"]);
        let model = LogisticRegression::fit(&vectors, &y, 2, &TrainingConfig::default()).unwrap();

        assert!(model.is_binary());
        assert_eq!(model.classes(), &["fake".to_string(), "real".to_string()]);
        assert_eq!(model.predict(&onehot(0)).unwrap().label, "real");
        assert_eq!(model.predict(&onehot(1)).unwrap().label, "fake");

        // the single row points toward "real"
        let w = model.attribution_weights("fake").unwrap();
        assert!(w[0] > 0.0);
        assert!(w[1] < 0.0);
    }

    #[test]
    fn test_multiclass_fit() {
        let vectors = vec![onehot(0), onehot(1), onehot(2), onehot(0), onehot(1), onehot(2)];
        let y = labels(&["a", "b", "c", "a", "b", "c"]);
        let model = LogisticRegression::fit(&vectors, &y, 3, &TrainingConfig::default()).unwrap();

        assert!(!model.is_binary());
        for (idx, label) in ["a", "b", "c"].iter().enumerate() {
            let prediction = model.predict(&onehot(idx)).unwrap();
            assert_eq!(&prediction.label, label);
            let sum: f64 = prediction.probabilities.iter().map(|(_, p)| p).sum();
            assert!((sum - 1.0).abs() < 1e-9);
            assert_eq!(prediction.probabilities.len(), 3);
        }
        let w = model.attribution_weights("b").unwrap();
        assert!(w[1] > w[0]);
        assert!(model.attribution_weights("zzz").is_none());
    }

    #[test]
    fn test_balanced_weighting_counters_majority() {
        // an uninformative feature shared by every sample
        let shared = SparseVector::from_entries(vec![(0, 1.0)]);
        let vectors = vec![shared.clone(); 4];
        let y = labels(&["major", "major", "major", "minor"]);

        let balanced =
            LogisticRegression::fit(&vectors, &y, 1, &TrainingConfig::default()).unwrap();
        let probs = balanced.predict_proba(&shared).unwrap();
        assert!((probs[0] - 0.5).abs() < 1e-3);

        let unbalanced = LogisticRegression::fit(
            &vectors,
            &y,
            1,
            &TrainingConfig {
                balanced: false,
                ..Default::default()
            },
        )
        .unwrap();
        let probs = unbalanced.predict_proba(&shared).unwrap();
        assert!(probs[0] > 0.6);
    }

    #[test]
    fn test_score_binary_reference_class() {
        let model = LogisticRegression::from_parts(
            labels(&["fake", "real"]),
            vec![vec![2.0, -1.0]],
            vec![0.5],
        )
        .unwrap();
        let scores = model.score(&onehot(0)).unwrap();
        assert_eq!(scores, vec![("fake".to_string(), 0.0), ("real".to_string(), 2.5)]);

        let probs = model.predict_proba(&onehot(0)).unwrap();
        assert!((probs[1] - sigmoid(2.5)).abs() < 1e-12);

        assert_eq!(model.weights_toward("real"), Some(vec![2.0, -1.0]));
        assert_eq!(model.weights_toward("fake"), Some(vec![-2.0, 1.0]));
        assert_eq!(model.weights_toward("other"), None);
    }

    #[test]
    fn test_exact_tie_resolves_to_lowest_label() {
        let model = LogisticRegression::from_parts(
            labels(&["alpha", "beta", "gamma"]),
            vec![vec![0.0]; 3],
            vec![0.0; 3],
        )
        .unwrap();
        let prediction = model.predict(&SparseVector::new()).unwrap();
        assert_eq!(prediction.label, "alpha");
        assert!((prediction.confidence - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_unfitted_model() {
        let model = LogisticRegression::default();
        assert!(matches!(
            model.predict(&onehot(0)),
            Err(VerityError::Uninitialized(_))
        ));
        assert!(matches!(
            model.score(&onehot(0)),
            Err(VerityError::Uninitialized(_))
        ));
    }

    #[test]
    fn test_single_label_rejected() {
        let result = LogisticRegression::fit(
            &[onehot(0), onehot(1)],
            &labels(&["real", "real"]),
            2,
            &TrainingConfig::default(),
        );
        assert!(matches!(result, Err(VerityError::Configuration(_))));
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let result = LogisticRegression::fit(
            &[onehot(0)],
            &labels(&["real", "fake"]),
            2,
            &TrainingConfig::default(),
        );
        assert!(matches!(result, Err(VerityError::Configuration(_))));
    }

    #[test]
    fn test_malformed_shapes_rejected() {
        let well_formed = LogisticRegression::from_parts(
            labels(&["fake", "real"]),
            vec![vec![0.5, -0.5]],
            vec![0.0],
        )
        .unwrap();
        assert!(well_formed.validate().is_ok());

        let missing_rows = LogisticRegression {
            coef: Vec::new(),
            intercept: Vec::new(),
            ..well_formed.clone()
        };
        let short_row = LogisticRegression {
            coef: vec![vec![0.5]],
            ..well_formed.clone()
        };
        let unsorted = LogisticRegression {
            classes: labels(&["real", "fake"]),
            ..well_formed.clone()
        };
        let duplicated = LogisticRegression {
            classes: labels(&["fake", "fake", "real"]),
            coef: vec![vec![0.0, 0.0]; 3],
            intercept: vec![0.0; 3],
            ..well_formed.clone()
        };
        for model in [missing_rows, short_row, unsorted, duplicated] {
            assert!(matches!(
                model.validate(),
                Err(VerityError::Configuration(_))
            ));
        }

        assert!(
            LogisticRegression::from_parts(
                labels(&["a", "b", "c"]),
                vec![vec![0.0, 1.0], vec![0.0]],
                vec![0.0, 0.0],
            )
            .is_err()
        );
    }

    #[test]
    fn test_softmax_is_stable() {
        let probs = softmax(&[1000.0, 1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-12);
        assert!(sigmoid(-1000.0) >= 0.0);
        assert!(sigmoid(1000.0) <= 1.0);
    }
}
