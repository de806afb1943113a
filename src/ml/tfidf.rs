//! TF-IDF vectorizer for text feature extraction.

use ahash::{AHashMap, AHashSet};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::StandardAnalyzer;
use crate::analysis::tokenizer::RegexTokenizer;
use crate::config::VectorizerConfig;
use crate::error::{Result, VerityError};
use crate::ml::sparse::SparseVector;

/// The fitted, serializable part of a [`TfIdfVectorizer`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorizerState {
    /// Analyzer and vocabulary selection settings used at fit time.
    pub config: VectorizerConfig,
    /// Vocabulary terms; a term's position is its feature index.
    pub terms: Vec<String>,
    /// Inverse document frequency per feature index.
    pub idf: Vec<f64>,
    /// Number of documents seen during fitting.
    pub n_documents: usize,
}

#[derive(Debug)]
struct TermStats {
    document_frequency: usize,
    total_count: usize,
    first_seen: usize,
}

/// TF-IDF vectorizer for text feature extraction.
pub struct TfIdfVectorizer {
    state: VectorizerState,
    /// Term -> feature index.
    vocabulary: AHashMap<String, usize>,
    analyzer: StandardAnalyzer,
}

impl std::fmt::Debug for TfIdfVectorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TfIdfVectorizer")
            .field("vocabulary_size", &self.vocabulary.len())
            .field("n_documents", &self.state.n_documents)
            .field("analyzer", &self.analyzer)
            .finish()
    }
}

impl TfIdfVectorizer {
    /// Create an unfitted vectorizer.
    pub fn new(config: VectorizerConfig) -> Result<Self> {
        let analyzer = Self::build_analyzer(&config)?;
        Ok(Self {
            state: VectorizerState {
                config,
                ..Default::default()
            },
            vocabulary: AHashMap::new(),
            analyzer,
        })
    }

    /// Rebuild a fitted vectorizer from its persisted state.
    pub fn from_state(state: VectorizerState) -> Result<Self> {
        if state.terms.len() != state.idf.len() {
            return Err(VerityError::configuration(format!(
                "vectorizer state has {} terms but {} idf weights",
                state.terms.len(),
                state.idf.len()
            )));
        }
        let analyzer = Self::build_analyzer(&state.config)?;
        let mut vocabulary = AHashMap::with_capacity(state.terms.len());
        for (idx, term) in state.terms.iter().enumerate() {
            if vocabulary.insert(term.clone(), idx).is_some() {
                return Err(VerityError::configuration(format!(
                    "duplicate vocabulary term {term:?}"
                )));
            }
        }
        Ok(Self {
            state,
            vocabulary,
            analyzer,
        })
    }

    fn build_analyzer(config: &VectorizerConfig) -> Result<StandardAnalyzer> {
        StandardAnalyzer::with_tokenizer(
            std::sync::Arc::new(RegexTokenizer::new()?),
            config.max_ngram,
            config.lowercase,
        )
    }

    /// Fit the vectorizer on training documents.
    pub fn fit(&mut self, documents: &[String]) -> Result<()> {
        if documents.is_empty() {
            return Err(VerityError::configuration(
                "cannot fit a vectorizer on an empty corpus",
            ));
        }

        let analyzed: Vec<Vec<String>> = documents
            .par_iter()
            .map(|doc| self.analyzer.terms(doc))
            .collect::<Result<_>>()?;

        // Count document frequencies, corpus counts and first occurrences
        let mut stats: AHashMap<&str, TermStats> = AHashMap::new();
        let mut position = 0usize;
        for terms in &analyzed {
            let mut seen: AHashSet<&str> = AHashSet::with_capacity(terms.len());
            for term in terms {
                let entry = stats.entry(term.as_str()).or_insert(TermStats {
                    document_frequency: 0,
                    total_count: 0,
                    first_seen: position,
                });
                entry.total_count += 1;
                if seen.insert(term.as_str()) {
                    entry.document_frequency += 1;
                }
                position += 1;
            }
        }

        let config = &self.state.config;
        let mut selected: Vec<(&str, TermStats)> = stats
            .into_iter()
            .filter(|(_, s)| s.document_frequency >= config.min_df)
            .collect();

        if let Some(max_features) = config.max_features {
            if selected.len() > max_features {
                selected.sort_by(|(ta, a), (tb, b)| {
                    b.total_count
                        .cmp(&a.total_count)
                        .then(a.first_seen.cmp(&b.first_seen))
                        .then(ta.cmp(tb))
                });
                selected.truncate(max_features);
            }
        }

        selected.sort_by(|(ta, _), (tb, _)| ta.cmp(tb));

        let n_documents = documents.len();
        let mut terms = Vec::with_capacity(selected.len());
        let mut idf = Vec::with_capacity(selected.len());
        for (term, s) in selected {
            terms.push(term.to_string());
            // IDF = ln((N + 1) / (df + 1)) + 1
            idf.push(
                ((n_documents as f64 + 1.0) / (s.document_frequency as f64 + 1.0)).ln() + 1.0,
            );
        }

        self.vocabulary = terms
            .iter()
            .enumerate()
            .map(|(idx, term)| (term.clone(), idx))
            .collect();
        self.state.terms = terms;
        self.state.idf = idf;
        self.state.n_documents = n_documents;

        log::debug!(
            "fitted vectorizer: {} documents, {} features",
            n_documents,
            self.vocabulary.len()
        );
        Ok(())
    }

    /// Transform a document into an L2-normalized TF-IDF vector.
    ///
    /// Terms outside the vocabulary are dropped.
    pub fn transform(&self, document: &str) -> Result<SparseVector> {
        self.ensure_fitted()?;
        let terms = self.analyzer.terms(document)?;
        Ok(self.transform_terms(&terms))
    }

    /// Transform already-analyzed terms.
    pub fn transform_terms<S: AsRef<str>>(&self, terms: &[S]) -> SparseVector {
        let counts = terms
            .iter()
            .filter_map(|t| self.vocabulary.get(t.as_ref()).map(|&idx| (idx, 1.0)))
            .collect();
        let mut vector = SparseVector::from_entries(counts);
        let idf = &self.state.idf;
        vector.map_values(|idx, tf| tf * idf[idx]);
        vector.l2_normalize();
        vector
    }

    /// Transform a batch of documents in parallel, preserving order.
    pub fn transform_batch(&self, documents: &[String]) -> Result<Vec<SparseVector>> {
        documents.par_iter().map(|doc| self.transform(doc)).collect()
    }

    fn ensure_fitted(&self) -> Result<()> {
        if self.is_fitted() {
            Ok(())
        } else {
            Err(VerityError::uninitialized("vectorizer has not been fitted"))
        }
    }

    /// Whether `fit` or `from_state` has produced a vocabulary.
    pub fn is_fitted(&self) -> bool {
        self.state.n_documents > 0
    }

    /// Feature index of a term.
    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    /// Term at a feature index.
    pub fn term(&self, index: usize) -> Option<&str> {
        self.state.terms.get(index).map(String::as_str)
    }

    /// IDF weight at a feature index.
    pub fn idf(&self, index: usize) -> Option<f64> {
        self.state.idf.get(index).copied()
    }

    /// Get the size of the vocabulary.
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// The analyzer shared by fitting, transforming and attribution.
    pub fn analyzer(&self) -> &StandardAnalyzer {
        &self.analyzer
    }

    /// Fitted state for persistence.
    pub fn state(&self) -> &VectorizerState {
        &self.state
    }
}
