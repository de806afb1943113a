//! Per-token attribution for linear text classifiers.
//!
//! A token's contribution is its TF-IDF weight in the document vector times
//! the classifier weight of its feature, accumulated over every occurrence of
//! the token. Only unigram tokens are attributed.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VerityError};
use crate::ml::logistic::LogisticRegression;
use crate::ml::sparse::SparseVector;
use crate::ml::tfidf::TfIdfVectorizer;

/// Signed influence of one token on a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenAttribution {
    pub token: String,
    pub contribution: f64,
}

/// Rank the unigram tokens of `text` by their contribution to `label`.
///
/// `vector` must be the vectorizer's transform of `text`. Tokens outside the
/// vocabulary are omitted. The result is sorted by descending absolute
/// contribution, ties in order of first occurrence, and holds at most
/// `limit` entries.
pub fn explain(
    text: &str,
    vector: &SparseVector,
    vectorizer: &TfIdfVectorizer,
    classifier: &LogisticRegression,
    label: &str,
    limit: usize,
) -> Result<Vec<TokenAttribution>> {
    let weights = classifier.attribution_weights(label).ok_or_else(|| {
        VerityError::validation(format!("label {label:?} is not known to the classifier"))
    })?;

    let mut ranked: Vec<TokenAttribution> = Vec::new();
    let mut slots: AHashMap<String, usize> = AHashMap::new();
    for token in vectorizer.analyzer().unigrams(text)? {
        let Some(idx) = vectorizer.index_of(&token.text) else {
            continue;
        };
        let contribution = vector.get(idx) * weights.get(idx).copied().unwrap_or(0.0);
        match slots.get(&token.text) {
            Some(&slot) => ranked[slot].contribution += contribution,
            None => {
                slots.insert(token.text.clone(), ranked.len());
                ranked.push(TokenAttribution {
                    token: token.text,
                    contribution,
                });
            }
        }
    }

    // stable sort keeps first-occurrence order among equal magnitudes
    ranked.sort_by(|a, b| b.contribution.abs().total_cmp(&a.contribution.abs()));
    ranked.truncate(limit);
    Ok(ranked)
}

/// Short human-readable reason naming the strongest tokens.
pub fn summarize(attributions: &[TokenAttribution], max_tokens: usize) -> Option<String> {
    if attributions.is_empty() || max_tokens == 0 {
        return None;
    }
    let cues: Vec<&str> = attributions
        .iter()
        .take(max_tokens)
        .map(|a| a.token.as_str())
        .collect();
    Some(format!("Top cues: {}", cues.join(", ")))
}
