//! Analyzers turn raw text into the terms the vectorizer counts.
//!
//! ```text
//! Raw Text → lowercase → RegexTokenizer → unigrams → shingles (n ≤ max_ngram)
//! ```
//!
//! # Examples
//!
//! ```
//! use verity::analysis::analyzer::{Analyzer, StandardAnalyzer};
//!
//! let analyzer = StandardAnalyzer::new(2).unwrap();
//! let terms: Vec<String> = analyzer.analyze("New Budget Bill").unwrap().map(|t| t.text).collect();
//!
//! assert_eq!(terms, vec!["new", "budget", "bill", "new budget", "budget bill"]);
//! ```

use std::sync::Arc;

use crate::analysis::token::{Token, TokenStream};
use crate::analysis::tokenizer::{RegexTokenizer, Tokenizer};
use crate::error::{Result, VerityError};

/// Joins the words of an n-gram term. Never produced inside a token.
pub const TERM_SEPARATOR: &str = " ";

/// Trait for analyzers that convert text into processed tokens.
pub trait Analyzer: Send + Sync {
    /// Analyze the given text and return a stream of tokens.
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this analyzer (for debugging and configuration).
    fn name(&self) -> &'static str;
}

/// Lowercasing word analyzer that emits unigrams followed by word n-grams.
///
/// Terms are emitted grouped by arity: every unigram in text order, then every
/// bigram in text order, and so on up to `max_ngram`.
#[derive(Clone)]
pub struct StandardAnalyzer {
    tokenizer: Arc<dyn Tokenizer>,
    lowercase: bool,
    max_ngram: usize,
}

impl StandardAnalyzer {
    /// Create an analyzer emitting n-grams up to `max_ngram` words long.
    pub fn new(max_ngram: usize) -> Result<Self> {
        Self::with_tokenizer(Arc::new(RegexTokenizer::new()?), max_ngram, true)
    }

    /// Create an analyzer over a custom tokenizer.
    pub fn with_tokenizer(
        tokenizer: Arc<dyn Tokenizer>,
        max_ngram: usize,
        lowercase: bool,
    ) -> Result<Self> {
        if max_ngram == 0 {
            return Err(VerityError::configuration(
                "max_ngram must be at least 1",
            ));
        }
        Ok(StandardAnalyzer {
            tokenizer,
            lowercase,
            max_ngram,
        })
    }

    /// Longest n-gram emitted.
    pub fn max_ngram(&self) -> usize {
        self.max_ngram
    }

    /// Single-word tokens only, in text order.
    pub fn unigrams(&self, text: &str) -> Result<Vec<Token>> {
        if self.lowercase {
            Ok(self.tokenizer.tokenize(&text.to_lowercase())?.collect())
        } else {
            Ok(self.tokenizer.tokenize(text)?.collect())
        }
    }

    /// All terms as owned strings, in emission order.
    pub fn terms(&self, text: &str) -> Result<Vec<String>> {
        Ok(self.analyze(text)?.map(|token| token.text).collect())
    }

    fn shingles(words: &[Token], n: usize) -> impl Iterator<Item = Token> + '_ {
        words.windows(n).map(move |window| {
            let text = window
                .iter()
                .map(|t| t.text.as_str())
                .collect::<Vec<_>>()
                .join(TERM_SEPARATOR);
            let first = &window[0];
            let last = &window[n - 1];
            Token::with_offsets(text, first.position, first.start_offset, last.end_offset)
                .with_arity(n)
        })
    }
}

impl Analyzer for StandardAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        let words = self.unigrams(text)?;
        let mut tokens = words.clone();
        for n in 2..=self.max_ngram {
            tokens.extend(Self::shingles(&words, n));
        }
        Ok(Box::new(tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        "standard"
    }
}

impl std::fmt::Debug for StandardAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandardAnalyzer")
            .field("tokenizer", &self.tokenizer.name())
            .field("lowercase", &self.lowercase)
            .field("max_ngram", &self.max_ngram)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unigrams_then_bigrams() {
        let analyzer = StandardAnalyzer::new(2).unwrap();
        let tokens: Vec<Token> = analyzer.analyze("City council, approves!").unwrap().collect();

        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "city",
                "council",
                "approves",
                "city council",
                "council approves"
            ]
        );
        assert_eq!(tokens[3].arity, 2);
        assert_eq!(tokens[4].position, 1);
        assert_eq!(tokens[4].start_offset, 5);
        assert_eq!(tokens[4].end_offset, 22);
    }

    #[test]
    fn test_unigram_only_analyzer() {
        let analyzer = StandardAnalyzer::new(1).unwrap();
        let terms = analyzer.terms("Aliens sighted").unwrap();
        assert_eq!(terms, vec!["aliens", "sighted"]);
    }

    #[test]
    fn test_single_word_has_no_bigrams() {
        let analyzer = StandardAnalyzer::new(2).unwrap();
        assert_eq!(analyzer.terms("Budget").unwrap(), vec!["budget"]);
        assert!(analyzer.terms("").unwrap().is_empty());
    }

    #[test]
    fn test_case_preserving_analyzer() {
        let analyzer =
            StandardAnalyzer::with_tokenizer(Arc::new(RegexTokenizer::default()), 1, false)
                .unwrap();
        assert_eq!(analyzer.terms("Mayor Signs").unwrap(), vec!["Mayor", "Signs"]);
    }

    #[test]
    fn test_zero_ngram_rejected() {
        let result = StandardAnalyzer::new(0);
        assert!(matches!(result, Err(VerityError::Configuration(_))));
    }
}
