//! Tokenizer implementations for text analysis.

use std::sync::Arc;

use regex::Regex;

use crate::analysis::token::{Token, TokenStream};
use crate::error::{Result, VerityError};

/// Trait for tokenizers that convert text into tokens.
pub trait Tokenizer: Send + Sync {
    /// Tokenize the given text into a stream of tokens.
    fn tokenize(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this tokenizer (for debugging and configuration).
    fn name(&self) -> &'static str;
}

/// Maximal runs of alphanumeric characters, independent of locale.
///
/// Matches exactly the characters for which `char::is_alphanumeric` holds.
pub const ALPHANUMERIC_PATTERN: &str = r"[\p{Alphabetic}\p{N}]+";

/// A regex-based tokenizer that extracts every match of its pattern as a token.
#[derive(Clone, Debug)]
pub struct RegexTokenizer {
    /// The regex pattern used to extract tokens
    pattern: Arc<Regex>,
}

impl RegexTokenizer {
    /// Create a new regex tokenizer matching alphanumeric runs.
    pub fn new() -> Result<Self> {
        Self::with_pattern(ALPHANUMERIC_PATTERN)
    }

    /// Create a new regex tokenizer with a custom pattern.
    pub fn with_pattern(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| VerityError::configuration(format!("Invalid regex pattern: {e}")))?;

        Ok(RegexTokenizer {
            pattern: Arc::new(regex),
        })
    }

    /// Get the regex pattern used by this tokenizer.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Tokenize into an owned vector.
    pub fn tokens(&self, text: &str) -> Vec<Token> {
        self.pattern
            .find_iter(text)
            .enumerate()
            .map(|(position, mat)| {
                Token::with_offsets(mat.as_str(), position, mat.start(), mat.end())
            })
            .collect()
    }
}

impl Default for RegexTokenizer {
    fn default() -> Self {
        Self::new().expect("Alphanumeric pattern should be valid")
    }
}

impl Tokenizer for RegexTokenizer {
    fn tokenize(&self, text: &str) -> Result<TokenStream> {
        Ok(Box::new(self.tokens(text).into_iter()))
    }

    fn name(&self) -> &'static str {
        "regex"
    }
}
