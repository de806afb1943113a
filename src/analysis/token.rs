//! Token types for text analysis.
//!
//! A [`Token`] is the unit that flows from the tokenizer to the vectorizer.
//! Word n-grams are tokens too: their text is the member words joined by
//! [`TERM_SEPARATOR`](crate::analysis::TERM_SEPARATOR) and their offsets span
//! every member.
//!
//! # Examples
//!
//! ```
//! use verity::analysis::token::Token;
//!
//! let token = Token::with_offsets("world", 1, 6, 11);
//! assert_eq!(token.text, "world");
//! assert_eq!(token.start_offset, 6);
//! assert_eq!(token.end_offset, 11);
//! assert_eq!(token.arity, 1);
//! ```

use serde::{Deserialize, Serialize};

/// A token represents a single unit of text after tokenization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The text content of the token
    pub text: String,

    /// The position of the token in the original token stream (0-based).
    /// For an n-gram this is the position of its first word.
    pub position: usize,

    /// The byte offset where this token starts in the analyzed text
    pub start_offset: usize,

    /// The byte offset where this token ends in the analyzed text
    pub end_offset: usize,

    /// Number of words in this token (1 for unigrams, 2 for bigrams, ...)
    pub arity: usize,
}

impl Token {
    /// Create a new unigram token with the given text and position.
    pub fn new<S: Into<String>>(text: S, position: usize) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset: 0,
            end_offset: 0,
            arity: 1,
        }
    }

    /// Create a new unigram token with byte offsets.
    pub fn with_offsets<S: Into<String>>(
        text: S,
        position: usize,
        start_offset: usize,
        end_offset: usize,
    ) -> Self {
        Token {
            text: text.into(),
            position,
            start_offset,
            end_offset,
            arity: 1,
        }
    }

    /// Set the number of words this token spans.
    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = arity;
        self
    }

    /// Whether this token is a single word.
    pub fn is_unigram(&self) -> bool {
        self.arity == 1
    }
}

/// A stream of tokens produced by a tokenizer or analyzer.
pub type TokenStream = Box<dyn Iterator<Item = Token>>;
