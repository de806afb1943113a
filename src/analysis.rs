//! Text analysis for feature extraction.
//!
//! Raw text is lowercased, split into maximal runs of alphanumeric characters
//! by a [`RegexTokenizer`], and optionally expanded into word n-grams
//! ("shingles") by the [`StandardAnalyzer`].

pub mod analyzer;
pub mod token;
pub mod tokenizer;

pub use analyzer::{Analyzer, StandardAnalyzer, TERM_SEPARATOR};
pub use token::{Token, TokenStream};
pub use tokenizer::{RegexTokenizer, Tokenizer};
