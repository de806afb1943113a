//! # Verity
//!
//! A deterministic text classification engine: TF-IDF features, logistic
//! regression and per-token attributions that explain each decision.
//!
//! ## Features
//!
//! - Pure Rust implementation
//! - Unigram and bigram TF-IDF with a frozen, lexicographically indexed vocabulary
//! - Balanced, L2-regularized logistic regression (binary or multinomial)
//! - Ranked token attributions and short human-readable reasons
//! - Versioned, checksummed model artifacts with fit-or-load bootstrap
//!
//! ## Example
//!
//! ```
//! use verity::config::VerityConfig;
//! use verity::ml::{LabeledText, TextClassifier};
//!
//! let samples = vec![
//!     LabeledText::new("city council approves new budget", "real"),
//!     LabeledText::new("aliens secretly control the weather", "fake"),
//!     LabeledText::new("mayor signs budget bill", "real"),
//!     LabeledText::new("miracle cure discovered by aliens", "fake"),
//! ];
//! let classifier = TextClassifier::fit(&samples, &VerityConfig::default()).unwrap();
//! let result = classifier.predict("council approves budget bill").unwrap();
//! assert_eq!(result.label, "real");
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod ml;
pub mod service;
pub mod storage;

pub mod prelude {
    pub use crate::config::VerityConfig;
    pub use crate::error::{Result, VerityError};
    pub use crate::ml::{Classification, EngineHandle, TextClassifier};
    pub use crate::service::{ClassifyRequest, ClassifyResponse, FeedbackRequest};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
