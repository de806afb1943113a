//! Text classification: feature extraction, the linear model, attribution
//! and the fit-or-load lifecycle around them.
//!
//! Data flows leaf to root:
//!
//! - [`tfidf`] turns text into a [`SparseVector`] over a fitted vocabulary
//! - [`logistic`] scores vectors and produces a label distribution
//! - [`attribution`] explains a prediction per token
//! - [`classifier`] owns one fitted vectorizer and model pair
//! - [`bootstrap`] loads a persisted [`artifact`] or trains on a [`corpus`]

pub mod artifact;
pub mod attribution;
pub mod bootstrap;
pub mod classifier;
pub mod corpus;
pub mod logistic;
pub mod report;
pub mod sparse;
pub mod tfidf;

pub use artifact::{MODEL_VERSION, ModelArtifact};
pub use attribution::TokenAttribution;
pub use bootstrap::{Bootstrapper, EngineHandle, TrainingOutcome};
pub use classifier::{Classification, TextClassifier};
pub use corpus::{BuiltinCorpus, CorpusLoad, CorpusSource, CsvFileCorpus, InMemoryCorpus, LabeledText};
pub use logistic::{LogisticRegression, Prediction};
pub use report::ClassificationReport;
pub use sparse::SparseVector;
pub use tfidf::{TfIdfVectorizer, VectorizerState};
