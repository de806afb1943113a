//! Error types for the Verity library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`VerityError`] enum.
//!
//! # Examples
//!
//! ```
//! use verity::error::{Result, VerityError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(VerityError::validation("text is required"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Verity operations.
#[derive(Error, Debug)]
pub enum VerityError {
    /// I/O errors (artifact files, corpus files, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The engine cannot be built from what it was given: an empty corpus,
    /// fewer than two labels, or an incompatible model artifact.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A model was used before it was fitted or loaded.
    #[error("Uninitialized: {0}")]
    Uninitialized(String),

    /// Caller supplied input that is rejected before it reaches the engine.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Artifact store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Binary encoding/decoding errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with VerityError.
pub type Result<T> = std::result::Result<T, VerityError>;

impl VerityError {
    /// Create a new configuration error.
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        VerityError::Configuration(msg.into())
    }

    /// Create a new uninitialized error.
    pub fn uninitialized<S: Into<String>>(msg: S) -> Self {
        VerityError::Uninitialized(msg.into())
    }

    /// Create a new validation error.
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        VerityError::Validation(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        VerityError::Storage(msg.into())
    }

    /// Create a new serialization error.
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        VerityError::Serialization(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        VerityError::Other(msg.into())
    }

    /// Create a new internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        VerityError::Other(format!("Internal error: {}", msg.into()))
    }

    /// Whether this error means the engine configuration itself is unusable.
    pub fn is_configuration(&self) -> bool {
        matches!(self, VerityError::Configuration(_))
    }

    /// Produce an owned copy of this error for handing to additional callers.
    ///
    /// Source errors that are not `Clone` (I/O, JSON) are flattened into
    /// their message.
    pub fn replicate(&self) -> Self {
        match self {
            VerityError::Configuration(m) => VerityError::Configuration(m.clone()),
            VerityError::Uninitialized(m) => VerityError::Uninitialized(m.clone()),
            VerityError::Validation(m) => VerityError::Validation(m.clone()),
            VerityError::Storage(m) => VerityError::Storage(m.clone()),
            VerityError::Serialization(m) => VerityError::Serialization(m.clone()),
            VerityError::Other(m) => VerityError::Other(m.clone()),
            other => VerityError::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = VerityError::configuration("corpus is empty");
        assert_eq!(error.to_string(), "Configuration error: corpus is empty");

        let error = VerityError::validation("text is required");
        assert_eq!(error.to_string(), "Validation error: text is required");

        let error = VerityError::uninitialized("model not fitted");
        assert_eq!(error.to_string(), "Uninitialized: model not fitted");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let verity_error = VerityError::from(io_error);

        match verity_error {
            VerityError::Io(_) => {} // Expected
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_replicate_keeps_kind() {
        let error = VerityError::configuration("fewer than 2 labels");
        let copy = error.replicate();
        assert!(copy.is_configuration());
        assert_eq!(copy.to_string(), error.to_string());

        let io_error = VerityError::from(io::Error::other("disk gone"));
        let copy = io_error.replicate();
        assert!(matches!(copy, VerityError::Other(_)));
        assert!(copy.to_string().contains("disk gone"));
    }
}
