//! Persisted model artifacts.
//!
//! Layout:
//!
//! ```text
//! "VRTY" | major u8 | minor u8 | crc32(payload) u32 LE | len u64 LE | payload
//! ```
//!
//! The payload is a bincode (serde) encoding of [`ModelArtifact`]. Loading
//! refuses any artifact whose magic, major format version, checksum or
//! `model_version` does not match this build. Weight shapes are checked when
//! the engine is rebuilt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ExplainConfig;
use crate::error::{Result, VerityError};
use crate::ml::classifier::TextClassifier;
use crate::ml::logistic::LogisticRegression;
use crate::ml::tfidf::{TfIdfVectorizer, VectorizerState};

/// Tag of the feature scheme and model family.
pub const MODEL_VERSION: &str = "tfidf-logreg-v1";

const MAGIC: &[u8; 4] = b"VRTY";
const FORMAT_MAJOR: u8 = 1;
const FORMAT_MINOR: u8 = 0;
const HEADER_LEN: usize = 4 + 2 + 4 + 8;

/// Everything needed to rebuild a [`TextClassifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model_version: String,
    pub trained_at: DateTime<Utc>,
    pub vectorizer: VectorizerState,
    pub classifier: LogisticRegression,
}

impl ModelArtifact {
    /// Snapshot a fitted engine.
    pub fn from_classifier(classifier: &TextClassifier) -> Self {
        Self {
            model_version: MODEL_VERSION.to_string(),
            trained_at: classifier.trained_at(),
            vectorizer: classifier.vectorizer().state().clone(),
            classifier: classifier.model().clone(),
        }
    }

    /// Rebuild the engine described by this artifact.
    pub fn into_classifier(self, explain: ExplainConfig) -> Result<TextClassifier> {
        let vectorizer = TfIdfVectorizer::from_state(self.vectorizer)?;
        TextClassifier::from_parts(vectorizer, self.classifier, explain, self.trained_at)
    }

    /// Serialize with header and checksum.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload = bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| {
                VerityError::serialization(format!("Failed to serialize model artifact: {}", e))
            })?;

        let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&[FORMAT_MAJOR, FORMAT_MINOR]);
        bytes.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Parse and verify an encoded artifact.
    ///
    /// Every mismatch is a configuration error: the bytes are not a model
    /// this build can serve.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(VerityError::configuration(format!(
                "model artifact truncated: {} bytes",
                bytes.len()
            )));
        }
        if &bytes[0..4] != MAGIC {
            return Err(VerityError::configuration("invalid model artifact magic"));
        }
        let (major, minor) = (bytes[4], bytes[5]);
        if major != FORMAT_MAJOR {
            return Err(VerityError::configuration(format!(
                "unsupported model artifact format version: {}.{}",
                major, minor
            )));
        }

        let mut crc = [0u8; 4];
        crc.copy_from_slice(&bytes[6..10]);
        let expected_crc = u32::from_le_bytes(crc);
        let mut len = [0u8; 8];
        len.copy_from_slice(&bytes[10..18]);
        let payload_len = u64::from_le_bytes(len) as usize;

        let payload = &bytes[HEADER_LEN..];
        if payload.len() != payload_len {
            return Err(VerityError::configuration(format!(
                "model artifact payload is {} bytes, header says {}",
                payload.len(),
                payload_len
            )));
        }
        if crc32fast::hash(payload) != expected_crc {
            return Err(VerityError::configuration(
                "model artifact checksum mismatch",
            ));
        }

        let (artifact, _): (ModelArtifact, _) =
            bincode::serde::decode_from_slice(payload, bincode::config::standard()).map_err(
                |e| VerityError::configuration(format!("Failed to deserialize model artifact: {}", e)),
            )?;

        if artifact.model_version != MODEL_VERSION {
            return Err(VerityError::configuration(format!(
                "model artifact version {:?} does not match {:?}",
                artifact.model_version, MODEL_VERSION
            )));
        }
        Ok(artifact)
    }
}
