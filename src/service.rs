//! Transport-agnostic classify and feedback endpoints.
//!
//! Maps a [`ClassifyRequest`] onto the shared engine and back into a
//! [`ClassifyResponse`]. Label corrections arrive as [`FeedbackRequest`]s and
//! are appended to a JSON Lines log. Any HTTP or RPC layer only has to
//! (de)serialize these types and turn [`VerityError::Validation`] into a
//! client error.
//!
//! ```no_run
//! use verity::config::VerityConfig;
//! use verity::ml::EngineHandle;
//! use verity::service::{ClassifyRequest, classify};
//!
//! let handle = EngineHandle::from_config(VerityConfig::default()).unwrap();
//! let request: ClassifyRequest =
//!     serde_json::from_str(r#"{"text": "council approves budget bill"}"#).unwrap();
//! let response = classify(&handle, &request).unwrap();
//! println!("{}", serde_json::to_string(&response).unwrap());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VerityError};
use crate::ml::artifact::MODEL_VERSION;
use crate::ml::bootstrap::EngineHandle;
use crate::ml::classifier::{Classification, TextClassifier};
use crate::storage::ArtifactStore;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifyRequest {
    #[serde(default)]
    pub text: Option<String>,
}

impl ClassifyRequest {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

/// One attributed token in a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub token: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub label: String,
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub highlights: Vec<Highlight>,
    pub model_version: String,
    pub latency_ms: u64,
}

impl From<Classification> for ClassifyResponse {
    fn from(result: Classification) -> Self {
        Self {
            label: normalize_label(&result.label),
            confidence: result.confidence,
            reasons: result.reasons,
            highlights: result
                .highlights
                .into_iter()
                .map(|a| Highlight {
                    token: a.token,
                    score: a.contribution,
                })
                .collect(),
            model_version: MODEL_VERSION.to_string(),
            latency_ms: result.latency.as_millis() as u64,
        }
    }
}

/// Lowercase a label and fold the synonyms of "real" into it.
pub fn normalize_label(label: &str) -> String {
    let label = label.to_lowercase();
    match label.as_str() {
        "true" | "genuine" => "real".to_string(),
        _ => label,
    }
}

/// The request text, or a validation error when it is missing or blank.
pub fn request_text(request: &ClassifyRequest) -> Result<&str> {
    match request.text.as_deref() {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(VerityError::validation("text is required")),
    }
}

/// Validate the request, initializing the engine if needed, and classify.
pub fn classify(handle: &EngineHandle, request: &ClassifyRequest) -> Result<ClassifyResponse> {
    let text = request_text(request)?;
    let engine = handle.ensure_ready()?;
    Ok(engine.predict(text)?.into())
}

/// Classify with an engine that is already available.
pub fn classify_with(engine: &TextClassifier, request: &ClassifyRequest) -> Result<ClassifyResponse> {
    let text = request_text(request)?;
    Ok(engine.predict(text)?.into())
}

/// A user's correction of a classified sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub sample_id: String,
    pub user_label: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// One line of the feedback log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub timestamp: DateTime<Utc>,
    pub sample_id: String,
    pub user_label: String,
    pub notes: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackResponse {
    pub status: String,
}

/// Append a feedback record to the log `log_name` in `store`.
///
/// `sample_id` and `user_label` are required and trimmed; everything else is
/// stored as given.
pub fn record_feedback(
    store: &dyn ArtifactStore,
    log_name: &str,
    request: &FeedbackRequest,
) -> Result<FeedbackResponse> {
    let sample_id = request.sample_id.trim();
    if sample_id.is_empty() {
        return Err(VerityError::validation("sample_id is required"));
    }
    let user_label = request.user_label.trim();
    if user_label.is_empty() {
        return Err(VerityError::validation("user_label is required"));
    }

    let record = FeedbackRecord {
        timestamp: Utc::now(),
        sample_id: sample_id.to_string(),
        user_label: user_label.to_string(),
        notes: request.notes.clone(),
        text: request.text.clone(),
    };
    let mut line = serde_json::to_vec(&record)?;
    line.push(b'\n');
    store.append(log_name, &line)?;

    log::debug!("recorded feedback for sample {}", record.sample_id);
    Ok(FeedbackResponse {
        status: "ok".to_string(),
    })
}

/// Every record in the feedback log, oldest first. Unparseable lines are
/// skipped.
pub fn read_feedback(store: &dyn ArtifactStore, log_name: &str) -> Result<Vec<FeedbackRecord>> {
    let Some(bytes) = store.read(log_name)? else {
        return Ok(Vec::new());
    };
    let content = String::from_utf8_lossy(&bytes);
    let mut records = Vec::new();
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        match serde_json::from_str(line) {
            Ok(record) => records.push(record),
            Err(e) => log::warn!("skipping malformed feedback line: {e}"),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::VerityConfig;
    use crate::ml::bootstrap::Bootstrapper;
    use crate::ml::corpus::{InMemoryCorpus, LabeledText};
    use crate::storage::MemoryArtifactStore;

    fn engine(labels: [&str; 2]) -> TextClassifier {
        let samples = vec![
            LabeledText::new("city council approves new budget", labels[0]),
            LabeledText::new("aliens secretly control the weather", labels[1]),
            LabeledText::new("mayor signs budget bill", labels[0]),
            LabeledText::new("miracle cure discovered by aliens", labels[1]),
        ];
        TextClassifier::fit(&samples, &VerityConfig::default()).unwrap()
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("TRUE"), "real");
        assert_eq!(normalize_label("Genuine"), "real");
        assert_eq!(normalize_label("Fake"), "fake");
        assert_eq!(normalize_label("real"), "real");
    }

    #[test]
    fn test_blank_text_rejected_before_engine() {
        // empty corpus: touching the engine would fail with a configuration error
        let bootstrapper = Bootstrapper::new(
            VerityConfig::default(),
            Arc::new(MemoryArtifactStore::new()),
            Arc::new(InMemoryCorpus::default()),
        );
        let handle = EngineHandle::new(bootstrapper);

        for request in [
            ClassifyRequest::default(),
            ClassifyRequest::new(""),
            ClassifyRequest::new("  \n\t "),
        ] {
            assert!(matches!(
                classify(&handle, &request),
                Err(VerityError::Validation(_))
            ));
        }
        assert!(handle.get().is_none());
    }

    #[test]
    fn test_response_mapping() {
        let engine = engine(["TRUE", "fake"]);
        let response =
            classify_with(&engine, &ClassifyRequest::new("council approves budget bill")).unwrap();
        assert_eq!(response.label, "real");
        assert_eq!(response.model_version, "tfidf-logreg-v1");
        assert!(response.confidence > 0.5);
        assert!(!response.highlights.is_empty());
        assert_eq!(response.reasons.len(), 1);
    }

    #[test]
    fn test_json_field_names() {
        let request: ClassifyRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.text, None);

        let engine = engine(["real", "fake"]);
        let response = classify_with(&engine, &ClassifyRequest::new("aliens")).unwrap();
        let json = serde_json::to_value(&response).unwrap();
        for field in [
            "label",
            "confidence",
            "reasons",
            "highlights",
            "model_version",
            "latency_ms",
        ] {
            assert!(json.get(field).is_some(), "missing {field}");
        }
        assert!(json["highlights"][0].get("token").is_some());
        assert!(json["highlights"][0].get("score").is_some());
    }

    #[test]
    fn test_feedback_appends_json_lines() {
        let store = MemoryArtifactStore::new();
        let first = FeedbackRequest {
            sample_id: " s-1 ".to_string(),
            user_label: "fake".to_string(),
            notes: Some("satire site".to_string()),
            text: Some("aliens land downtown".to_string()),
        };
        let response = record_feedback(&store, "feedback.jsonl", &first).unwrap();
        assert_eq!(response.status, "ok");

        let second: FeedbackRequest =
            serde_json::from_str(r#"{"sample_id": "s-2", "user_label": "real"}"#).unwrap();
        record_feedback(&store, "feedback.jsonl", &second).unwrap();

        let bytes = store.read("feedback.jsonl").unwrap().unwrap();
        let content = String::from_utf8(bytes).unwrap();
        assert_eq!(content.lines().count(), 2);
        let line: serde_json::Value =
            serde_json::from_str(content.lines().next().unwrap()).unwrap();
        for field in ["timestamp", "sample_id", "user_label", "notes", "text"] {
            assert!(line.get(field).is_some(), "missing {field}");
        }

        let records = read_feedback(&store, "feedback.jsonl").unwrap();
        assert_eq!(records[0].sample_id, "s-1");
        assert_eq!(records[0].notes.as_deref(), Some("satire site"));
        assert_eq!(records[1].user_label, "real");
        assert_eq!(records[1].text, None);
    }

    #[test]
    fn test_feedback_requires_sample_and_label() {
        let store = MemoryArtifactStore::new();
        for (sample_id, user_label) in [("", "fake"), ("s-1", "  ")] {
            let request = FeedbackRequest {
                sample_id: sample_id.to_string(),
                user_label: user_label.to_string(),
                ..Default::default()
            };
            assert!(matches!(
                record_feedback(&store, "feedback.jsonl", &request),
                Err(VerityError::Validation(_))
            ));
        }
        assert!(store.is_empty());
        assert!(read_feedback(&store, "feedback.jsonl").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_feedback_lines_skipped() {
        let store = MemoryArtifactStore::new();
        store.append("feedback.jsonl", b"not json\n").unwrap();
        let request = FeedbackRequest {
            sample_id: "s-3".to_string(),
            user_label: "real".to_string(),
            ..Default::default()
        };
        record_feedback(&store, "feedback.jsonl", &request).unwrap();
        let records = read_feedback(&store, "feedback.jsonl").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sample_id, "s-3");
    }
}
