//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{OutputFormat, VerityArgs};
use crate::error::Result;
use crate::ml::attribution::TokenAttribution;
use crate::ml::report::ClassificationReport;
use crate::service::ClassifyResponse;

/// Result structure for a training run.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainingResult {
    pub artifact: String,
    pub classes: Vec<String>,
    pub vocabulary_size: usize,
    pub train_size: usize,
    pub validation_size: usize,
    pub skipped_rows: usize,
    pub report: Option<ClassificationReport>,
}

/// Result structure for an explanation.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExplanationResult {
    pub label: String,
    pub summary: Option<String>,
    pub attributions: Vec<TokenAttribution>,
}

/// Description of a stored model.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub artifact: String,
    pub model_version: String,
    pub trained_at: String,
    pub classes: Vec<String>,
    pub vocabulary_size: usize,
    pub training_documents: usize,
    pub max_ngram: usize,
    /// Strongest terms pushing toward each class.
    pub top_terms: Vec<ClassTerms>,
}

/// Strongest terms for one class.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClassTerms {
    pub label: String,
    pub terms: Vec<(String, f64)>,
}

/// Result structure for recorded feedback.
#[derive(Debug, Serialize, Deserialize)]
pub struct FeedbackResult {
    pub status: String,
    pub log: String,
    pub sample_id: String,
    pub user_label: String,
    /// Records in the log after this one was appended.
    pub total_records: usize,
}

/// Rendering of a command result for people.
pub trait HumanOutput {
    fn print_human(&self);
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize + HumanOutput>(
    message: &str,
    result: &T,
    args: &VerityArgs,
) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            if args.verbosity() > 1 {
                println!("{message}");
                println!();
            }
            result.print_human();
            Ok(())
        }
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &VerityArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

fn print_attributions<'a, I>(attributions: I)
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    for (i, (token, score)) in attributions.into_iter().enumerate() {
        println!("{:>3}. {:<24} {:+.4}", i + 1, token, score);
    }
}

impl HumanOutput for ClassifyResponse {
    fn print_human(&self) {
        println!("Label: {} ({:.1}% confidence)", self.label, self.confidence * 100.0);
        for reason in &self.reasons {
            println!("{reason}");
        }
        if !self.highlights.is_empty() {
            println!();
            println!("Highlights:");
            println!("───────────");
            print_attributions(self.highlights.iter().map(|h| (h.token.as_str(), h.score)));
        }
        println!();
        println!("Model: {}  Latency: {}ms", self.model_version, self.latency_ms);
    }
}

impl HumanOutput for FeedbackResult {
    fn print_human(&self) {
        println!(
            "Feedback recorded: sample {} labeled \"{}\"",
            self.sample_id, self.user_label
        );
        println!("{} records in {}", self.total_records, self.log);
    }
}

impl HumanOutput for ExplanationResult {
    fn print_human(&self) {
        println!("Attributions toward \"{}\":", self.label);
        println!("═══════════════════════");
        if self.attributions.is_empty() {
            println!("No known tokens in the text.");
            return;
        }
        print_attributions(
            self.attributions
                .iter()
                .map(|a| (a.token.as_str(), a.contribution)),
        );
        if let Some(summary) = &self.summary {
            println!();
            println!("{summary}");
        }
    }
}

impl HumanOutput for TrainingResult {
    fn print_human(&self) {
        println!("Model trained and saved to {}", self.artifact);
        println!("Classes: {}", self.classes.join(", "));
        println!("Vocabulary size: {}", self.vocabulary_size);
        println!(
            "Samples: {} training, {} validation, {} skipped",
            self.train_size, self.validation_size, self.skipped_rows
        );
        if let Some(report) = &self.report {
            println!();
            println!("Validation report:");
            println!("{report}");
        }
    }
}

impl HumanOutput for ModelInfo {
    fn print_human(&self) {
        println!("Model Artifact:");
        println!("═══════════════");
        println!("Path: {}", self.artifact);
        println!("Model version: {}", self.model_version);
        println!("Trained at: {}", self.trained_at);
        println!("Classes: {}", self.classes.join(", "));
        println!("Vocabulary size: {}", self.vocabulary_size);
        println!("Training documents: {}", self.training_documents);
        println!("Max n-gram: {}", self.max_ngram);

        for class in &self.top_terms {
            println!();
            println!("Top terms for {}:", class.label);
            println!("─────────────────");
            print_attributions(class.terms.iter().map(|(t, w)| (t.as_str(), *w)));
        }
    }
}
