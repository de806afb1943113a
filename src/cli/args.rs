//! Command line argument parsing for the Verity CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::config::VerityConfig;
use crate::error::Result;

/// Verity - TF-IDF and logistic regression text classification
#[derive(Parser, Debug, Clone)]
#[command(name = "verity")]
#[command(about = "Classify text as real or fake and explain the decision")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct VerityArgs {
    /// Increase log output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Engine configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the model artifact (overrides the config file)
    #[arg(long, value_name = "DIR", env = "VERITY_ARTIFACT_DIR", global = true)]
    pub artifact_dir: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl VerityArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            // each -v raises the level above the normal default of 1
            self.verbose.saturating_add(1)
        }
    }

    /// Configuration from `--config` (or defaults) with CLI overrides applied.
    pub fn load_config(&self) -> Result<VerityConfig> {
        let mut config = match &self.config {
            Some(path) => VerityConfig::from_file(path)?,
            None => VerityConfig::default(),
        };
        if let Some(dir) = &self.artifact_dir {
            config.bootstrap.artifact_dir = dir.clone();
        }
        Ok(config)
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Train a model and overwrite the stored artifact
    Train(TrainArgs),

    /// Classify a text
    Classify(ClassifyArgs),

    /// Show per-token attributions for a text
    Explain(ExplainArgs),

    /// Describe the stored model artifact
    Inspect(InspectArgs),

    /// Record a corrected label for a classified sample
    Feedback(FeedbackArgs),
}

/// Arguments for training
#[derive(Parser, Debug, Clone)]
pub struct TrainArgs {
    /// CSV corpus with a `text,label` header (default: built-in samples)
    #[arg(long, value_name = "CORPUS_FILE")]
    pub corpus: Option<PathBuf>,
}

/// Arguments for classifying
#[derive(Parser, Debug, Clone)]
pub struct ClassifyArgs {
    /// Text to classify
    #[arg(value_name = "TEXT")]
    pub text: String,
}

/// Arguments for explaining
#[derive(Parser, Debug, Clone)]
pub struct ExplainArgs {
    /// Text to explain
    #[arg(value_name = "TEXT")]
    pub text: String,

    /// Maximum number of tokens to show (default: explain.max_highlights)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Explain toward this label instead of the predicted one
    #[arg(long)]
    pub label: Option<String>,
}

/// Arguments for inspecting the model
#[derive(Parser, Debug, Clone)]
pub struct InspectArgs {
    /// Number of strongest terms to list per class
    #[arg(short, long, default_value = "10")]
    pub top: usize,
}

/// Arguments for recording feedback
#[derive(Parser, Debug, Clone)]
pub struct FeedbackArgs {
    /// Identifier of the classified sample
    #[arg(value_name = "SAMPLE_ID")]
    pub sample_id: String,

    /// Label the sample should have had
    #[arg(value_name = "LABEL")]
    pub label: String,

    /// Free-form notes
    #[arg(long)]
    pub notes: Option<String>,

    /// The classified text
    #[arg(long)]
    pub text: Option<String>,
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
