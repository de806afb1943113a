//! Command implementations for the Verity CLI.

use std::sync::Arc;

use anyhow::{Context, Result, bail};

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::VerityConfig;
use crate::ml::artifact::MODEL_VERSION;
use crate::ml::attribution;
use crate::ml::bootstrap::{Bootstrapper, EngineHandle};
use crate::ml::classifier::TextClassifier;
use crate::ml::corpus::{BuiltinCorpus, CorpusSource, CsvFileCorpus};
use crate::service::{self, ClassifyRequest, FeedbackRequest};
use crate::storage::FileArtifactStore;

/// Execute a CLI command.
pub fn execute_command(args: VerityArgs) -> Result<()> {
    let config = args
        .load_config()
        .context("failed to load configuration")?;

    match &args.command {
        Command::Train(train_args) => train(train_args, config, &args),
        Command::Classify(classify_args) => classify(classify_args, config, &args),
        Command::Explain(explain_args) => explain(explain_args, config, &args),
        Command::Inspect(inspect_args) => inspect(inspect_args, config, &args),
        Command::Feedback(feedback_args) => feedback(feedback_args, config, &args),
    }
}

fn artifact_path(config: &VerityConfig) -> String {
    config
        .bootstrap
        .artifact_dir
        .join(&config.bootstrap.artifact_name)
        .display()
        .to_string()
}

fn open_bootstrapper(config: VerityConfig, corpus: Arc<dyn CorpusSource>) -> Result<Bootstrapper> {
    let store = FileArtifactStore::new(&config.bootstrap.artifact_dir).with_context(|| {
        format!(
            "failed to open artifact directory {}",
            config.bootstrap.artifact_dir.display()
        )
    })?;
    Ok(Bootstrapper::new(config, Arc::new(store), corpus))
}

/// Train a model and overwrite the stored artifact.
fn train(args: &TrainArgs, config: VerityConfig, cli_args: &VerityArgs) -> Result<()> {
    let corpus: Arc<dyn CorpusSource> = match &args.corpus {
        Some(path) => {
            if !path.is_file() {
                bail!("corpus file not found: {}", path.display());
            }
            Arc::new(CsvFileCorpus::new(path))
        }
        None => Arc::new(BuiltinCorpus),
    };
    let source = corpus.describe();
    let artifact = artifact_path(&config);

    let handle = EngineHandle::new(open_bootstrapper(config, corpus)?);
    let outcome = handle
        .force_retrain()
        .with_context(|| format!("training from {source} failed"))?;

    let classifier = &outcome.classifier;
    output_result(
        "Model trained successfully",
        &TrainingResult {
            artifact,
            classes: classifier.classes().to_vec(),
            vocabulary_size: classifier.vectorizer().vocabulary_size(),
            train_size: outcome.train_size,
            validation_size: outcome.validation_size,
            skipped_rows: outcome.skipped,
            report: outcome.report.clone(),
        },
        cli_args,
    )?;
    Ok(())
}

fn ready_engine(config: VerityConfig) -> Result<Arc<TextClassifier>> {
    let handle = EngineHandle::new(open_bootstrapper(config, Arc::new(BuiltinCorpus))?);
    handle
        .ensure_ready()
        .context("failed to initialize the classification engine")
}

/// Classify a text.
fn classify(args: &ClassifyArgs, config: VerityConfig, cli_args: &VerityArgs) -> Result<()> {
    // reject blank input before paying for initialization
    let request = ClassifyRequest::new(args.text.as_str());
    service::request_text(&request)?;

    let engine = ready_engine(config)?;
    let response = service::classify_with(&engine, &request)?;
    output_result("Classification", &response, cli_args)?;
    Ok(())
}

/// Show per-token attributions for a text.
fn explain(args: &ExplainArgs, config: VerityConfig, cli_args: &VerityArgs) -> Result<()> {
    let request = ClassifyRequest::new(args.text.as_str());
    let text = service::request_text(&request)?;

    let limit = args.limit.unwrap_or(config.explain.max_highlights);
    let summary_tokens = config.explain.summary_tokens;
    let engine = ready_engine(config)?;

    let label = match &args.label {
        Some(label) => {
            if !engine.classes().iter().any(|c| c == label) {
                bail!(
                    "unknown label {label:?}; the model knows {}",
                    engine.classes().join(", ")
                );
            }
            label.clone()
        }
        None => engine.predict(text)?.label,
    };

    let attributions = engine.explain(text, &label, limit)?;
    output_result(
        "Explanation",
        &ExplanationResult {
            summary: attribution::summarize(&attributions, summary_tokens),
            label,
            attributions,
        },
        cli_args,
    )?;
    Ok(())
}

/// Describe the stored model artifact without training.
fn inspect(args: &InspectArgs, config: VerityConfig, cli_args: &VerityArgs) -> Result<()> {
    let artifact = artifact_path(&config);
    let bootstrapper = open_bootstrapper(config, Arc::new(BuiltinCorpus))?;
    let Some(classifier) = bootstrapper
        .load_artifact()
        .with_context(|| format!("failed to load {artifact}"))?
    else {
        bail!("no model artifact at {artifact}; run `verity train` first");
    };

    let vectorizer = classifier.vectorizer();
    let top_terms = classifier
        .classes()
        .iter()
        .map(|label| {
            let mut weighted: Vec<(String, f64)> = classifier
                .model()
                .weights_toward(label)
                .unwrap_or_default()
                .into_iter()
                .enumerate()
                .filter(|&(_, w)| w > 0.0)
                .filter_map(|(idx, w)| vectorizer.term(idx).map(|t| (t.to_string(), w)))
                .collect();
            weighted.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            weighted.truncate(args.top);
            ClassTerms {
                label: label.clone(),
                terms: weighted,
            }
        })
        .collect();

    output_result(
        "Model artifact",
        &ModelInfo {
            artifact,
            model_version: MODEL_VERSION.to_string(),
            trained_at: classifier.trained_at().to_rfc3339(),
            classes: classifier.classes().to_vec(),
            vocabulary_size: vectorizer.vocabulary_size(),
            training_documents: vectorizer.state().n_documents,
            max_ngram: vectorizer.state().config.max_ngram,
            top_terms,
        },
        cli_args,
    )?;
    Ok(())
}

/// Append a label correction to the feedback log beside the artifact.
fn feedback(args: &FeedbackArgs, config: VerityConfig, cli_args: &VerityArgs) -> Result<()> {
    let bootstrap = &config.bootstrap;
    let store = FileArtifactStore::new(&bootstrap.artifact_dir).with_context(|| {
        format!(
            "failed to open artifact directory {}",
            bootstrap.artifact_dir.display()
        )
    })?;
    let log = store.artifact_path(&bootstrap.feedback_name);

    let request = FeedbackRequest {
        sample_id: args.sample_id.clone(),
        user_label: args.label.clone(),
        notes: args.notes.clone(),
        text: args.text.clone(),
    };
    let response = service::record_feedback(&store, &bootstrap.feedback_name, &request)
        .with_context(|| format!("failed to record feedback in {}", log.display()))?;
    let total_records = service::read_feedback(&store, &bootstrap.feedback_name)?.len();

    output_result(
        "Feedback",
        &FeedbackResult {
            status: response.status,
            log: log.display().to_string(),
            sample_id: request.sample_id.trim().to_string(),
            user_label: request.user_label.trim().to_string(),
            total_records,
        },
        cli_args,
    )?;
    Ok(())
}
