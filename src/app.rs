//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and installs logging
//! - parses CLI arguments
//! - loads (or generates) training data and trains the model
//! - scores applicants and prints reports
//! - writes optional exports

use std::path::Path;

use clap::Parser;
use tracing::info;

use crate::cli::{BatchArgs, Command, DataArgs, GenerateArgs, ScoreArgs, TrainArgs};
use crate::domain::{FinancialContext, ScoringRequest, TrainConfig, TrainingRow};
use crate::error::AppError;
use crate::io::export::{self, DecisionReport, ScoredApplicant, TrainingReport};
use crate::io::ingest::{self, RowError};
use crate::pipeline::{self, TrainedArtifacts};

/// Skipped rows listed before the summary line.
const ROW_ERROR_LIMIT: usize = 10;

/// Entry point for the `loangate` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    crate::logging::init_tracing("info");

    let cli = crate::cli::Cli::parse();
    match cli.command {
        Command::Train(args) => handle_train(args),
        Command::Score(args) => handle_score(args),
        Command::ScoreBatch(args) => handle_batch(args),
        Command::Generate(args) => handle_generate(args),
    }
}

/// Training rows plus a label for where they came from.
struct TrainingSource {
    label: String,
    rows: Vec<TrainingRow>,
    row_errors: Vec<RowError>,
}

fn load_training(data: &DataArgs, seed: u64) -> Result<TrainingSource, AppError> {
    match &data.data {
        Some(path) => {
            let loaded = ingest::load_training_csv(path)?;
            info!(
                path = %path.display(),
                read = loaded.rows_read,
                used = loaded.rows_used(),
                "loaded training data"
            );
            Ok(TrainingSource {
                label: format!(
                    "{} ({} of {} rows used)",
                    path.display(),
                    loaded.rows_used(),
                    loaded.rows_read
                ),
                rows: loaded.rows,
                row_errors: loaded.row_errors,
            })
        }
        None => {
            let rows = crate::data::generate(data.synthetic, seed)?;
            Ok(TrainingSource {
                label: format!("synthetic ({} rows, seed {seed})", rows.len()),
                rows,
                row_errors: Vec::new(),
            })
        }
    }
}

fn train_from(data: &DataArgs, config: &TrainConfig) -> Result<(TrainingSource, TrainedArtifacts), AppError> {
    let source = load_training(data, config.seed)?;
    let artifacts = pipeline::train(&source.rows, config)?;
    Ok((source, artifacts))
}

fn handle_train(args: TrainArgs) -> Result<(), AppError> {
    let config = args.model.train_config();
    let (source, artifacts) = train_from(&args.data, &config)?;

    if args.json {
        let report = TrainingReport::new(
            config.model,
            *artifacts.metrics(),
            artifacts.stats().clone(),
            &artifacts.global_feature_weights(),
        );
        println!("{}", export::to_json_string(&report)?);
        return Ok(());
    }

    print!("{}", crate::report::format_row_errors(&source.row_errors, ROW_ERROR_LIMIT));
    println!(
        "{}",
        crate::report::format_training_summary(
            &source.label,
            config.model,
            artifacts.stats(),
            artifacts.metrics()
        )
    );
    println!(
        "{}",
        crate::report::format_feature_weights(&artifacts.global_feature_weights())
    );
    Ok(())
}

fn handle_score(args: ScoreArgs) -> Result<(), AppError> {
    let scoring = args.policy.scoring_config();
    scoring.policy.validate()?;
    let (_, artifacts) = train_from(&args.data, &args.model.train_config())?;

    let request = ScoringRequest {
        id: None,
        applicant: args.applicant.record(),
        context: args.applicant.context(),
    };
    let result = artifacts.score(&request, &scoring)?;

    if args.json {
        println!("{}", export::to_json_string(&result)?);
    } else {
        println!(
            "{}",
            crate::report::format_decision(None, &result, &scoring.policy)
        );
    }
    Ok(())
}

fn handle_batch(args: BatchArgs) -> Result<(), AppError> {
    let scoring = args.policy.scoring_config();
    scoring.policy.validate()?;
    let config = args.model.train_config();

    let defaults = FinancialContext {
        annual_interest_rate_pct: args.interest_rate,
        ..FinancialContext::default()
    };
    let batch = ingest::load_applicants_csv(&args.input, defaults)?;
    let (_, artifacts) = train_from(&args.data, &config)?;

    let decisions: Vec<ScoredApplicant> = artifacts
        .score_batch(&batch.requests, &scoring)
        .into_iter()
        .zip(&batch.requests)
        .map(|(result, request)| match result {
            Ok(r) => ScoredApplicant {
                id: request.id.clone(),
                result: Some(r),
                error: None,
            },
            Err(e) => ScoredApplicant {
                id: request.id.clone(),
                result: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    info!(
        applicants = decisions.len(),
        skipped = batch.row_errors.len(),
        "batch scored"
    );

    let report = DecisionReport::new(
        config.model,
        *artifacts.metrics(),
        artifacts.stats().clone(),
        scoring.policy,
        decisions,
    );

    if args.json {
        println!("{}", export::to_json_string(&report)?);
    } else {
        print!("{}", crate::report::format_row_errors(&batch.row_errors, ROW_ERROR_LIMIT));
        println!("{}", crate::report::format_batch_table(&report.decisions));
    }

    if let Some(path) = &args.export {
        write_export(path, &report)?;
    }
    Ok(())
}

fn write_export(path: &Path, report: &DecisionReport) -> Result<(), AppError> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        export::write_report_json(path, report)
    } else {
        export::write_decisions_csv(path, &report.decisions)
    }
}

fn handle_generate(args: GenerateArgs) -> Result<(), AppError> {
    let rows = crate::data::generate(args.rows, args.seed)?;
    export::write_training_csv(&args.output, &rows)?;
    info!(rows = rows.len(), path = %args.output.display(), "wrote synthetic dataset");
    Ok(())
}
