//! Export scored decisions (CSV/JSON) and datasets (CSV).
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream
//! scripts. JSON carries a UTC timestamp and the settings that produced it.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{
    DatasetStats, DecisionResult, Feature, FeasibilityPolicy, Label, ModelMetrics, ModelSpec,
    TrainingRow,
};
use crate::error::AppError;
use crate::io::ingest::LABEL_COLUMN;

/// One request's outcome, successful or not.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredApplicant {
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<DecisionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Full report for a scoring run.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionReport {
    pub generated_at: DateTime<Utc>,
    pub model: ModelSpec,
    pub metrics: ModelMetrics,
    pub dataset: DatasetStats,
    pub policy: FeasibilityPolicy,
    pub decisions: Vec<ScoredApplicant>,
}

impl DecisionReport {
    pub fn new(
        model: ModelSpec,
        metrics: ModelMetrics,
        dataset: DatasetStats,
        policy: FeasibilityPolicy,
        decisions: Vec<ScoredApplicant>,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            model,
            metrics,
            dataset,
            policy,
            decisions,
        }
    }
}

/// Weight of one feature in the trained model.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureWeight {
    pub feature: Feature,
    pub weight: f64,
}

/// Summary of a training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub generated_at: DateTime<Utc>,
    pub model: ModelSpec,
    pub metrics: ModelMetrics,
    pub dataset: DatasetStats,
    pub feature_weights: Vec<FeatureWeight>,
}

impl TrainingReport {
    pub fn new(
        model: ModelSpec,
        metrics: ModelMetrics,
        dataset: DatasetStats,
        weights: &[(Feature, f64)],
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            model,
            metrics,
            dataset,
            feature_weights: weights
                .iter()
                .map(|&(feature, weight)| FeatureWeight { feature, weight })
                .collect(),
        }
    }
}

pub fn to_json_string<T: Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value).map_err(|e| AppError::new(4, format!("Failed to encode JSON: {e}")))
}

/// Write a report as pretty JSON.
pub fn write_report_json(path: &Path, report: &DecisionReport) -> Result<(), AppError> {
    let json = to_json_string(report)?;
    std::fs::write(path, json)
        .map_err(|e| AppError::new(2, format!("Failed to write export JSON '{}': {e}", path.display())))
}

const DECISION_HEADER: [&str; 13] = [
    "id",
    "model_label",
    "p_approve",
    "monthly_emi",
    "loan_to_income_pct",
    "debt_to_income_pct",
    "loan_to_income_ok",
    "debt_to_income_ok",
    "affordable",
    "financially_feasible",
    "final_approval",
    "outcome",
    "error",
];

/// Write one line per scored applicant.
pub fn write_decisions_csv(path: &Path, decisions: &[ScoredApplicant]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    writer
        .write_record(DECISION_HEADER)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for d in decisions {
        let id = d.id.clone().unwrap_or_default();
        let record: Vec<String> = match &d.result {
            Some(r) => {
                let f = &r.feasibility;
                vec![
                    id,
                    label_name(r.model_label).to_string(),
                    format!("{:.6}", r.model_probabilities.approve),
                    format!("{:.4}", f.monthly_emi),
                    format!("{:.4}", f.loan_to_income_ratio),
                    format!("{:.4}", f.debt_to_income_ratio),
                    f.loan_to_income_ok.to_string(),
                    f.debt_to_income_ok.to_string(),
                    f.affordable.to_string(),
                    f.financially_feasible.to_string(),
                    r.final_approval.to_string(),
                    format!("{:?}", r.outcome),
                    String::new(),
                ]
            }
            None => {
                let mut record = vec![String::new(); DECISION_HEADER.len()];
                record[0] = id;
                record[DECISION_HEADER.len() - 1] = d.error.clone().unwrap_or_default();
                record
            }
        };
        writer
            .write_record(&record)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV '{}': {e}", path.display())))
}

/// Write labeled rows in the training schema (missing cells left blank).
pub fn write_training_csv(path: &Path, rows: &[TrainingRow]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display())))?;

    let mut header: Vec<&str> = vec!["Loan_ID"];
    header.extend(Feature::ALL.iter().map(|f| f.column()));
    header.push(LABEL_COLUMN);
    writer
        .write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write CSV header: {e}")))?;

    for (i, row) in rows.iter().enumerate() {
        let mut record = vec![format!("LP{:06}", i + 1)];
        for feature in Feature::ALL {
            let cell = match row.record.categorical(feature) {
                Some(label) => label.to_string(),
                None => row
                    .record
                    .numeric(feature)
                    .map(|v| format!("{v}"))
                    .unwrap_or_default(),
            };
            record.push(cell);
        }
        record.push(match row.label {
            Label::Approve => "Y".to_string(),
            Label::Reject => "N".to_string(),
        });
        writer
            .write_record(&record)
            .map_err(|e| AppError::new(2, format!("Failed to write CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush CSV '{}': {e}", path.display())))
}

fn label_name(label: Label) -> &'static str {
    match label {
        Label::Approve => "approve",
        Label::Reject => "reject",
    }
}
