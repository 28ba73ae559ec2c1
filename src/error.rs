//! Error types.
//!
//! - [`ScoringError`]: failures inside the decision pipeline (training or a
//!   single scoring request). Every variant names the offending field/value so
//!   a front-end can render an actionable message.
//! - [`AppError`]: process-level error carrying an exit code for the binary.

use thiserror::Error;

use crate::domain::Feature;

/// Errors raised by preprocessing, training, and scoring.
///
/// A `ScoringError` during a scoring request aborts that request only; the
/// shared trained artifacts are never touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    /// A required training column is absent.
    #[error("missing required column `{column}`")]
    MissingData { column: String },

    /// A categorical value that was never observed during training.
    #[error("unknown category for {}: '{value}' (known: {})", .feature.column(), .known.join(", "))]
    UnknownCategory {
        feature: Feature,
        value: String,
        known: Vec<String>,
    },

    /// Out-of-domain numeric input to the feasibility evaluator or encoder.
    #[error("invalid financial input `{field}` = {value}: {reason}")]
    InvalidFinancialInput {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// No usable rows where at least one was required.
    #[error("empty dataset: {0}")]
    EmptyDataset(String),

    /// A vector did not match the trained feature order.
    #[error("feature mismatch: expected {expected} features, got {got}")]
    FeatureMismatch { expected: usize, got: usize },

    /// The classifier could not be fitted.
    #[error("training failed: {0}")]
    Training(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ScoringError {
    /// Exit code used when this error reaches the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            ScoringError::MissingData { .. }
            | ScoringError::UnknownCategory { .. }
            | ScoringError::InvalidFinancialInput { .. }
            | ScoringError::FeatureMismatch { .. }
            | ScoringError::InvalidConfig(_) => 2,
            ScoringError::EmptyDataset(_) => 3,
            ScoringError::Training(_) => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<ScoringError> for AppError {
    fn from(err: ScoringError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_category_names_field_and_value() {
        let err = ScoringError::UnknownCategory {
            feature: Feature::Gender,
            value: "Other".to_string(),
            known: vec!["Female".to_string(), "Male".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Gender"), "{msg}");
        assert!(msg.contains("'Other'"), "{msg}");
        assert!(msg.contains("Female, Male"), "{msg}");
    }

    #[test]
    fn scoring_errors_map_to_exit_codes() {
        let missing: AppError = ScoringError::MissingData {
            column: "Loan_Status".to_string(),
        }
        .into();
        assert_eq!(missing.exit_code(), 2);

        let empty: AppError = ScoringError::EmptyDataset("no rows".to_string()).into();
        assert_eq!(empty.exit_code(), 3);

        let training: AppError = ScoringError::Training("diverged".to_string()).into();
        assert_eq!(training.exit_code(), 4);
    }
}
