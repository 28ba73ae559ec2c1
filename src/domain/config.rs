//! Run configuration as understood by the pipeline.
//!
//! These structs are derived from CLI flags / environment (plus defaults) by
//! `app`, and can also be built directly by library users.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ScoringError;

/// Maximum loan-to-income ratio (percent) accepted by the feasibility gate.
pub const MAX_LOAN_TO_INCOME_PCT: f64 = 40.0;

/// Maximum debt-to-income ratio (percent), new EMI included.
pub const MAX_DEBT_TO_INCOME_PCT: f64 = 43.0;

/// Maximum EMI as a share of total monthly income.
pub const MAX_EMI_INCOME_SHARE: f64 = 0.5;

/// `LoanAmount` is quoted in thousands.
pub const LOAN_AMOUNT_UNIT: f64 = 1000.0;

/// EMI share of income used when suggesting an affordable loan amount.
pub const SUGGESTED_EMI_SHARE: f64 = 0.3;

/// Thresholds of the financial feasibility gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeasibilityPolicy {
    pub max_loan_to_income_pct: f64,
    pub max_debt_to_income_pct: f64,
    pub max_emi_income_share: f64,
    /// Multiplier turning `LoanAmount` into currency units.
    pub loan_amount_unit: f64,
    pub suggested_emi_share: f64,
}

impl Default for FeasibilityPolicy {
    fn default() -> Self {
        Self {
            max_loan_to_income_pct: MAX_LOAN_TO_INCOME_PCT,
            max_debt_to_income_pct: MAX_DEBT_TO_INCOME_PCT,
            max_emi_income_share: MAX_EMI_INCOME_SHARE,
            loan_amount_unit: LOAN_AMOUNT_UNIT,
            suggested_emi_share: SUGGESTED_EMI_SHARE,
        }
    }
}

impl FeasibilityPolicy {
    pub fn validate(&self) -> Result<(), ScoringError> {
        let positive = [
            ("max_loan_to_income_pct", self.max_loan_to_income_pct),
            ("max_debt_to_income_pct", self.max_debt_to_income_pct),
            ("max_emi_income_share", self.max_emi_income_share),
            ("loan_amount_unit", self.loan_amount_unit),
            ("suggested_emi_share", self.suggested_emi_share),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ScoringError::InvalidConfig(format!(
                    "{name} must be finite and > 0, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Which classifier to train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelSpec {
    /// Linear-kernel support vector machine with Platt calibration.
    Svm,
    /// L2-regularized logistic regression.
    Logistic,
}

impl ModelSpec {
    pub fn display_name(self) -> &'static str {
        match self {
            ModelSpec::Svm => "Linear SVM",
            ModelSpec::Logistic => "Logistic regression",
        }
    }
}

/// Training configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub model: ModelSpec,
    /// Seed for the train/test split and solver permutations.
    pub seed: u64,
    pub test_fraction: f64,
    /// Regularization strength (larger = less regularization).
    pub c: f64,
    pub max_iter: usize,
    pub tolerance: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            model: ModelSpec::Svm,
            seed: 42,
            test_fraction: 0.2,
            c: 1.0,
            max_iter: 1000,
            tolerance: 1e-3,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<(), ScoringError> {
        if !(self.test_fraction.is_finite() && self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ScoringError::InvalidConfig(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(ScoringError::InvalidConfig(format!("C must be > 0, got {}", self.c)));
        }
        if self.max_iter == 0 {
            return Err(ScoringError::InvalidConfig("max_iter must be >= 1".to_string()));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ScoringError::InvalidConfig(format!(
                "tolerance must be > 0, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Per-request scoring configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub policy: FeasibilityPolicy,
    /// Number of feature impacts surfaced per decision.
    pub top_k: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            policy: FeasibilityPolicy::default(),
            top_k: 5,
        }
    }
}
