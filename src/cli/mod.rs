//! Command-line parsing for the loan approval pipeline.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! modeling code. `app` converts these structs into `TrainConfig` /
//! `ScoringConfig` before anything runs.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{
    ApplicantRecord, FeasibilityPolicy, FinancialContext, LOAN_AMOUNT_UNIT, MAX_DEBT_TO_INCOME_PCT,
    MAX_EMI_INCOME_SHARE, MAX_LOAN_TO_INCOME_PCT, ModelSpec, SUGGESTED_EMI_SHARE, ScoringConfig,
    TrainConfig,
};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "loangate", version, about = "Loan approval: classifier + financial feasibility gate")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Train a model, print held-out metrics and global feature weights.
    Train(TrainArgs),
    /// Train, then score a single applicant given on the command line.
    Score(ScoreArgs),
    /// Train, then score every applicant in a CSV file.
    ScoreBatch(BatchArgs),
    /// Write a synthetic labeled dataset to CSV.
    Generate(GenerateArgs),
}

/// Where training rows come from.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Labeled training CSV (loan-prediction schema with `Loan_Status`).
    #[arg(long, env = "LOAN_DATA_PATH", value_name = "CSV")]
    pub data: Option<PathBuf>,

    /// Rows of synthetic data to train on when no CSV is given.
    #[arg(long, default_value_t = 614)]
    pub synthetic: usize,
}

/// Classifier and split settings.
#[derive(Debug, Args, Clone)]
pub struct ModelArgs {
    /// Classifier to train.
    #[arg(long, value_enum, env = "LOAN_GATE_MODEL", default_value_t = ModelSpec::Svm)]
    pub model: ModelSpec,

    /// Seed for the train/test split, solver and synthetic data.
    #[arg(long, env = "LOAN_GATE_SEED", default_value_t = 42)]
    pub seed: u64,

    /// Share of rows held out for evaluation.
    #[arg(long, env = "LOAN_GATE_TEST_FRACTION", default_value_t = 0.2)]
    pub test_fraction: f64,

    /// Regularization strength (larger = weaker regularization).
    #[arg(short = 'c', long = "regularization", env = "LOAN_GATE_C", default_value_t = 1.0)]
    pub c: f64,

    /// Solver iteration cap.
    #[arg(long, env = "LOAN_GATE_MAX_ITER", default_value_t = 1000)]
    pub max_iter: usize,

    /// Solver convergence tolerance.
    #[arg(long, env = "LOAN_GATE_TOLERANCE", default_value_t = 1e-3)]
    pub tolerance: f64,
}

/// Feasibility thresholds and explanation size.
#[derive(Debug, Args, Clone)]
pub struct PolicyArgs {
    /// Maximum loan-to-income ratio, percent.
    #[arg(long, env = "LOAN_GATE_MAX_LTI", default_value_t = MAX_LOAN_TO_INCOME_PCT)]
    pub max_lti: f64,

    /// Maximum debt-to-income ratio (new EMI included), percent.
    #[arg(long, env = "LOAN_GATE_MAX_DTI", default_value_t = MAX_DEBT_TO_INCOME_PCT)]
    pub max_dti: f64,

    /// Maximum EMI as a share of total monthly income.
    #[arg(long, env = "LOAN_GATE_MAX_EMI_SHARE", default_value_t = MAX_EMI_INCOME_SHARE)]
    pub max_emi_share: f64,

    /// Currency units per `LoanAmount` unit.
    #[arg(long, env = "LOAN_GATE_LOAN_UNIT", default_value_t = LOAN_AMOUNT_UNIT)]
    pub loan_unit: f64,

    /// EMI share used when suggesting an affordable loan amount.
    #[arg(long, env = "LOAN_GATE_SUGGESTED_EMI_SHARE", default_value_t = SUGGESTED_EMI_SHARE)]
    pub suggested_emi_share: f64,

    /// Feature impacts shown per decision.
    #[arg(long, env = "LOAN_GATE_TOP_K", default_value_t = 5)]
    pub top_k: usize,
}

#[derive(Debug, Args, Clone)]
pub struct TrainArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Print JSON instead of the text report.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ScoreArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub policy: PolicyArgs,

    #[command(flatten)]
    pub applicant: ApplicantArgs,

    /// Print JSON instead of the text report.
    #[arg(long)]
    pub json: bool,
}

/// One applicant, field by field.
#[derive(Debug, Args, Clone)]
pub struct ApplicantArgs {
    #[arg(long, default_value = "Male")]
    pub gender: String,

    #[arg(long, default_value = "Yes")]
    pub married: String,

    /// 0, 1, 2 or 3+.
    #[arg(long, default_value = "0")]
    pub dependents: String,

    /// Graduate or "Not Graduate".
    #[arg(long, default_value = "Graduate")]
    pub education: String,

    #[arg(long, default_value = "No")]
    pub self_employed: String,

    /// Monthly income of the applicant.
    #[arg(long)]
    pub applicant_income: f64,

    /// Monthly income of the co-applicant.
    #[arg(long, default_value_t = 0.0)]
    pub coapplicant_income: f64,

    /// Requested amount, in thousands.
    #[arg(long)]
    pub loan_amount: f64,

    /// Term in months.
    #[arg(long, default_value_t = 360.0)]
    pub loan_amount_term: f64,

    /// 1 = meets guidelines, 0 = does not.
    #[arg(long, default_value_t = 1.0)]
    pub credit_history: f64,

    /// Urban, Semiurban or Rural.
    #[arg(long, default_value = "Urban")]
    pub property_area: String,

    /// Existing monthly debt payments.
    #[arg(long, default_value_t = 0.0)]
    pub existing_debt: f64,

    /// Annual interest rate, percent.
    #[arg(long, env = "LOAN_GATE_INTEREST_RATE", default_value_t = 8.5)]
    pub interest_rate: f64,
}

#[derive(Debug, Args, Clone)]
pub struct BatchArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub policy: PolicyArgs,

    /// Applicant CSV (feature columns, optional Loan_ID / Existing_Debt / Interest_Rate).
    #[arg(long, value_name = "CSV")]
    pub input: PathBuf,

    /// Interest rate for rows without an `Interest_Rate` cell.
    #[arg(long, env = "LOAN_GATE_INTEREST_RATE", default_value_t = 8.5)]
    pub interest_rate: f64,

    /// Write decisions to a file (`.json` for the full report, otherwise CSV).
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Print the full JSON report instead of the table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct GenerateArgs {
    /// Number of rows.
    #[arg(short = 'n', long, default_value_t = 614)]
    pub rows: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output CSV path.
    #[arg(short = 'o', long)]
    pub output: PathBuf,
}

impl ModelArgs {
    pub fn train_config(&self) -> TrainConfig {
        TrainConfig {
            model: self.model,
            seed: self.seed,
            test_fraction: self.test_fraction,
            c: self.c,
            max_iter: self.max_iter,
            tolerance: self.tolerance,
        }
    }
}

impl PolicyArgs {
    pub fn scoring_config(&self) -> ScoringConfig {
        ScoringConfig {
            policy: FeasibilityPolicy {
                max_loan_to_income_pct: self.max_lti,
                max_debt_to_income_pct: self.max_dti,
                max_emi_income_share: self.max_emi_share,
                loan_amount_unit: self.loan_unit,
                suggested_emi_share: self.suggested_emi_share,
            },
            top_k: self.top_k,
        }
    }
}

impl ApplicantArgs {
    pub fn record(&self) -> ApplicantRecord {
        ApplicantRecord {
            gender: self.gender.clone(),
            married: self.married.clone(),
            dependents: self.dependents.clone(),
            education: self.education.clone(),
            self_employed: self.self_employed.clone(),
            applicant_income: self.applicant_income,
            coapplicant_income: self.coapplicant_income,
            loan_amount: self.loan_amount,
            loan_amount_term: self.loan_amount_term,
            credit_history: self.credit_history,
            property_area: self.property_area.clone(),
        }
    }

    pub fn context(&self) -> FinancialContext {
        FinancialContext {
            existing_debt: self.existing_debt,
            annual_interest_rate_pct: self.interest_rate,
        }
    }
}
