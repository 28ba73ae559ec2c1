//! Synthetic loan-application dataset.
//!
//! Reproducible for a given `(n, seed)`. Marginals loosely follow the classic
//! loan-prediction dataset: mostly male, married graduates, log-normal
//! incomes, 360-month terms, and approval driven mainly by credit history
//! with a smaller pull from the loan-to-income burden.
//!
//! A small share of cells is left empty so imputation is exercised.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{LogNormal, Normal};

use crate::domain::{Label, RawRecord, TrainingRow};
use crate::error::ScoringError;

/// Probability that any single feature cell is left missing.
const MISSING_CELL_PROB: f64 = 0.03;

const GENDER: [(&str, f64); 2] = [("Male", 0.8), ("Female", 0.2)];
const MARRIED: [(&str, f64); 2] = [("Yes", 0.65), ("No", 0.35)];
const DEPENDENTS: [(&str, f64); 4] = [("0", 0.56), ("1", 0.17), ("2", 0.17), ("3+", 0.10)];
const EDUCATION: [(&str, f64); 2] = [("Graduate", 0.78), ("Not Graduate", 0.22)];
const SELF_EMPLOYED: [(&str, f64); 2] = [("No", 0.86), ("Yes", 0.14)];
const PROPERTY_AREA: [(&str, f64); 3] = [("Semiurban", 0.38), ("Urban", 0.33), ("Rural", 0.29)];
const SHORT_TERMS: [f64; 7] = [60.0, 84.0, 120.0, 180.0, 240.0, 300.0, 480.0];

/// Generate `n` labeled rows.
pub fn generate(n: usize, seed: u64) -> Result<Vec<TrainingRow>, ScoringError> {
    if n == 0 {
        return Err(ScoringError::InvalidConfig(
            "synthetic row count must be > 0".to_string(),
        ));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let income = LogNormal::new(4000f64.ln(), 0.55)
        .map_err(|e| ScoringError::InvalidConfig(format!("income distribution: {e}")))?;
    let co_income = LogNormal::new(1600f64.ln(), 0.6)
        .map_err(|e| ScoringError::InvalidConfig(format!("co-income distribution: {e}")))?;
    let noise = Normal::new(0.0, 0.6)
        .map_err(|e| ScoringError::InvalidConfig(format!("noise distribution: {e}")))?;

    let mut rows = Vec::with_capacity(n);
    for _ in 0..n {
        let gender = pick(&mut rng, &GENDER)?;
        let married = pick(&mut rng, &MARRIED)?;
        let dependents = pick(&mut rng, &DEPENDENTS)?;
        let education = pick(&mut rng, &EDUCATION)?;
        let self_employed = pick(&mut rng, &SELF_EMPLOYED)?;
        let property_area = pick(&mut rng, &PROPERTY_AREA)?;

        let applicant_income = income.sample(&mut rng).round();
        let coapplicant_income = if rng.gen_bool(0.45) {
            0.0
        } else {
            co_income.sample(&mut rng).round()
        };
        let total_income = applicant_income + coapplicant_income;

        // Thousands; roughly 2-4% of monthly income per thousand borrowed.
        let loan_amount = (total_income * rng.gen_range(0.018..0.042)).round().clamp(9.0, 700.0);
        let loan_amount_term = if rng.gen_bool(0.85) {
            360.0
        } else {
            SHORT_TERMS[rng.gen_range(0..SHORT_TERMS.len())]
        };
        let credit_history = if rng.gen_bool(0.84) { 1.0 } else { 0.0 };

        // Latent approval score.
        let burden = loan_amount / (total_income / 1000.0) / 30.0;
        let mut score = 2.4 * credit_history - 1.3 - 0.5 * (burden - 1.0);
        if married == "Yes" {
            score += 0.25;
        }
        if property_area == "Semiurban" {
            score += 0.3;
        }
        if education == "Graduate" {
            score += 0.15;
        }
        score += noise.sample(&mut rng);
        let label = if score > 0.0 {
            Label::Approve
        } else {
            Label::Reject
        };

        let record = RawRecord {
            gender: maybe(&mut rng, gender.to_string()),
            married: maybe(&mut rng, married.to_string()),
            dependents: maybe(&mut rng, dependents.to_string()),
            education: Some(education.to_string()),
            self_employed: maybe(&mut rng, self_employed.to_string()),
            applicant_income: Some(applicant_income),
            coapplicant_income: Some(coapplicant_income),
            loan_amount: maybe(&mut rng, loan_amount),
            loan_amount_term: maybe(&mut rng, loan_amount_term),
            credit_history: maybe(&mut rng, credit_history),
            property_area: Some(property_area.to_string()),
        };
        rows.push(TrainingRow { record, label });
    }

    Ok(rows)
}

fn pick(rng: &mut StdRng, choices: &[(&'static str, f64)]) -> Result<&'static str, ScoringError> {
    choices
        .choose_weighted(rng, |(_, weight)| *weight)
        .map(|(label, _)| *label)
        .map_err(|e| ScoringError::InvalidConfig(format!("category weights: {e}")))
}

fn maybe<T>(rng: &mut StdRng, value: T) -> Option<T> {
    if rng.gen_bool(MISSING_CELL_PROB) {
        None
    } else {
        Some(value)
    }
}
