//! Financial feasibility gate.
//!
//! Pure functions over the applicant's financial fields; the classifier is
//! not involved. Three gates, all configurable through [`FeasibilityPolicy`]:
//!
//! - loan-to-income: `EMI / income * 100 <= max_loan_to_income_pct`
//! - debt-to-income: `(EMI + existing debt) / income * 100 <= max_debt_to_income_pct`
//! - affordability: `EMI <= max_emi_income_share * income`
//!
//! Zero total income is not an error: every ratio is `f64::INFINITY` and every
//! gate fails.

use crate::domain::{ApplicantRecord, FeasibilityPolicy, FeasibilityResult, FinancialContext};
use crate::error::ScoringError;

fn monthly_rate(annual_rate_pct: f64) -> f64 {
    annual_rate_pct / 100.0 / 12.0
}

/// Equated monthly installment for `principal` (currency units).
///
/// A zero rate degenerates to straight-line repayment `principal / months`.
pub fn calculate_emi(principal: f64, annual_rate_pct: f64, months: f64) -> f64 {
    let r = monthly_rate(annual_rate_pct);
    if r == 0.0 {
        return principal / months;
    }
    // Discount form; `(1 + r)^n` itself overflows for very long terms.
    principal * r / (1.0 - (1.0 + r).powf(-months))
}

/// Largest principal whose EMI equals `monthly_income * max_emi_share`.
///
/// Exact inverse of [`calculate_emi`].
pub fn calculate_affordable_loan(
    monthly_income: f64,
    annual_rate_pct: f64,
    months: f64,
    max_emi_share: f64,
) -> f64 {
    let max_emi = monthly_income * max_emi_share;
    let r = monthly_rate(annual_rate_pct);
    if r == 0.0 {
        return max_emi * months;
    }
    max_emi * (1.0 - (1.0 + r).powf(-months)) / r
}

pub fn loan_to_income_ok(ratio_pct: f64, policy: &FeasibilityPolicy) -> bool {
    ratio_pct <= policy.max_loan_to_income_pct
}

pub fn debt_to_income_ok(ratio_pct: f64, policy: &FeasibilityPolicy) -> bool {
    ratio_pct <= policy.max_debt_to_income_pct
}

pub fn is_affordable(monthly_emi: f64, total_income: f64, policy: &FeasibilityPolicy) -> bool {
    total_income > 0.0 && monthly_emi <= policy.max_emi_income_share * total_income
}

fn non_negative(field: &'static str, value: f64) -> Result<f64, ScoringError> {
    if !value.is_finite() {
        return Err(ScoringError::InvalidFinancialInput {
            field,
            value,
            reason: "must be finite",
        });
    }
    if value < 0.0 {
        return Err(ScoringError::InvalidFinancialInput {
            field,
            value,
            reason: "must be non-negative",
        });
    }
    Ok(value)
}

/// Compute EMI, the three ratios and their gates.
///
/// `loan_amount` is in the dataset's unit (thousands by default) and is
/// multiplied by `policy.loan_amount_unit` before amortizing.
pub fn evaluate(
    loan_amount: f64,
    term_months: f64,
    applicant_income: f64,
    coapplicant_income: f64,
    existing_debt: f64,
    annual_rate_pct: f64,
    policy: &FeasibilityPolicy,
) -> Result<FeasibilityResult, ScoringError> {
    let loan_amount = non_negative("LoanAmount", loan_amount)?;
    if !(term_months.is_finite() && term_months > 0.0) {
        return Err(ScoringError::InvalidFinancialInput {
            field: "Loan_Amount_Term",
            value: term_months,
            reason: "must be a positive number of months",
        });
    }
    let applicant_income = non_negative("ApplicantIncome", applicant_income)?;
    let coapplicant_income = non_negative("CoapplicantIncome", coapplicant_income)?;
    let existing_debt = non_negative("existing_debt", existing_debt)?;
    let annual_rate_pct = non_negative("interest_rate", annual_rate_pct)?;

    let principal = loan_amount * policy.loan_amount_unit;
    let monthly_emi = calculate_emi(principal, annual_rate_pct, term_months);
    let total_income = applicant_income + coapplicant_income;

    if total_income <= 0.0 {
        return Ok(FeasibilityResult {
            monthly_emi,
            total_income,
            loan_to_income_ratio: f64::INFINITY,
            debt_to_income_ratio: f64::INFINITY,
            emi_income_share: f64::INFINITY,
            loan_to_income_ok: false,
            debt_to_income_ok: false,
            affordable: false,
            financially_feasible: false,
        });
    }

    let loan_to_income_ratio = monthly_emi * 100.0 / total_income;
    let debt_to_income_ratio = (monthly_emi + existing_debt) * 100.0 / total_income;
    let lti_ok = loan_to_income_ok(loan_to_income_ratio, policy);
    let dti_ok = debt_to_income_ok(debt_to_income_ratio, policy);
    let affordable = is_affordable(monthly_emi, total_income, policy);

    Ok(FeasibilityResult {
        monthly_emi,
        total_income,
        loan_to_income_ratio,
        debt_to_income_ratio,
        emi_income_share: monthly_emi / total_income,
        loan_to_income_ok: lti_ok,
        debt_to_income_ok: dti_ok,
        affordable,
        financially_feasible: lti_ok && dti_ok && affordable,
    })
}

/// [`evaluate`] with the financial fields taken from an applicant record.
pub fn evaluate_applicant(
    applicant: &ApplicantRecord,
    context: &FinancialContext,
    policy: &FeasibilityPolicy,
) -> Result<FeasibilityResult, ScoringError> {
    evaluate(
        applicant.loan_amount,
        applicant.loan_amount_term,
        applicant.applicant_income,
        applicant.coapplicant_income,
        context.existing_debt,
        context.annual_interest_rate_pct,
        policy,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> FeasibilityPolicy {
        FeasibilityPolicy::default()
    }

    #[test]
    fn scenario_standard_mortgage() {
        let r = evaluate(100.0, 360.0, 5000.0, 0.0, 0.0, 8.5, &policy()).unwrap();
        assert!((r.monthly_emi - 768.91).abs() < 0.5, "emi={}", r.monthly_emi);
        assert!((r.loan_to_income_ratio - 15.38).abs() < 0.05);
        assert!(r.loan_to_income_ok);
        assert!(r.debt_to_income_ok);
        assert!(r.affordable);
        assert!(r.financially_feasible);
    }

    #[test]
    fn zero_income_is_infeasible_not_an_error() {
        let r = evaluate(100.0, 360.0, 0.0, 0.0, 0.0, 8.5, &policy()).unwrap();
        assert!(r.loan_to_income_ratio.is_infinite());
        assert!(r.debt_to_income_ratio.is_infinite());
        assert!(!r.loan_to_income_ok);
        assert!(!r.debt_to_income_ok);
        assert!(!r.affordable);
        assert!(!r.financially_feasible);
    }

    #[test]
    fn zero_rate_is_straight_line() {
        assert_eq!(calculate_emi(120_000.0, 0.0, 300.0), 400.0);
        assert_eq!(calculate_affordable_loan(1000.0, 0.0, 300.0, 0.4), 120_000.0);
    }

    #[test]
    fn very_long_terms_stay_finite() {
        let r = evaluate(100.0, 120_000.0, 5000.0, 0.0, 0.0, 8.5, &policy()).unwrap();
        // Interest-only limit: 100_000 * 0.085 / 12.
        assert!((r.monthly_emi - 708.33).abs() < 0.01, "emi={}", r.monthly_emi);
        assert!(r.loan_to_income_ratio.is_finite());
        assert!(r.loan_to_income_ok);
    }

    #[test]
    fn loan_to_income_boundary_is_inclusive() {
        // 120K over 300 months at 0% is exactly 400/month: 40% of 1000.
        let at = evaluate(120.0, 300.0, 1000.0, 0.0, 0.0, 0.0, &policy()).unwrap();
        assert_eq!(at.loan_to_income_ratio, 40.0);
        assert!(at.loan_to_income_ok);

        assert!(!loan_to_income_ok(40.0001, &policy()));
        let over = evaluate(120.0003, 300.0, 1000.0, 0.0, 0.0, 0.0, &policy()).unwrap();
        assert!(over.loan_to_income_ratio > 40.0);
        assert!(!over.loan_to_income_ok);
    }

    #[test]
    fn affordable_loan_inverts_emi() {
        for rate in [0.0, 1.0, 5.0, 8.5, 12.0, 18.0] {
            for months in [12.0, 60.0, 180.0, 360.0, 480.0] {
                let principal = calculate_affordable_loan(6000.0, rate, months, 0.3);
                let emi = calculate_emi(principal, rate, months);
                assert!((emi - 1800.0).abs() < 1e-6, "rate={rate} months={months} emi={emi}");
            }
        }
    }

    #[test]
    fn debt_never_improves_debt_to_income() {
        let mut prev_ratio = f64::NEG_INFINITY;
        let mut was_ok = true;
        for debt in [0.0, 100.0, 500.0, 1000.0, 1400.0, 1500.0, 5000.0] {
            let r = evaluate(100.0, 360.0, 5000.0, 0.0, debt, 8.5, &policy()).unwrap();
            assert!(r.debt_to_income_ratio >= prev_ratio);
            assert!(was_ok || !r.debt_to_income_ok, "gate reopened at debt={debt}");
            prev_ratio = r.debt_to_income_ratio;
            was_ok = r.debt_to_income_ok;
        }
        assert!(!was_ok);
    }

    #[test]
    fn thresholds_follow_the_policy() {
        let strict = FeasibilityPolicy {
            max_loan_to_income_pct: 10.0,
            ..FeasibilityPolicy::default()
        };
        let r = evaluate(100.0, 360.0, 5000.0, 0.0, 0.0, 8.5, &strict).unwrap();
        assert!(!r.loan_to_income_ok);
        assert!(!r.financially_feasible);
    }

    #[test]
    fn rejects_out_of_domain_inputs() {
        let err = evaluate(100.0, 0.0, 5000.0, 0.0, 0.0, 8.5, &policy()).unwrap_err();
        assert!(matches!(
            err,
            ScoringError::InvalidFinancialInput { field: "Loan_Amount_Term", .. }
        ));
        let err = evaluate(100.0, 360.0, -1.0, 0.0, 0.0, 8.5, &policy()).unwrap_err();
        assert!(matches!(
            err,
            ScoringError::InvalidFinancialInput { field: "ApplicantIncome", value, .. } if value == -1.0
        ));
        assert!(evaluate(100.0, 360.0, 5000.0, 0.0, f64::NAN, 8.5, &policy()).is_err());
    }
}
