//! Combine the classifier verdict with the feasibility gate and explain it.
//!
//! Attribution here is the local linear contribution `scaled_x[j] * w[j]`.
//! It is only meaningful because the classifiers are linear in the scaled
//! features; it is a simplification, not a general explainability method.

use crate::domain::{
    ApplicantRecord, DecisionOutcome, FeasibilityPolicy, FeasibilityResult, Feature, FeatureImpact,
    FinancialContext, ImpactDirection, Label, Suggestion,
};
use crate::error::ScoringError;
use crate::feasibility::calculate_affordable_loan;
use crate::preprocess::FeatureVector;

/// Income-to-loan ratio (monthly income per thousand borrowed) below which
/// the applicant is told to earn more or borrow less.
pub const MIN_INCOME_TO_LOAN_RATIO: f64 = 0.01;

/// Approve only when the model approves and every feasibility gate passes.
pub fn decide(model_label: Label, feasibility: &FeasibilityResult) -> bool {
    model_label == Label::Approve && feasibility.financially_feasible
}

pub fn outcome(model_label: Label, financially_feasible: bool) -> DecisionOutcome {
    match (model_label == Label::Approve, financially_feasible) {
        (true, true) => DecisionOutcome::Approved,
        (false, true) => DecisionOutcome::RejectedByModel,
        (true, false) => DecisionOutcome::RejectedByAffordability,
        (false, false) => DecisionOutcome::RejectedByBoth,
    }
}

/// Per-feature impacts sorted by descending absolute value.
///
/// Equal magnitudes keep feature order (the sort is stable).
pub fn rank_feature_impacts(
    scaled: &FeatureVector,
    weights: &FeatureVector,
    features: &[Feature],
    applicant: &ApplicantRecord,
) -> Result<Vec<FeatureImpact>, ScoringError> {
    if scaled.len() != features.len() {
        return Err(ScoringError::FeatureMismatch {
            expected: features.len(),
            got: scaled.len(),
        });
    }
    if weights.len() != features.len() {
        return Err(ScoringError::FeatureMismatch {
            expected: features.len(),
            got: weights.len(),
        });
    }

    let mut impacts: Vec<FeatureImpact> = features
        .iter()
        .zip(scaled.iter().zip(weights.iter()))
        .map(|(&feature, (x, w))| {
            let impact = x * w;
            FeatureImpact {
                feature,
                impact,
                direction: ImpactDirection::of(impact),
                display_value: applicant.display_value(feature),
            }
        })
        .collect();
    impacts.sort_by(|a, b| b.impact.abs().total_cmp(&a.impact.abs()));
    Ok(impacts)
}

/// First `k` entries of a ranked impact list.
pub fn top_k(mut ranked: Vec<FeatureImpact>, k: usize) -> Vec<FeatureImpact> {
    ranked.truncate(k);
    ranked
}

/// Improvement hints for a rejected application.
///
/// `impacts` should be the full ranked list, not just the top-k, so the
/// property-area hint fires whenever that feature pulls the score down.
pub fn suggestions(
    applicant: &ApplicantRecord,
    context: &FinancialContext,
    feasibility: &FeasibilityResult,
    impacts: &[FeatureImpact],
    policy: &FeasibilityPolicy,
) -> Vec<Suggestion> {
    let mut out = Vec::new();

    if applicant.credit_history == 0.0 {
        out.push(Suggestion::ImproveCreditHistory);
    }

    let income = applicant.applicant_income + applicant.coapplicant_income;
    let income_to_loan = if applicant.loan_amount > 0.0 {
        income / applicant.loan_amount
    } else {
        0.0
    };
    if income_to_loan < MIN_INCOME_TO_LOAN_RATIO {
        out.push(Suggestion::IncreaseIncomeOrReduceLoan);
    }

    if !feasibility.loan_to_income_ok {
        out.push(Suggestion::LongerTerm);
    }
    if !feasibility.debt_to_income_ok {
        out.push(Suggestion::ReduceExistingDebt);
    }
    if !feasibility.affordable {
        let principal = calculate_affordable_loan(
            income,
            context.annual_interest_rate_pct,
            applicant.loan_amount_term,
            policy.suggested_emi_share,
        );
        out.push(Suggestion::SmallerLoan {
            affordable_amount: principal / policy.loan_amount_unit,
        });
    }

    if impacts
        .iter()
        .any(|i| i.feature == Feature::PropertyArea && i.impact < 0.0)
    {
        out.push(Suggestion::PropertyArea);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feasibility;
    use nalgebra::DVector;

    fn applicant() -> ApplicantRecord {
        ApplicantRecord {
            gender: "Male".to_string(),
            married: "Yes".to_string(),
            dependents: "0".to_string(),
            education: "Graduate".to_string(),
            self_employed: "No".to_string(),
            applicant_income: 5000.0,
            coapplicant_income: 0.0,
            loan_amount: 100.0,
            loan_amount_term: 360.0,
            credit_history: 1.0,
            property_area: "Urban".to_string(),
        }
    }

    fn gate(ok: bool) -> FeasibilityResult {
        let income = if ok { 5000.0 } else { 0.0 };
        feasibility::evaluate(100.0, 360.0, income, 0.0, 0.0, 8.5, &FeasibilityPolicy::default())
            .unwrap()
    }

    #[test]
    fn final_approval_is_a_conjunction() {
        for label in [Label::Approve, Label::Reject] {
            for ok in [true, false] {
                let f = gate(ok);
                assert_eq!(f.financially_feasible, ok);
                assert_eq!(decide(label, &f), label == Label::Approve && ok);
            }
        }
    }

    #[test]
    fn outcome_names_the_failing_side() {
        assert_eq!(outcome(Label::Approve, true), DecisionOutcome::Approved);
        assert_eq!(outcome(Label::Reject, true), DecisionOutcome::RejectedByModel);
        assert_eq!(outcome(Label::Approve, false), DecisionOutcome::RejectedByAffordability);
        assert_eq!(outcome(Label::Reject, false), DecisionOutcome::RejectedByBoth);
    }

    #[test]
    fn impacts_are_ranked_by_magnitude() {
        let scaled = DVector::from_vec(vec![1.0, -2.0, 0.5, 3.0, -0.1, 0.0, 1.0, 2.0, -1.0, 0.2, 1.5]);
        let weights = DVector::from_vec(vec![0.1, 0.4, -2.0, 0.3, 5.0, 9.0, -0.05, 0.6, 1.1, 0.0, -0.7]);
        let ranked = rank_feature_impacts(&scaled, &weights, &Feature::ALL, &applicant()).unwrap();
        assert_eq!(ranked.len(), 11);

        let top = top_k(ranked, 5);
        assert_eq!(top.len(), 5);
        for pair in top.windows(2) {
            assert!(pair[0].impact.abs() > pair[1].impact.abs());
        }
        // 1.2, -1.1, -1.05, -1.0, 0.9
        assert_eq!(top[0].feature, Feature::LoanAmount);
        assert_eq!(top[0].direction, ImpactDirection::Positive);
        assert_eq!(top[0].display_value, "100");
        assert_eq!(top[1].feature, Feature::LoanAmountTerm);
        assert_eq!(top[1].direction, ImpactDirection::Negative);
        assert_eq!(top[4].feature, Feature::Education);
    }

    #[test]
    fn categorical_impacts_show_original_labels() {
        let scaled = DVector::from_element(11, 1.0);
        let mut weights = DVector::from_element(11, 0.0);
        weights[Feature::PropertyArea.index()] = -3.0;
        let ranked = rank_feature_impacts(&scaled, &weights, &Feature::ALL, &applicant()).unwrap();
        assert_eq!(ranked[0].feature, Feature::PropertyArea);
        assert_eq!(ranked[0].display_value, "Urban");
        assert_eq!(ranked[0].direction.verb(), "negatively");
    }

    #[test]
    fn mismatched_vectors_are_rejected() {
        let err = rank_feature_impacts(
            &DVector::from_element(3, 1.0),
            &DVector::from_element(11, 1.0),
            &Feature::ALL,
            &applicant(),
        )
        .unwrap_err();
        assert_eq!(err, ScoringError::FeatureMismatch { expected: 11, got: 3 });
    }

    #[test]
    fn suggestions_follow_failed_checks() {
        let mut a = applicant();
        a.credit_history = 0.0;
        a.applicant_income = 1000.0;
        let policy = FeasibilityPolicy::default();
        let context = FinancialContext {
            existing_debt: 200.0,
            annual_interest_rate_pct: 8.5,
        };
        let f = feasibility::evaluate_applicant(&a, &context, &policy).unwrap();
        assert!(!f.loan_to_income_ok && !f.debt_to_income_ok && !f.affordable);

        let impacts = vec![FeatureImpact {
            feature: Feature::PropertyArea,
            impact: -0.4,
            direction: ImpactDirection::Negative,
            display_value: "Urban".to_string(),
        }];
        let hints = suggestions(&a, &context, &f, &impacts, &policy);
        assert_eq!(hints[0], Suggestion::ImproveCreditHistory);
        assert!(hints.contains(&Suggestion::LongerTerm));
        assert!(hints.contains(&Suggestion::ReduceExistingDebt));
        assert!(hints.contains(&Suggestion::PropertyArea));
        assert!(!hints.contains(&Suggestion::IncreaseIncomeOrReduceLoan));

        let Some(Suggestion::SmallerLoan { affordable_amount }) = hints
            .iter()
            .find(|s| matches!(s, Suggestion::SmallerLoan { .. }))
        else {
            panic!("expected a smaller-loan suggestion: {hints:?}");
        };
        // 30% of 1000 at 8.5% over 360 months.
        let emi = feasibility::calculate_emi(affordable_amount * 1000.0, 8.5, 360.0);
        assert!((emi - 300.0).abs() < 1e-6);
        assert!(*affordable_amount < a.loan_amount);
    }

    #[test]
    fn tiny_income_relative_to_loan_is_flagged() {
        let mut a = applicant();
        a.applicant_income = 0.5;
        a.loan_amount = 100.0;
        let policy = FeasibilityPolicy::default();
        let context = FinancialContext::default();
        let f = feasibility::evaluate_applicant(&a, &context, &policy).unwrap();
        let hints = suggestions(&a, &context, &f, &[], &policy);
        assert!(hints.contains(&Suggestion::IncreaseIncomeOrReduceLoan));
        assert!(!hints.contains(&Suggestion::ImproveCreditHistory));
    }
}
