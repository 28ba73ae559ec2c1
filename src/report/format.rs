//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the pipeline code stays clean and testable
//! - output changes are localized

use crate::domain::{
    ConfusionMatrix, DatasetStats, DecisionResult, FeasibilityPolicy, FeasibilityResult, Feature,
    Label, ModelMetrics, ModelSpec,
};
use crate::io::export::ScoredApplicant;
use crate::io::ingest::RowError;

const BAR_WIDTH: usize = 24;

/// Dataset summary, class weights and held-out metrics.
pub fn format_training_summary(
    source: &str,
    model: ModelSpec,
    stats: &DatasetStats,
    metrics: &ModelMetrics,
) -> String {
    let mut out = String::new();

    out.push_str("=== loangate - Loan Approval Model ===\n");
    out.push_str(&format!("Data: {source}\n"));
    out.push_str(&format!("Model: {}\n", model.display_name()));
    out.push_str(&format!(
        "Rows: n={} | train={} | test={} | approval rate={:.1}%\n",
        stats.n_rows,
        stats.n_train,
        stats.n_test,
        stats.approval_rate * 100.0
    ));
    out.push_str(&format!(
        "Class weights: reject={:.3} approve={:.3}\n",
        stats.class_weights[Label::Reject.as_index()],
        stats.class_weights[Label::Approve.as_index()],
    ));

    out.push_str("\nHeld-out metrics:\n");
    out.push_str(&format!("- accuracy : {:.2}%\n", metrics.accuracy * 100.0));
    out.push_str(&format!("- precision: {:.3}\n", metrics.precision));
    out.push_str(&format!("- recall   : {:.3}\n", metrics.recall));
    out.push_str(&format!("- f1       : {:.3}\n", metrics.f1));
    out.push('\n');
    out.push_str(&format_confusion_matrix(&metrics.confusion));

    out
}

/// 2x2 table, rows = actual, columns = predicted.
pub fn format_confusion_matrix(confusion: &ConfusionMatrix) -> String {
    let rows = confusion.as_rows();
    let mut out = String::new();
    out.push_str(&format!("{:<16} {:>10} {:>10}\n", "actual \\ pred", "reject", "approve"));
    out.push_str(&format!("{:-<16} {:-<10} {:-<10}\n", "", "", ""));
    out.push_str(&format!("{:<16} {:>10} {:>10}\n", "reject", rows[0][0], rows[0][1]));
    out.push_str(&format!("{:<16} {:>10} {:>10}\n", "approve", rows[1][0], rows[1][1]));
    out
}

/// Global model weights with a sign and a magnitude bar, largest first.
pub fn format_feature_weights(weights: &[(Feature, f64)]) -> String {
    let mut out = String::new();
    out.push_str("Feature weights (scaled inputs):\n");

    let max_abs = weights.iter().map(|(_, w)| w.abs()).fold(0.0, f64::max);
    for (feature, weight) in weights {
        let filled = if max_abs > 0.0 {
            ((weight.abs() / max_abs) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        let glyph = if *weight >= 0.0 { '+' } else { '-' };
        out.push_str(
            format!(
                "{:<18} {:>9.4} {}\n",
                feature.column(),
                weight,
                glyph.to_string().repeat(filled)
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Full explanation of a single decision.
pub fn format_decision(id: Option<&str>, result: &DecisionResult, policy: &FeasibilityPolicy) -> String {
    let mut out = String::new();

    let (label, confidence) = result.headline_confidence();
    out.push_str(&format!(
        "=== {}{} ===\n",
        result.outcome.display_name(),
        id.map(|s| format!(" [{s}]")).unwrap_or_default()
    ));
    out.push_str(&format!(
        "Model: {} (P(approve)={:.1}%) | confidence in {}: {:.1}%\n",
        label_name(result.model_label),
        result.model_probabilities.approve * 100.0,
        label_name(label),
        confidence * 100.0
    ));

    out.push_str("\nFinancial checks:\n");
    out.push_str(&format_feasibility(&result.feasibility, policy));

    out.push_str("\nFactors influencing the model:\n");
    for impact in &result.feature_impacts {
        let icon = if impact.impact > 0.0 { "+" } else { "-" };
        out.push_str(&format!(
            "{icon} {}: {} {} impacts approval ({:+.3})\n",
            impact.feature.column(),
            impact.display_value,
            impact.direction.verb(),
            impact.impact
        ));
    }

    if !result.suggestions.is_empty() {
        out.push_str("\nSuggestions for improvement:\n");
        for s in &result.suggestions {
            out.push_str(&format!("* {}\n", s.message()));
        }
    }

    out
}

fn format_feasibility(f: &FeasibilityResult, policy: &FeasibilityPolicy) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "- monthly EMI       : {:.2} (total income {:.2})\n",
        f.monthly_emi, f.total_income
    ));
    out.push_str(&format!(
        "- loan-to-income    : {} (max {:.0}%) {}\n",
        fmt_pct(f.loan_to_income_ratio),
        policy.max_loan_to_income_pct,
        check(f.loan_to_income_ok)
    ));
    out.push_str(&format!(
        "- debt-to-income    : {} (max {:.0}%) {}\n",
        fmt_pct(f.debt_to_income_ratio),
        policy.max_debt_to_income_pct,
        check(f.debt_to_income_ok)
    ));
    out.push_str(&format!(
        "- EMI share         : {} (max {:.0}%) {}\n",
        fmt_pct(f.emi_income_share * 100.0),
        policy.max_emi_income_share * 100.0,
        check(f.affordable)
    ));
    out
}

/// One line per applicant for batch runs.
pub fn format_batch_table(decisions: &[ScoredApplicant]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<14} {:<8} {:>9} {:>10} {:>8} {:>8} {:<10} {:<30}\n",
            "id", "model", "p_approve", "emi", "lti%", "dti%", "final", "outcome"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<14} {:-<8} {:-<9} {:-<10} {:-<8} {:-<8} {:-<10} {:-<30}\n",
            "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for d in decisions {
        let id = truncate(d.id.as_deref().unwrap_or("-"), 14);
        let line = match (&d.result, &d.error) {
            (Some(r), _) => format!(
                "{:<14} {:<8} {:>9.3} {:>10.2} {:>8} {:>8} {:<10} {:<30}",
                id,
                label_name(r.model_label),
                r.model_probabilities.approve,
                r.feasibility.monthly_emi,
                fmt_pct(r.feasibility.loan_to_income_ratio),
                fmt_pct(r.feasibility.debt_to_income_ratio),
                if r.final_approval { "APPROVED" } else { "REJECTED" },
                r.outcome.display_name()
            ),
            (None, err) => format!("{:<14} error: {}", id, err.as_deref().unwrap_or("unknown")),
        };
        out.push_str(line.trim_end());
        out.push('\n');
    }

    let approved = decisions
        .iter()
        .filter(|d| d.result.as_ref().is_some_and(|r| r.final_approval))
        .count();
    let failed = decisions.iter().filter(|d| d.result.is_none()).count();
    out.push_str(&format!(
        "\n{approved} approved, {} rejected, {failed} failed\n",
        decisions.len() - approved - failed
    ));
    out
}

/// Skipped-row report (first `limit` rows).
pub fn format_row_errors(errors: &[RowError], limit: usize) -> String {
    let mut out = String::new();
    if errors.is_empty() {
        return out;
    }
    out.push_str(&format!("Skipped rows: {}\n", errors.len()));
    for e in errors.iter().take(limit) {
        out.push_str(&format!(
            "  line {}{}: {}\n",
            e.line,
            e.id.as_deref().map(|id| format!(" ({id})")).unwrap_or_default(),
            e.message
        ));
    }
    if errors.len() > limit {
        out.push_str(&format!("  ... and {} more\n", errors.len() - limit));
    }
    out
}

fn label_name(label: Label) -> &'static str {
    match label {
        Label::Approve => "approve",
        Label::Reject => "reject",
    }
}

fn check(ok: bool) -> &'static str {
    if ok { "ok" } else { "FAIL" }
}

fn fmt_pct(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.2}%")
    } else {
        "inf".to_string()
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ClassProbabilities, DecisionOutcome, FeatureImpact, ImpactDirection, Suggestion,
    };
    use crate::feasibility;

    fn rejected() -> DecisionResult {
        let policy = FeasibilityPolicy::default();
        DecisionResult {
            model_label: Label::Approve,
            model_probabilities: ClassProbabilities::from_approve(0.8),
            feasibility: feasibility::evaluate(100.0, 360.0, 0.0, 0.0, 0.0, 8.5, &policy).unwrap(),
            final_approval: false,
            outcome: DecisionOutcome::RejectedByAffordability,
            feature_impacts: vec![FeatureImpact {
                feature: Feature::PropertyArea,
                impact: -0.42,
                direction: ImpactDirection::Negative,
                display_value: "Rural".to_string(),
            }],
            suggestions: vec![Suggestion::LongerTerm],
        }
    }

    #[test]
    fn decision_text_explains_each_part() {
        let text = format_decision(Some("A1"), &rejected(), &FeasibilityPolicy::default());
        assert!(text.contains("REJECTED (financial feasibility checks) [A1]"), "{text}");
        assert!(text.contains("confidence in approve: 80.0%"), "{text}");
        assert!(text.contains("loan-to-income    : inf"), "{text}");
        assert!(text.contains("Property_Area: Rural negatively impacts approval"), "{text}");
        assert!(text.contains("longer loan term"), "{text}");
    }

    #[test]
    fn batch_table_counts_outcomes() {
        let decisions = vec![
            ScoredApplicant {
                id: Some("A1".to_string()),
                result: Some(rejected()),
                error: None,
            },
            ScoredApplicant {
                id: Some("A2".to_string()),
                result: None,
                error: Some("bad".to_string()),
            },
        ];
        let text = format_batch_table(&decisions);
        assert!(text.contains("A2             error: bad"), "{text}");
        assert!(text.contains("0 approved, 1 rejected, 1 failed"), "{text}");
    }

    #[test]
    fn weights_bar_scales_to_largest() {
        let text = format_feature_weights(&[(Feature::CreditHistory, 2.0), (Feature::Gender, -1.0)]);
        assert!(text.contains(&"+".repeat(BAR_WIDTH)));
        assert!(text.contains(&format!(" {}", "-".repeat(BAR_WIDTH / 2))));
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
