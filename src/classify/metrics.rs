//! Held-out evaluation metrics. Positive class = `Approve`.

use nalgebra::DMatrix;

use crate::classify::LinearClassifier;
use crate::domain::{ConfusionMatrix, Label, ModelMetrics};
use crate::error::ScoringError;

/// Confusion-matrix metrics from predicted and true labels.
///
/// Ratios with an empty denominator are reported as 0.
pub fn compute_metrics(predictions: &[Label], labels: &[Label]) -> ModelMetrics {
    let mut confusion = ConfusionMatrix::default();
    for (&pred, &actual) in predictions.iter().zip(labels.iter()) {
        match (actual, pred) {
            (Label::Reject, Label::Reject) => confusion.tn += 1,
            (Label::Reject, Label::Approve) => confusion.fp += 1,
            (Label::Approve, Label::Reject) => confusion.fn_count += 1,
            (Label::Approve, Label::Approve) => confusion.tp += 1,
        }
    }

    let ratio = |num: usize, den: usize| if den > 0 { num as f64 / den as f64 } else { 0.0 };
    let accuracy = ratio(confusion.tp + confusion.tn, confusion.total());
    let precision = ratio(confusion.tp, confusion.tp + confusion.fp);
    let recall = ratio(confusion.tp, confusion.tp + confusion.fn_count);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    ModelMetrics {
        accuracy,
        precision,
        recall,
        f1,
        confusion,
    }
}

/// Predict every row of a scaled matrix and score against `labels`.
pub fn evaluate(
    model: &dyn LinearClassifier,
    features: &DMatrix<f64>,
    labels: &[Label],
) -> Result<ModelMetrics, ScoringError> {
    if features.nrows() != labels.len() {
        return Err(ScoringError::Training(format!(
            "evaluation rows ({}) and labels ({}) differ",
            features.nrows(),
            labels.len()
        )));
    }
    if features.ncols() != model.weights().len() {
        return Err(ScoringError::FeatureMismatch {
            expected: model.weights().len(),
            got: features.ncols(),
        });
    }
    let predictions: Vec<Label> = (0..features.nrows())
        .map(|i| model.predict(&features.row(i).transpose()))
        .collect();
    Ok(compute_metrics(&predictions, labels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Label::{Approve as A, Reject as R};

    #[test]
    fn counts_and_ratios() {
        let predictions = [A, A, R, R, A];
        let labels = [A, R, R, A, A];
        let m = compute_metrics(&predictions, &labels);
        assert_eq!(m.confusion.as_rows(), [[1, 1], [1, 2]]);
        assert!((m.accuracy - 0.6).abs() < 1e-12);
        assert!((m.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.f1 - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_denominators_are_zero() {
        let m = compute_metrics(&[R, R], &[R, R]);
        assert_eq!(m.accuracy, 1.0);
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.f1, 0.0);
    }
}
