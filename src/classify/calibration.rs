//! Platt scaling: map raw decision values to probabilities.
//!
//! ```text
//! P(approve | f) = 1 / (1 + exp(A f + B))
//! ```
//!
//! `A` and `B` minimize the cross-entropy against Platt's smoothed targets
//! (`(N+ + 1) / (N+ + 2)` for positives, `1 / (N- + 2)` for negatives), solved
//! with Newton's method plus a backtracking line search. The 2x2 Newton system
//! is solved with nalgebra's LU.

use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

use crate::classify::sigmoid;
use crate::domain::Label;
use crate::error::ScoringError;

const MAX_NEWTON_ITER: usize = 100;
const MIN_STEP: f64 = 1e-10;
/// Hessian ridge keeping the Newton system positive definite.
const HESSIAN_RIDGE: f64 = 1e-12;
const GRADIENT_TOL: f64 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlattScaling {
    pub a: f64,
    pub b: f64,
}

impl PlattScaling {
    pub fn fit(decision_values: &[f64], labels: &[Label]) -> Result<Self, ScoringError> {
        if decision_values.len() != labels.len() || decision_values.is_empty() {
            return Err(ScoringError::Training(format!(
                "calibration needs matching non-empty inputs ({} values, {} labels)",
                decision_values.len(),
                labels.len()
            )));
        }

        let prior1 = labels.iter().filter(|&&l| l == Label::Approve).count() as f64;
        let prior0 = labels.len() as f64 - prior1;
        let hi = (prior1 + 1.0) / (prior1 + 2.0);
        let lo = 1.0 / (prior0 + 2.0);
        let targets: Vec<f64> = labels
            .iter()
            .map(|&l| if l == Label::Approve { hi } else { lo })
            .collect();

        let mut a = 0.0;
        let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
        let mut fval = objective(decision_values, &targets, a, b);

        for _ in 0..MAX_NEWTON_ITER {
            let mut hessian = Matrix2::new(HESSIAN_RIDGE, 0.0, 0.0, HESSIAN_RIDGE);
            let mut gradient = Vector2::<f64>::zeros();

            for (&f, &t) in decision_values.iter().zip(targets.iter()) {
                // p = P(approve | f) under the current (a, b).
                let p = sigmoid(-(a * f + b));
                let q = 1.0 - p;
                let d2 = p * q;
                hessian[(0, 0)] += f * f * d2;
                hessian[(0, 1)] += f * d2;
                hessian[(1, 0)] += f * d2;
                hessian[(1, 1)] += d2;
                let d1 = t - p;
                gradient[0] += f * d1;
                gradient[1] += d1;
            }

            if gradient[0].abs() < GRADIENT_TOL && gradient[1].abs() < GRADIENT_TOL {
                break;
            }

            let Some(newton) = hessian.lu().solve(&gradient) else {
                break;
            };
            let (da, db) = (-newton[0], -newton[1]);
            let slope = gradient[0] * da + gradient[1] * db;

            let mut step = 1.0;
            let mut accepted = false;
            while step >= MIN_STEP {
                let (na, nb) = (a + step * da, b + step * db);
                let nf = objective(decision_values, &targets, na, nb);
                if nf < fval + 1e-4 * step * slope {
                    a = na;
                    b = nb;
                    fval = nf;
                    accepted = true;
                    break;
                }
                step /= 2.0;
            }
            if !accepted {
                break;
            }
        }

        if !(a.is_finite() && b.is_finite()) {
            return Err(ScoringError::Training(
                "probability calibration diverged".to_string(),
            ));
        }
        Ok(Self { a, b })
    }

    pub fn probability(&self, decision_value: f64) -> f64 {
        sigmoid(-(self.a * decision_value + self.b))
    }
}

fn objective(values: &[f64], targets: &[f64], a: f64, b: f64) -> f64 {
    values
        .iter()
        .zip(targets.iter())
        .map(|(&f, &t)| {
            let z = a * f + b;
            if z >= 0.0 {
                t * z + (1.0 + (-z).exp()).ln()
            } else {
                (t - 1.0) * z + (1.0 + z.exp()).ln()
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn larger_margins_get_higher_probability() {
        let values = [-3.0, -2.0, -1.5, -0.5, 0.4, 1.0, 1.7, 2.5, -0.2, 0.3];
        let labels = [
            Label::Reject,
            Label::Reject,
            Label::Reject,
            Label::Reject,
            Label::Approve,
            Label::Approve,
            Label::Approve,
            Label::Approve,
            Label::Approve,
            Label::Reject,
        ];
        let platt = PlattScaling::fit(&values, &labels).unwrap();
        assert!(platt.a < 0.0, "slope should be negative, got {}", platt.a);
        assert!(platt.probability(2.0) > 0.5);
        assert!(platt.probability(-2.0) < 0.5);
        assert!(platt.probability(1.0) > platt.probability(0.0));
    }

    #[test]
    fn uninformative_margins_fall_back_to_prior() {
        let values = [0.0; 4];
        let labels = [Label::Approve, Label::Approve, Label::Approve, Label::Reject];
        let platt = PlattScaling::fit(&values, &labels).unwrap();
        let p = platt.probability(0.0);
        // Smoothed targets average to (3*0.8 + 1/3) / 4.
        let expected = (3.0 * 0.8 + 1.0 / 3.0) / 4.0;
        assert!((p - expected).abs() < 1e-3, "p={p}, expected={expected}");
    }

    #[test]
    fn mismatched_inputs_are_rejected() {
        assert!(PlattScaling::fit(&[1.0], &[]).is_err());
    }
}
