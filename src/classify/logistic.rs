//! Class-weighted, L2-regularized logistic regression.
//!
//! Minimizes
//!
//! ```text
//! sum_i s(y_i) * logloss(y_i, sigmoid(w . x_i + b)) + 1/(2C) |w|^2
//! ```
//!
//! with Newton steps. The Hessian is small (features + 1 square), so each step
//! is a Cholesky solve. The intercept is not regularized.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use crate::classify::{
    ClassifierTrainer, LinearClassifier, balanced_class_weights, check_shapes, sigmoid,
};
use crate::domain::{ClassProbabilities, Label, ModelSpec, TrainConfig};
use crate::error::ScoringError;
use crate::preprocess::FeatureVector;

/// Newton converges in a handful of steps; more than this means trouble.
const MAX_NEWTON_STEPS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticRegressionTrainer {
    pub c: f64,
    pub max_iter: usize,
    pub tolerance: f64,
}

impl LogisticRegressionTrainer {
    pub fn from_config(config: &TrainConfig) -> Self {
        Self {
            c: config.c,
            max_iter: config.max_iter,
            tolerance: config.tolerance,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogisticRegression {
    weights: FeatureVector,
    intercept: f64,
}

impl LinearClassifier for LogisticRegression {
    fn spec(&self) -> ModelSpec {
        ModelSpec::Logistic
    }

    fn weights(&self) -> &FeatureVector {
        &self.weights
    }

    fn intercept(&self) -> f64 {
        self.intercept
    }

    fn predict_probability(&self, x: &FeatureVector) -> ClassProbabilities {
        ClassProbabilities::from_approve(sigmoid(self.decision_value(x)))
    }
}

impl ClassifierTrainer for LogisticRegressionTrainer {
    fn fit(
        &self,
        features: &DMatrix<f64>,
        labels: &[Label],
    ) -> Result<Box<dyn LinearClassifier>, ScoringError> {
        Ok(Box::new(self.train(features, labels)?))
    }
}

impl LogisticRegressionTrainer {
    pub fn train(
        &self,
        features: &DMatrix<f64>,
        labels: &[Label],
    ) -> Result<LogisticRegression, ScoringError> {
        check_shapes(features, labels)?;
        let class_weights = balanced_class_weights(labels)?;

        let (n, d) = features.shape();
        let design = features.clone().insert_column(d, 1.0);
        let targets: Vec<f64> = labels.iter().map(|l| l.as_index() as f64).collect();
        let sample_weights: Vec<f64> = labels.iter().map(|l| class_weights[l.as_index()]).collect();
        let lambda = 1.0 / self.c;

        let mut beta = DVector::<f64>::zeros(d + 1);
        let mut converged = false;
        let steps = self.max_iter.min(MAX_NEWTON_STEPS);

        for step in 0..steps {
            let z = &design * &beta;
            let mut residual = DVector::<f64>::zeros(n);
            let mut curvature = DVector::<f64>::zeros(n);
            for i in 0..n {
                let p = sigmoid(z[i]);
                residual[i] = sample_weights[i] * (p - targets[i]);
                curvature[i] = sample_weights[i] * p * (1.0 - p);
            }

            let mut gradient = design.transpose() * &residual;
            let mut weighted = design.clone();
            for (i, mut row) in weighted.row_iter_mut().enumerate() {
                row *= curvature[i];
            }
            let mut hessian = design.transpose() * weighted;
            for j in 0..d {
                gradient[j] += lambda * beta[j];
                hessian[(j, j)] += lambda;
            }
            // Keeps the bias row positive definite on separable data.
            hessian[(d, d)] += 1e-10;

            let Some(chol) = hessian.cholesky() else {
                return Err(ScoringError::Training(
                    "logistic Hessian is not positive definite".to_string(),
                ));
            };
            let delta = chol.solve(&gradient);
            beta -= &delta;

            if delta.amax() < self.tolerance {
                converged = true;
                debug!(steps = step + 1, "logistic regression converged");
                break;
            }
        }

        if !converged {
            warn!(steps, "logistic regression hit the step limit before converging");
        }
        if beta.iter().any(|v| !v.is_finite()) {
            return Err(ScoringError::Training("logistic weights diverged".to_string()));
        }

        Ok(LogisticRegression {
            weights: beta.rows(0, d).into_owned(),
            intercept: beta[d],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::test_support::separable_blobs;

    #[test]
    fn learns_the_informative_direction() {
        let (x, y) = separable_blobs(40, 21);
        let model = LogisticRegressionTrainer::from_config(&TrainConfig::default())
            .train(&x, &y)
            .unwrap();
        assert!(model.weights()[0] > 0.0);
        assert!(model.weights()[0].abs() > model.weights()[1].abs());

        let p = model.predict_probability(&DVector::from_vec(vec![2.0, 0.0]));
        assert!(p.approve > 0.9);
        assert_eq!(model.predict(&DVector::from_vec(vec![-2.0, 0.5])), Label::Reject);
    }

    #[test]
    fn probability_agrees_with_decision_sign() {
        let (x, y) = separable_blobs(15, 2);
        let model = LogisticRegressionTrainer::from_config(&TrainConfig::default())
            .fit(&x, &y)
            .unwrap();
        for v in [-1.0, -0.1, 0.2, 1.5] {
            let x = DVector::from_vec(vec![v, 0.0]);
            let approve = model.predict(&x) == Label::Approve;
            assert_eq!(approve, model.predict_probability(&x).approve > 0.5);
        }
    }
}
