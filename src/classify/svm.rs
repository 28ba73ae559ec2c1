//! Linear support vector machine, class-balanced.
//!
//! Solves the L1-loss soft-margin dual with coordinate descent:
//!
//! ```text
//! min_a  1/2 a'Qa - sum(a)    s.t. 0 <= a_i <= C * w(y_i)
//! Q_ij = y_i y_j [x_i, 1] . [x_j, 1]
//! ```
//!
//! The intercept is folded in as a constant feature. `w(y)` is the balanced
//! class weight, so the minority class gets a proportionally larger box.
//! Coordinates are visited in a fresh seeded permutation every epoch, which
//! keeps the fit reproducible for a given seed.

use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::classify::{
    ClassifierTrainer, LinearClassifier, PlattScaling, balanced_class_weights, check_shapes,
};
use crate::domain::{ClassProbabilities, Label, ModelSpec, TrainConfig};
use crate::error::ScoringError;
use crate::preprocess::FeatureVector;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearSvmTrainer {
    pub c: f64,
    pub max_iter: usize,
    /// Stop when the projected-gradient spread falls below this.
    pub tolerance: f64,
    pub seed: u64,
}

impl LinearSvmTrainer {
    pub fn from_config(config: &TrainConfig) -> Self {
        Self {
            c: config.c,
            max_iter: config.max_iter,
            tolerance: config.tolerance,
            seed: config.seed,
        }
    }
}

impl Default for LinearSvmTrainer {
    fn default() -> Self {
        Self::from_config(&TrainConfig::default())
    }
}

/// Fitted hyperplane plus the Platt mapping for its margins.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSvm {
    weights: FeatureVector,
    intercept: f64,
    calibration: PlattScaling,
    /// Number of training rows with a non-zero dual coefficient.
    support_vectors: usize,
}

impl LinearSvm {
    pub fn calibration(&self) -> PlattScaling {
        self.calibration
    }

    pub fn support_vectors(&self) -> usize {
        self.support_vectors
    }
}

impl LinearClassifier for LinearSvm {
    fn spec(&self) -> ModelSpec {
        ModelSpec::Svm
    }

    fn weights(&self) -> &FeatureVector {
        &self.weights
    }

    fn intercept(&self) -> f64 {
        self.intercept
    }

    fn predict_probability(&self, x: &FeatureVector) -> ClassProbabilities {
        ClassProbabilities::from_approve(self.calibration.probability(self.decision_value(x)))
    }
}

impl ClassifierTrainer for LinearSvmTrainer {
    fn fit(
        &self,
        features: &DMatrix<f64>,
        labels: &[Label],
    ) -> Result<Box<dyn LinearClassifier>, ScoringError> {
        Ok(Box::new(self.train(features, labels)?))
    }
}

impl LinearSvmTrainer {
    /// Fit the concrete model (the trait object wrapper is [`ClassifierTrainer::fit`]).
    pub fn train(&self, features: &DMatrix<f64>, labels: &[Label]) -> Result<LinearSvm, ScoringError> {
        check_shapes(features, labels)?;
        let class_weights = balanced_class_weights(labels)?;

        let (n, d) = features.shape();
        let rows: Vec<DVector<f64>> = (0..n).map(|i| features.row(i).transpose()).collect();
        let signs: Vec<f64> = labels.iter().map(|l| l.sign()).collect();
        let upper: Vec<f64> = labels
            .iter()
            .map(|l| self.c * class_weights[l.as_index()])
            .collect();
        // Diagonal of Q, +1 for the bias column.
        let q_diag: Vec<f64> = rows.iter().map(|x| x.norm_squared() + 1.0).collect();

        let mut w = DVector::<f64>::zeros(d);
        let mut b = 0.0;
        let mut alpha = vec![0.0; n];
        let mut order: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut converged = false;
        let mut epochs = 0;
        for epoch in 0..self.max_iter {
            epochs = epoch + 1;
            order.shuffle(&mut rng);

            let mut pg_max = f64::NEG_INFINITY;
            let mut pg_min = f64::INFINITY;

            for &i in &order {
                let y = signs[i];
                let g = y * (w.dot(&rows[i]) + b) - 1.0;

                let pg = if alpha[i] <= 0.0 {
                    g.min(0.0)
                } else if alpha[i] >= upper[i] {
                    g.max(0.0)
                } else {
                    g
                };
                pg_max = pg_max.max(pg);
                pg_min = pg_min.min(pg);

                if pg.abs() > 1e-12 {
                    let old = alpha[i];
                    alpha[i] = (old - g / q_diag[i]).clamp(0.0, upper[i]);
                    let delta = (alpha[i] - old) * y;
                    w.axpy(delta, &rows[i], 1.0);
                    b += delta;
                }
            }

            // The first sweep starts from a = 0 where every gradient is -1.
            if epoch > 0 && pg_max - pg_min <= self.tolerance {
                converged = true;
                break;
            }
        }

        if !converged {
            warn!(
                epochs,
                tolerance = self.tolerance,
                "svm dual coordinate descent hit max_iter before converging"
            );
        }
        if w.iter().any(|v| !v.is_finite()) || !b.is_finite() {
            return Err(ScoringError::Training("svm weights diverged".to_string()));
        }

        let support_vectors = alpha.iter().filter(|&&a| a > 0.0).count();
        debug!(epochs, converged, support_vectors, bias = b, "svm fitted");

        let margins: Vec<f64> = rows.iter().map(|x| w.dot(x) + b).collect();
        let calibration = PlattScaling::fit(&margins, labels)?;

        Ok(LinearSvm {
            weights: w,
            intercept: b,
            calibration,
            support_vectors,
        })
    }
}
