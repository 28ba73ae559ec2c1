//! Linear binary classifiers.
//!
//! Responsibilities:
//!
//! - the [`LinearClassifier`] / [`ClassifierTrainer`] seam, so the concrete
//!   algorithm can be swapped without touching the pipeline
//! - a class-weighted linear SVM with Platt-calibrated probabilities
//! - a class-weighted logistic regression
//! - seeded train/test split and held-out metrics
//!
//! Per-feature weights are only meaningful as attributions because every
//! model here is linear in the (scaled) features.

use nalgebra::DMatrix;

use crate::domain::{ClassProbabilities, Label, ModelSpec, TrainConfig};
use crate::error::ScoringError;
use crate::preprocess::FeatureVector;

pub mod calibration;
pub mod logistic;
pub mod metrics;
pub mod split;
pub mod svm;

pub use calibration::PlattScaling;
pub use logistic::{LogisticRegression, LogisticRegressionTrainer};
pub use metrics::{compute_metrics, evaluate};
pub use split::{TrainTestSplit, train_test_split};
pub use svm::{LinearSvm, LinearSvmTrainer};

/// A fitted linear decision function `w . x + b`.
///
/// `x` must be a scaled vector with one entry per trained feature; the
/// pipeline guarantees this through the scaler's dimension check.
pub trait LinearClassifier: std::fmt::Debug + Send + Sync {
    fn spec(&self) -> ModelSpec;

    /// One coefficient per feature, in feature order.
    fn weights(&self) -> &FeatureVector;

    fn intercept(&self) -> f64;

    /// Calibrated class probabilities for `x`.
    fn predict_probability(&self, x: &FeatureVector) -> ClassProbabilities;

    fn decision_value(&self, x: &FeatureVector) -> f64 {
        self.weights().dot(x) + self.intercept()
    }

    /// `Approve` when the decision value is strictly positive.
    fn predict(&self, x: &FeatureVector) -> Label {
        if self.decision_value(x) > 0.0 {
            Label::Approve
        } else {
            Label::Reject
        }
    }

    /// Copy of the linear coefficients used for attribution.
    fn feature_weights(&self) -> FeatureVector {
        self.weights().clone()
    }
}

/// Fits a [`LinearClassifier`] on scaled features.
pub trait ClassifierTrainer {
    fn fit(&self, features: &DMatrix<f64>, labels: &[Label])
    -> Result<Box<dyn LinearClassifier>, ScoringError>;
}

/// Build the trainer selected by `config.model`.
pub fn trainer_for(config: &TrainConfig) -> Box<dyn ClassifierTrainer> {
    match config.model {
        ModelSpec::Svm => Box::new(LinearSvmTrainer::from_config(config)),
        ModelSpec::Logistic => Box::new(LogisticRegressionTrainer::from_config(config)),
    }
}

/// Balanced class weights: `n_samples / (n_classes * n_class)`.
///
/// Indexed by [`Label::as_index`]. Both classes must be present.
pub fn balanced_class_weights(labels: &[Label]) -> Result<[f64; 2], ScoringError> {
    let mut counts = [0usize; 2];
    for label in labels {
        counts[label.as_index()] += 1;
    }
    if counts.iter().any(|&c| c == 0) {
        return Err(ScoringError::Training(format!(
            "both classes are required (reject={}, approve={})",
            counts[0], counts[1]
        )));
    }
    let n = labels.len() as f64;
    Ok([n / (2.0 * counts[0] as f64), n / (2.0 * counts[1] as f64)])
}

pub(crate) fn check_shapes(features: &DMatrix<f64>, labels: &[Label]) -> Result<(), ScoringError> {
    if features.nrows() == 0 {
        return Err(ScoringError::EmptyDataset("no training rows".to_string()));
    }
    if features.nrows() != labels.len() {
        return Err(ScoringError::Training(format!(
            "feature rows ({}) and labels ({}) differ",
            features.nrows(),
            labels.len()
        )));
    }
    if features.iter().any(|v| !v.is_finite()) {
        return Err(ScoringError::Training("non-finite feature value".to_string()));
    }
    Ok(())
}

/// Logistic function, numerically stable on both tails.
pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
