//! Standard scaler (z-score normalization).
//!
//! ```text
//! z = (x - mean) / std
//! ```
//!
//! Parameters are fitted once on the training partition and reused verbatim
//! for every inference request. A column whose standard deviation is below
//! [`DEGENERATE_STD_EPS`] is scaled with `std = 1` and reported as degenerate.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::Feature;
use crate::error::ScoringError;
use crate::preprocess::FeatureVector;

/// Standard deviations below this are treated as zero variance.
pub const DEGENERATE_STD_EPS: f64 = 1e-12;

/// Per-feature mean and standard deviation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub mean: Vec<f64>,
    /// Population standard deviation (ddof = 0), with degenerate columns set to 1.
    pub std: Vec<f64>,
    pub degenerate_features: Vec<Feature>,
}

impl ScalerParams {
    /// Fit on a `rows x features` matrix whose columns follow `features`.
    pub fn fit(matrix: &DMatrix<f64>, features: &[Feature]) -> Result<Self, ScoringError> {
        let (rows, cols) = matrix.shape();
        if rows == 0 {
            return Err(ScoringError::EmptyDataset(
                "cannot fit scaler on zero rows".to_string(),
            ));
        }
        if cols != features.len() {
            return Err(ScoringError::FeatureMismatch {
                expected: features.len(),
                got: cols,
            });
        }

        let n = rows as f64;
        let mut mean = Vec::with_capacity(cols);
        let mut std = Vec::with_capacity(cols);
        let mut degenerate_features = Vec::new();

        for (j, column) in matrix.column_iter().enumerate() {
            let mu = column.sum() / n;
            let var = column.iter().map(|x| (x - mu) * (x - mu)).sum::<f64>() / n;
            let sigma = var.sqrt();

            mean.push(mu);
            if sigma.is_finite() && sigma >= DEGENERATE_STD_EPS {
                std.push(sigma);
            } else {
                warn!(
                    feature = %features[j],
                    std = sigma,
                    "degenerate feature: zero training variance, scaling with std=1"
                );
                degenerate_features.push(features[j]);
                std.push(1.0);
            }
        }

        Ok(Self {
            mean,
            std,
            degenerate_features,
        })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Scale a single feature vector.
    pub fn transform(&self, x: &FeatureVector) -> Result<FeatureVector, ScoringError> {
        if x.len() != self.n_features() {
            return Err(ScoringError::FeatureMismatch {
                expected: self.n_features(),
                got: x.len(),
            });
        }
        Ok(DVector::from_iterator(
            x.len(),
            x.iter()
                .zip(self.mean.iter().zip(self.std.iter()))
                .map(|(v, (mu, sigma))| (v - mu) / sigma),
        ))
    }

    /// Scale every row of a matrix.
    pub fn transform_matrix(&self, matrix: &DMatrix<f64>) -> Result<DMatrix<f64>, ScoringError> {
        if matrix.ncols() != self.n_features() {
            return Err(ScoringError::FeatureMismatch {
                expected: self.n_features(),
                got: matrix.ncols(),
            });
        }
        let mut out = matrix.clone();
        for (j, mut column) in out.column_iter_mut().enumerate() {
            let (mu, sigma) = (self.mean[j], self.std[j]);
            column.apply(|v| *v = (*v - mu) / sigma);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardizes_to_zero_mean_unit_variance() {
        let m = DMatrix::from_row_slice(4, 2, &[1.0, 10.0, 2.0, 20.0, 3.0, 30.0, 4.0, 40.0]);
        let params = ScalerParams::fit(&m, &[Feature::ApplicantIncome, Feature::LoanAmount]).unwrap();
        assert!((params.mean[0] - 2.5).abs() < 1e-12);
        assert!((params.std[0] - 1.25f64.sqrt()).abs() < 1e-12);

        let scaled = params.transform_matrix(&m).unwrap();
        for column in scaled.column_iter() {
            let mean = column.sum() / 4.0;
            let var = column.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / 4.0;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn degenerate_column_uses_unit_std() {
        let m = DMatrix::from_row_slice(3, 2, &[5.0, 1.0, 5.0, 2.0, 5.0, 3.0]);
        let params = ScalerParams::fit(&m, &[Feature::CreditHistory, Feature::LoanAmount]).unwrap();
        assert_eq!(params.degenerate_features, vec![Feature::CreditHistory]);
        assert_eq!(params.std[0], 1.0);

        let z = params.transform(&DVector::from_vec(vec![7.0, 2.0])).unwrap();
        assert!((z[0] - 2.0).abs() < 1e-12);
        assert!(z[1].abs() < 1e-12);
    }

    #[test]
    fn transform_rejects_wrong_width() {
        let m = DMatrix::from_row_slice(2, 1, &[1.0, 2.0]);
        let params = ScalerParams::fit(&m, &[Feature::LoanAmount]).unwrap();
        let err = params.transform(&DVector::from_vec(vec![1.0, 2.0])).unwrap_err();
        assert_eq!(err, ScoringError::FeatureMismatch { expected: 1, got: 2 });
    }
}
