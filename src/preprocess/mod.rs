//! Encoding, imputation, and scaling of applicant records.
//!
//! The [`Preprocessor`] is fitted once on the training rows and then applied
//! identically to training rows and live queries:
//!
//! raw record -> impute -> encode categoricals -> feature vector (fixed order)
//!
//! Scaling lives in [`scaler`] and is applied after the train/test split.

use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};

use crate::domain::{ApplicantRecord, Feature, RawRecord};
use crate::error::ScoringError;

pub mod encoding;
pub mod impute;
pub mod scaler;

pub use encoding::CategoryEncoding;
pub use impute::{ImputationValues, ImputeStrategy};
pub use scaler::ScalerParams;

/// Ordered numeric features following [`Feature::ALL`].
pub type FeatureVector = DVector<f64>;

/// Fitted imputation + category encodings.
#[derive(Debug, Clone, PartialEq)]
pub struct Preprocessor {
    encodings: BTreeMap<Feature, CategoryEncoding>,
    imputation: ImputationValues,
}

impl Preprocessor {
    /// Learn fill values, then build one encoding per categorical column from
    /// the imputed values.
    pub fn fit(rows: &[RawRecord]) -> Result<Self, ScoringError> {
        let imputation = ImputationValues::fit(rows)?;
        let completed: Vec<ApplicantRecord> = rows.iter().map(|r| imputation.complete(r)).collect();

        let mut encodings = BTreeMap::new();
        for feature in Feature::CATEGORICAL {
            let encoding = CategoryEncoding::fit(
                feature,
                completed.iter().filter_map(|r| r.categorical(feature)),
            )?;
            encodings.insert(feature, encoding);
        }

        Ok(Self {
            encodings,
            imputation,
        })
    }

    /// Fixed feature order shared by training and inference.
    pub fn feature_order(&self) -> &'static [Feature] {
        &Feature::ALL
    }

    pub fn encoding(&self, feature: Feature) -> Option<&CategoryEncoding> {
        self.encodings.get(&feature)
    }

    pub fn imputation(&self) -> &ImputationValues {
        &self.imputation
    }

    /// Fill missing cells of a training row.
    pub fn complete(&self, raw: &RawRecord) -> ApplicantRecord {
        self.imputation.complete(raw)
    }

    /// Check categories and numeric domains without building a vector.
    pub fn validate(&self, record: &ApplicantRecord) -> Result<(), ScoringError> {
        self.transform(record).map(|_| ())
    }

    /// Map a complete record to its feature vector.
    pub fn transform(&self, record: &ApplicantRecord) -> Result<FeatureVector, ScoringError> {
        let mut values = Vec::with_capacity(Feature::ALL.len());
        for feature in Feature::ALL {
            let value = match record.categorical(feature) {
                Some(label) => {
                    let encoding = self.encodings.get(&feature).ok_or_else(|| {
                        ScoringError::MissingData {
                            column: feature.column().to_string(),
                        }
                    })?;
                    encoding.encode(label)? as f64
                }
                None => {
                    let v = record.numeric(feature).unwrap_or(f64::NAN);
                    if !v.is_finite() {
                        return Err(ScoringError::InvalidFinancialInput {
                            field: feature.column(),
                            value: v,
                            reason: "must be finite",
                        });
                    }
                    if v < 0.0 {
                        return Err(ScoringError::InvalidFinancialInput {
                            field: feature.column(),
                            value: v,
                            reason: "must be non-negative",
                        });
                    }
                    v
                }
            };
            values.push(value);
        }
        Ok(DVector::from_vec(values))
    }

    /// Stack the feature vectors of many records into a `rows x features` matrix.
    pub fn transform_all(&self, records: &[ApplicantRecord]) -> Result<DMatrix<f64>, ScoringError> {
        let n_features = Feature::ALL.len();
        let mut data = Vec::with_capacity(records.len() * n_features);
        for record in records {
            data.extend(self.transform(record)?.iter().copied());
        }
        Ok(DMatrix::from_row_slice(records.len(), n_features, &data))
    }

    /// Display label for a categorical code (reverse lookup).
    pub fn decode(&self, feature: Feature, code: usize) -> Option<&str> {
        self.encodings.get(&feature)?.decode(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(gender: &str, area: &str, income: f64) -> RawRecord {
        RawRecord {
            gender: Some(gender.to_string()),
            married: Some("Yes".to_string()),
            dependents: Some("0".to_string()),
            education: Some("Graduate".to_string()),
            self_employed: Some("No".to_string()),
            applicant_income: Some(income),
            coapplicant_income: Some(0.0),
            loan_amount: Some(120.0),
            loan_amount_term: Some(360.0),
            credit_history: Some(1.0),
            property_area: Some(area.to_string()),
        }
    }

    fn fitted() -> Preprocessor {
        Preprocessor::fit(&[
            raw("Male", "Urban", 5000.0),
            raw("Female", "Rural", 3000.0),
            raw("Male", "Semiurban", 4000.0),
        ])
        .unwrap()
    }

    #[test]
    fn transform_follows_feature_order() {
        let pre = fitted();
        let record = pre.complete(&raw("Male", "Semiurban", 4500.0));
        let x = pre.transform(&record).unwrap();
        assert_eq!(x.len(), 11);
        assert_eq!(x[Feature::Gender.index()], 1.0); // Female=0, Male=1
        assert_eq!(x[Feature::ApplicantIncome.index()], 4500.0);
        assert_eq!(x[Feature::PropertyArea.index()], 1.0); // Rural, Semiurban, Urban
        assert_eq!(pre.decode(Feature::PropertyArea, 1), Some("Semiurban"));
    }

    #[test]
    fn unseen_category_fails_without_default() {
        let pre = fitted();
        let mut record = pre.complete(&raw("Male", "Urban", 4500.0));
        record.gender = "Other".to_string();
        let err = pre.transform(&record).unwrap_err();
        assert!(matches!(
            err,
            ScoringError::UnknownCategory { feature: Feature::Gender, ref value, .. } if value == "Other"
        ));
    }

    #[test]
    fn negative_numeric_input_is_rejected() {
        let pre = fitted();
        let mut record = pre.complete(&raw("Male", "Urban", 4500.0));
        record.applicant_income = -1.0;
        assert!(matches!(
            pre.validate(&record),
            Err(ScoringError::InvalidFinancialInput { field: "ApplicantIncome", .. })
        ));
    }

    #[test]
    fn matrix_rows_match_single_transforms() {
        let pre = fitted();
        let records = vec![
            pre.complete(&raw("Male", "Urban", 1.0)),
            pre.complete(&raw("Female", "Rural", 2.0)),
        ];
        let m = pre.transform_all(&records).unwrap();
        assert_eq!(m.shape(), (2, 11));
        let second = pre.transform(&records[1]).unwrap();
        for j in 0..11 {
            assert_eq!(m[(1, j)], second[j]);
        }
    }
}
