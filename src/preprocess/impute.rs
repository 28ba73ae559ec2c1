//! Missing-value imputation learned from the training rows.
//!
//! - categorical columns: most frequent label
//! - `Credit_History`: most frequent value (it is a 0/1 flag)
//! - other numeric columns: median
//!
//! Ties in the most-frequent search resolve to the smallest value so the
//! result does not depend on row order.

use std::collections::BTreeMap;

use crate::domain::{ApplicantRecord, Feature, RawRecord};
use crate::error::ScoringError;

/// How a column's fill value is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImputeStrategy {
    Median,
    MostFrequent,
}

impl ImputeStrategy {
    pub fn for_feature(feature: Feature) -> Self {
        if feature.is_categorical() || feature == Feature::CreditHistory {
            ImputeStrategy::MostFrequent
        } else {
            ImputeStrategy::Median
        }
    }
}

/// Learned fill values, one per feature.
#[derive(Debug, Clone, PartialEq)]
pub struct ImputationValues {
    categorical: BTreeMap<Feature, String>,
    numeric: BTreeMap<Feature, f64>,
}

impl ImputationValues {
    pub fn fit(rows: &[RawRecord]) -> Result<Self, ScoringError> {
        if rows.is_empty() {
            return Err(ScoringError::EmptyDataset(
                "cannot learn imputation values from zero rows".to_string(),
            ));
        }

        let mut categorical = BTreeMap::new();
        let mut numeric = BTreeMap::new();

        for feature in Feature::ALL {
            if feature.is_categorical() {
                let mode = most_frequent_label(rows.iter().filter_map(|r| r.categorical(feature)))
                    .ok_or_else(|| ScoringError::EmptyDataset(format!(
                        "column `{}` has no observed values",
                        feature.column()
                    )))?;
                categorical.insert(feature, mode);
                continue;
            }

            let observed: Vec<f64> = rows
                .iter()
                .filter_map(|r| r.numeric(feature))
                .filter(|v| v.is_finite())
                .collect();
            let fill = match ImputeStrategy::for_feature(feature) {
                ImputeStrategy::Median => median(&observed),
                ImputeStrategy::MostFrequent => most_frequent_value(&observed),
            }
            .ok_or_else(|| ScoringError::EmptyDataset(format!(
                "column `{}` has no observed values",
                feature.column()
            )))?;
            numeric.insert(feature, fill);
        }

        Ok(Self {
            categorical,
            numeric,
        })
    }

    pub fn categorical(&self, feature: Feature) -> Option<&str> {
        self.categorical.get(&feature).map(String::as_str)
    }

    pub fn numeric(&self, feature: Feature) -> Option<f64> {
        self.numeric.get(&feature).copied()
    }

    /// Fill every missing cell of `raw`.
    pub fn complete(&self, raw: &RawRecord) -> ApplicantRecord {
        let cat = |value: &Option<String>, feature: Feature| -> String {
            value
                .clone()
                .or_else(|| self.categorical(feature).map(str::to_string))
                .unwrap_or_default()
        };
        let num = |value: Option<f64>, feature: Feature| -> f64 {
            value
                .filter(|v| v.is_finite())
                .or_else(|| self.numeric(feature))
                .unwrap_or(0.0)
        };

        ApplicantRecord {
            gender: cat(&raw.gender, Feature::Gender),
            married: cat(&raw.married, Feature::Married),
            dependents: cat(&raw.dependents, Feature::Dependents),
            education: cat(&raw.education, Feature::Education),
            self_employed: cat(&raw.self_employed, Feature::SelfEmployed),
            applicant_income: num(raw.applicant_income, Feature::ApplicantIncome),
            coapplicant_income: num(raw.coapplicant_income, Feature::CoapplicantIncome),
            loan_amount: num(raw.loan_amount, Feature::LoanAmount),
            loan_amount_term: num(raw.loan_amount_term, Feature::LoanAmountTerm),
            credit_history: num(raw.credit_history, Feature::CreditHistory),
            property_area: cat(&raw.property_area, Feature::PropertyArea),
        }
    }
}

fn most_frequent_label<'a>(values: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
    }
    // BTreeMap iterates in label order; keep the first label with the max count.
    let mut best: Option<(&str, usize)> = None;
    for (label, count) in counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label.to_string())
}

fn most_frequent_value(values: &[f64]) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut best: Option<(f64, usize)> = None;
    let mut i = 0;
    while i < sorted.len() {
        let v = sorted[i];
        let mut j = i;
        while j < sorted.len() && sorted[j] == v {
            j += 1;
        }
        let count = j - i;
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((v, count));
        }
        i = j;
    }
    best.map(|(v, _)| v)
}

pub(crate) fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}
