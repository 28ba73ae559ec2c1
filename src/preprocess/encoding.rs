//! Bidirectional category encoding.
//!
//! Maps each distinct category label to a dense integer code (0, 1, 2, ...).
//! Codes follow the sorted label order, so the same training values always
//! produce the same mapping.

use std::collections::{BTreeSet, HashMap};

use crate::domain::Feature;
use crate::error::ScoringError;

/// Label <-> code mapping for one categorical feature.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryEncoding {
    feature: Feature,
    /// Labels in code order.
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl CategoryEncoding {
    /// Build an encoding from every observed value.
    pub fn fit<'a>(
        feature: Feature,
        values: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, ScoringError> {
        let distinct: BTreeSet<&str> = values.into_iter().collect();
        if distinct.is_empty() {
            return Err(ScoringError::EmptyDataset(format!(
                "no values observed for categorical column `{}`",
                feature.column()
            )));
        }
        Ok(Self::from_labels(
            feature,
            distinct.into_iter().map(str::to_string).collect(),
        ))
    }

    /// Rebuild from labels already in code order.
    pub fn from_labels(feature: Feature, labels: Vec<String>) -> Self {
        let index = labels
            .iter()
            .enumerate()
            .map(|(code, label)| (label.clone(), code))
            .collect();
        Self {
            feature,
            labels,
            index,
        }
    }

    pub fn feature(&self) -> Feature {
        self.feature
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    /// Code for `label`; unseen labels are an error, never a default code.
    pub fn encode(&self, label: &str) -> Result<usize, ScoringError> {
        self.index
            .get(label)
            .copied()
            .ok_or_else(|| ScoringError::UnknownCategory {
                feature: self.feature,
                value: label.to_string(),
                known: self.labels.clone(),
            })
    }

    /// Original label for `code`.
    pub fn decode(&self, code: usize) -> Option<&str> {
        self.labels.get(code).map(String::as_str)
    }
}
