//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the fixed feature order (`Feature`) and class labels (`Label`)
//! - raw and complete applicant records
//! - feasibility / decision outputs and evaluation metrics
//! - run configuration (`FeasibilityPolicy`, `TrainConfig`, `ScoringConfig`)

pub mod config;
pub mod types;

pub use config::*;
pub use types::*;
