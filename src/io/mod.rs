//! Input/output helpers.
//!
//! - CSV ingest + validation of training rows and applicant batches (`ingest`)
//! - decision exports (CSV/JSON) and dataset CSV writing (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
