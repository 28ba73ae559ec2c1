//! `loan-gate` library crate.
//!
//! The binary (`loangate`) is a thin wrapper around this library so that:
//!
//! - the decision pipeline is testable without spawning processes
//! - a front-end (web form, batch job) can embed [`pipeline::TrainedArtifacts`]
//!   directly

pub mod app;
pub mod classify;
pub mod cli;
pub mod data;
pub mod decision;
pub mod domain;
pub mod error;
pub mod feasibility;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod preprocess;
pub mod report;
