//! Terminal reports: training summary, model insights, decisions.

pub mod format;

pub use format::*;
