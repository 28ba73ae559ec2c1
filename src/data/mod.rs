//! Dataset sources other than CSV files.

pub mod synthetic;

pub use synthetic::generate;
