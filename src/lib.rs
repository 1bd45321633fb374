// src/lib.rs

pub mod bench; // db_bench iteration loop and grouped results file
pub mod guards; // guard-key extraction from results logs

pub use guards::{classify_line, extract_guards, LineOutcome};
