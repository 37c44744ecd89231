#![doc = include_str!("../README.md")]

pub mod accumulator;
pub mod cli;
pub mod emit;
pub mod extract;
pub mod filters;
pub mod genotype;
pub mod input;
pub mod postprocess;
pub mod record;
pub mod registry;
pub mod report;

pub use extract::{extract_core_file, CoreConfig};
pub use report::RunSummary;
