//! Parameter refinement for CSG programs.
//!
//! A [`Refiner`] nudges the numeric leaves of a program toward a target
//! canvas while keeping its token structure fixed; [`refine_batch`] runs it
//! over beams of candidates in parallel.

pub mod batch;
pub mod config;
pub mod search;

pub use batch::{
    BatchError, BatchReport, BeamSummary, group_beams, refine_batch, refine_batch_with,
};
pub use config::{ConfigError, DEFAULT_MAX_LEN, RefineConfig};
pub use search::{
    RefineOutcome, RefineStatus, RefinementError, Refiner, optimize_expression, proposals,
};
