//! valcheck engine - Values checking jobs
//!
//! This crate runs a job against any [`GeometryEngine`](valcheck_core::GeometryEngine):
//! it materialises the buffer catalogue around the works layer, overlays every
//! applicable dataset per buffer class, and attaches mitigation advice and
//! identifiers to each result.

pub mod applicability;
pub mod buffers;
pub mod checker;
pub mod identifier;
pub mod mitigation;
pub mod models;
pub mod overlay;
pub mod report;
pub mod scope;

#[cfg(test)]
mod testing;

pub use buffers::{resolve_buffers, BufferSet};
pub use checker::ValuesChecker;
pub use models::{JobOutcome, JobSettings, JobStatus, PassRecord, PassStatus};
pub use scope::TempDatasets;
