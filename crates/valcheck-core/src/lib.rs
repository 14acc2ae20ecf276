//! valcheck core - domain models, dataset matrix, rule tables and configuration
//!
//! This crate contains the domain types and the geometry engine port used by
//! the valcheck evaluation engine.

pub mod config;
pub mod error;
pub mod matrix;
pub mod models;
pub mod ports;
pub mod rules;

pub use error::{engine_error, Result, ValcheckError};
pub use matrix::DatasetMatrix;
pub use ports::{GeometryEngine, LayerHandle, Row};
pub use rules::RuleTables;
