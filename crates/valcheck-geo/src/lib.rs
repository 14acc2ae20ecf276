//! valcheck geo - Geometry algorithms for the reference geometry engine
//!
//! This crate converts canonical geometries to `geo` types and implements
//! buffering, overlay, dissolve merging, measurement and validation.
//!
//! Coordinates are assumed to be in a projected CRS with metre units.

pub mod buffer;
pub mod index;
pub mod measure;
pub mod models;
pub mod overlay;
pub mod validation;
