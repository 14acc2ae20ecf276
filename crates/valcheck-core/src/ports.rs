//! Port trait definitions
//!
//! The evaluation engine talks to spatial data only through
//! [`GeometryEngine`]. Every operation that produces data returns a new
//! [`LayerHandle`]; handles stay valid until deleted.

use crate::error::Result;
use crate::models::{Attributes, BufferStyle, Distance, Geometry, Measurements};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Opaque reference to a layer held by a geometry engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerHandle(String);

impl LayerHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One scanned feature
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Only the requested fields, keyed by name
    pub attributes: Attributes,
    pub geometry: Geometry,
    pub measure: Measurements,
}

/// Port for the geometry and attribute store backing a job
pub trait GeometryEngine {
    /// Whether a source dataset exists at a path
    fn exists(&self, path: &Path) -> bool;

    /// Open a source dataset as a layer
    fn open(&self, path: &Path) -> Result<LayerHandle>;

    /// Buffer every feature of a layer, keeping its attributes.
    ///
    /// `OutsideOnly` returns the ring between the input and its buffer.
    fn buffer(&self, input: &LayerHandle, distance: Distance, style: BufferStyle)
        -> Result<LayerHandle>;

    /// New layer holding the features matching a where clause
    fn select(&self, input: &LayerHandle, where_clause: &str) -> Result<LayerHandle>;

    /// Geometric intersection of layers keeping all attributes of every input
    fn intersect(&self, layers: &[&LayerHandle]) -> Result<LayerHandle>;

    /// Parts of `input` inside `clip_layer`, keeping only the input attributes
    fn clip(&self, input: &LayerHandle, clip_layer: &LayerHandle) -> Result<LayerHandle>;

    /// Merge features sharing the same values for `group_fields`.
    ///
    /// The output carries only the group fields; merged geometries may be
    /// multi-part.
    fn dissolve(&self, input: &LayerHandle, group_fields: &[String]) -> Result<LayerHandle>;

    /// Copy of a layer with `Easting`, `Northing`, `AREA_HA` and `LENGTH_KM`
    /// attributes calculated from each geometry
    fn add_geometry_fields(&self, input: &LayerHandle) -> Result<LayerHandle>;

    fn count(&self, handle: &LayerHandle) -> Result<usize>;

    fn list_fields(&self, handle: &LayerHandle) -> Result<Vec<String>>;

    /// Read every feature with the requested fields and derived measurements
    fn scan(&self, handle: &LayerHandle, fields: &[String]) -> Result<Vec<Row>>;

    /// Write a layer to a dataset file
    fn export(&self, handle: &LayerHandle, dest: &Path) -> Result<()>;

    fn delete(&self, handle: &LayerHandle) -> Result<()>;
}
