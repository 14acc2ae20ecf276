//! valcheck store - Geometry engine adapters
//!
//! [`MemoryEngine`] implements the `GeometryEngine` port over in-memory
//! layers backed by GeoJSON files, with attribute selection handled by
//! [`WhereClause`].

pub mod layer_file;
pub mod memory;
pub mod where_clause;

pub use layer_file::{read_layer, write_layer};
pub use memory::{FeatureRecord, Layer, MemoryEngine};
pub use where_clause::WhereClause;
