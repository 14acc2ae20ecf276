pub mod attribute;
pub mod buffer;
pub mod dataset;
pub mod geometry;
pub mod mode;
pub mod result;
pub mod theme;
pub mod work;

pub use attribute::{AttributeValue, Attributes};
pub use buffer::{BufferCatalogue, BufferSource, BufferSpec, BufferStyle, RawBufferEntry};
pub use dataset::{
    resolve_template, BufferSelection, DatasetSpec, PathAliases, RawBuffer, RawDatasetEntry,
    RawModeBuffer, ValueField, DEFAULT_BUFFER,
};
pub use geometry::{Distance, DistanceUnit, Geometry, GeometryType, Measurements};
pub use mode::Mode;
pub use result::{ValueResult, FIELD_NOT_FOUND, REPORT_COLUMNS};
pub use theme::Theme;
pub use work::{WorkFeature, WorkFields};
