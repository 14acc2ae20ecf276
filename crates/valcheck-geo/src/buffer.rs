//! Full and outside-only buffers.

use crate::models::polygonal;
use geo::algorithm::bool_ops::BooleanOps;
use geo::algorithm::buffer::Buffer as _;
use geo::{Geometry as GeoGeometry, MultiPolygon};
use valcheck_core::models::BufferStyle;

/// Buffer a geometry by `meters`.
///
/// `OutsideOnly` removes the source area from the buffer, leaving the ring
/// around it. Only polygonal sources have an inside to remove; points and
/// lines get the full buffer either way. Returns `None` when the buffer is
/// empty.
pub fn buffer_geometry(geom: &GeoGeometry, meters: f64, style: BufferStyle) -> Option<MultiPolygon> {
    if !meters.is_finite() || meters <= 0.0 {
        return None;
    }

    let full = geom.buffer(meters);
    let buffered = match (style, polygonal(geom)) {
        (BufferStyle::OutsideOnly, Some(source)) => full.difference(&source),
        _ => full,
    };

    (!buffered.0.is_empty()).then_some(buffered)
}
