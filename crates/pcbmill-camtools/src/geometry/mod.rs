//! Geometry kernel
//!
//! Pure functions over millimeter geometry: primitives, polygons with holes,
//! boolean operations, offsetting and containment. All equality and
//! containment tests use [`EPSILON`].

pub mod boolean;
pub mod offset;
pub mod point;
pub mod polygon;
pub mod primitives;
pub mod shapes;

pub use boolean::{
    intersect, polygons_from_loops, subtract, union, union_all, FillRule, MAX_OVERLAY_VERTICES,
    SLIVER_AREA,
};
pub use offset::{offset, offset_all, JoinStyle};
pub use pcbmill_core::EPSILON;
pub use point::{BoundingBox, Point};
pub use polygon::{
    bounding_box, point_in_polygon, signed_area, total_area, Containment, Polygon, Polyline, Ring,
    Winding,
};
pub use primitives::{flatten_elements, Arc, ArcDirection, BoundaryElement, Segment};
