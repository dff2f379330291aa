//! # millcut geometry
//!
//! Fixed-point planar geometry for the millcut CAM core: points and
//! bounding boxes on the integer grid, polygon soups, boolean operations,
//! and Minkowski offset. One internal unit is 10⁻⁶ mm.
//!
//! All operations are pure, deterministic, and total: degenerate input
//! yields the degenerate (usually empty) result rather than an error.

pub mod clip;
pub mod offset;
pub mod path;
pub mod point;

pub use clip::{clip, simplify, ClipOp};
pub use offset::{offset, offset_with_rule};
pub use path::{
    centroid, contains_point, crosses, dedup_vertices, locate_point, paths_bounds,
    proper_crossing, segment_path_crossings, signed_area2, FillRule, Path, Paths, PointLocation,
};
pub use point::{orient, BoundingBox, Point};
