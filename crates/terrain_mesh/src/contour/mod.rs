//! Raster-to-polygon contour extraction.
//!
//! # Pipeline
//!
//! 1. [`build_edge_set`] runs marching squares over a [`Bitmap`], emitting
//!    deduplicated boundary [`Edge`]s.
//! 2. [`trace_shapes`] chains edges sharing endpoints into [`Shape`]s,
//!    merging collinear runs.
//! 3. [`group_shapes`] assigns hole shapes to the outer shapes containing
//!    them.
//!
//! [`Bitmap`]: crate::raster::Bitmap

mod edge;
mod group;
mod marching;
mod trace;

pub use edge::{ANGLE_STEP_DEGREES, Edge, EdgeSet, grid_key};
pub use group::{ShapeGroup, ShapeRole, classify_shapes, group_shapes, point_in_polygon};
pub use marching::{EDGE_TABLE, EdgeSegment, build_edge_set, case_index};
pub use trace::{Shape, trace_shapes};
