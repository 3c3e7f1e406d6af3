//! # PCBKit Core
//!
//! Geometry store shared by the PCBKit engines: units, points, shapes,
//! geometry and drill sets, the `Artwork` variant and cancellation.

pub mod artwork;
pub mod cancel;
pub mod error;
pub mod geometry;
pub mod types;
pub mod units;

pub use artwork::Artwork;
pub use cancel::CancelToken;
pub use error::{GeometryError, GeometryResult};
pub use geometry::{
    clean_ring, is_ccw, point_in_ring, signed_area, BoundingBox, DrillPoint, DrillSet,
    GeometrySet, Point, Shape, Tool, VERTEX_EPSILON,
};
pub use types::{thread_safe_map, PassCallback, ThreadSafeMap};
pub use units::{Units, MM_PER_INCH};
