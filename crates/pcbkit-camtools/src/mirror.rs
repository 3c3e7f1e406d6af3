//! Mirroring and registration for double-sided boards.
//!
//! Geometry is reflected about a line through a reference point: axis `X`
//! flips Y coordinates, axis `Y` flips X coordinates. Alignment holes are
//! emitted as pairs of a hole and its reflection so both board sides can be
//! pinned to the same holes.

use crate::error::{require_positive, CamToolResult, ParameterError};
use nalgebra::{Matrix3, Point2, Vector2};
use pcbkit_core::{Artwork, BoundingBox, DrillSet, GeometrySet, Point, Tool, Units};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Tool key used for generated alignment holes.
pub const ALIGNMENT_TOOL_KEY: &str = "1";

/// Mirror axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirrorAxis {
    /// Reflect across a horizontal line (Y is negated)
    X,
    /// Reflect across a vertical line (X is negated)
    Y,
}

impl Default for MirrorAxis {
    fn default() -> Self {
        Self::Y
    }
}

impl fmt::Display for MirrorAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirrorAxis::X => write!(f, "X"),
            MirrorAxis::Y => write!(f, "Y"),
        }
    }
}

impl FromStr for MirrorAxis {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "X" => Ok(Self::X),
            "Y" => Ok(Self::Y),
            other => Err(ParameterError::Unsupported {
                name: "axis".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Where the mirror line passes through.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisReference {
    /// Explicit point on the mirror line
    Point(Point),
    /// Centre of a bounding box
    BoxCenter(BoundingBox),
}

impl AxisReference {
    pub fn origin(&self) -> Point {
        match self {
            AxisReference::Point(p) => *p,
            AxisReference::BoxCenter(bbox) => bbox.center(),
        }
    }
}

/// Homogeneous 2D reflection about the line through `reference`.
pub fn mirror_matrix(axis: MirrorAxis, reference: &AxisReference) -> Matrix3<f64> {
    let origin = reference.origin();
    let scale = match axis {
        MirrorAxis::X => Vector2::new(1.0, -1.0),
        MirrorAxis::Y => Vector2::new(-1.0, 1.0),
    };
    let to_origin = Matrix3::new_translation(&Vector2::new(-origin.x, -origin.y));
    let back = Matrix3::new_translation(&Vector2::new(origin.x, origin.y));
    back * Matrix3::new_nonuniform_scaling(&scale) * to_origin
}

fn apply(matrix: &Matrix3<f64>, p: Point) -> Point {
    let q = matrix.transform_point(&Point2::new(p.x, p.y));
    Point::new(q.x, q.y)
}

/// Reflect a single point.
pub fn mirror_point(p: Point, axis: MirrorAxis, reference: &AxisReference) -> Point {
    apply(&mirror_matrix(axis, reference), p)
}

/// Mirrored copy of `geometry`. The input is left untouched.
pub fn mirror(geometry: &GeometrySet, axis: MirrorAxis, reference: &AxisReference) -> GeometrySet {
    let matrix = mirror_matrix(axis, reference);
    let mut mirrored = geometry.clone();
    for shape in &mut mirrored.shapes {
        shape.transform(|p| apply(&matrix, p));
    }
    mirrored.name = format!("{}_mirror", geometry.name);
    debug!(
        "Mirrored '{}' about {} through ({:.4}, {:.4})",
        geometry.name,
        axis,
        reference.origin().x,
        reference.origin().y
    );
    mirrored
}

/// Mirror stored artwork in place.
pub fn mirror_artwork(artwork: &mut Artwork, axis: MirrorAxis, reference: &AxisReference) {
    let matrix = mirror_matrix(axis, reference);
    artwork.transform(|p| apply(&matrix, p));
    debug!("Mirrored '{}' in place about {}", artwork.name(), axis);
}

/// Alignment holes at `holes` and their reflections, interleaved as
/// `[h0, m(h0), h1, m(h1), ...]`, all drilled with tool `"1"`.
pub fn generate_alignment_holes(
    holes: &[Point],
    axis: MirrorAxis,
    reference: &AxisReference,
    drill_diameter: f64,
    units: Units,
) -> CamToolResult<DrillSet> {
    require_positive("drill_diameter", drill_diameter)?;

    let matrix = mirror_matrix(axis, reference);
    let mut drills = DrillSet::new("alignment", units);
    drills.add_tool(Tool::new(ALIGNMENT_TOOL_KEY, drill_diameter))?;
    for hole in holes {
        drills.add_point(*hole, ALIGNMENT_TOOL_KEY)?;
        drills.add_point(apply(&matrix, *hole), ALIGNMENT_TOOL_KEY)?;
    }
    debug!("Generated {} alignment holes", drills.points.len());
    Ok(drills)
}
