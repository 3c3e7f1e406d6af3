//! Board cutout with retention bridges.
//!
//! The cut runs around the artwork bounds grown by `margin + d/2`. Gaps of
//! width `gap_size + d` are left centred on the gapped edges, so the
//! uncut bridge between the tool edges is exactly `gap_size` wide.

use crate::error::{require_non_negative, require_positive, CamToolResult, ParameterError};
use pcbkit_core::{Artwork, GeometrySet, Point, Shape};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Edges that receive a bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GapPlacement {
    /// Gaps on the top and bottom edges
    TopBottom,
    /// Gaps on the left and right edges
    LeftRight,
    /// Gaps on all four edges
    FourSided,
}

impl Default for GapPlacement {
    fn default() -> Self {
        Self::FourSided
    }
}

impl fmt::Display for GapPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GapPlacement::TopBottom => write!(f, "top-bottom"),
            GapPlacement::LeftRight => write!(f, "left-right"),
            GapPlacement::FourSided => write!(f, "four-sided"),
        }
    }
}

impl FromStr for GapPlacement {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "top-bottom" | "tb" => Ok(Self::TopBottom),
            "left-right" | "lr" => Ok(Self::LeftRight),
            "four-sided" | "4" => Ok(Self::FourSided),
            other => Err(ParameterError::Unsupported {
                name: "gap_placement".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Parameters for the cutout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutoutParameters {
    /// Tool diameter (document units)
    pub tool_diameter: f64,
    /// Clearance between the artwork bounds and the cut edge
    pub margin: f64,
    /// Width of each retention bridge
    pub gap_size: f64,
    pub gap_placement: GapPlacement,
}

impl Default for CutoutParameters {
    fn default() -> Self {
        Self {
            tool_diameter: 2.0,
            margin: 0.1,
            gap_size: 2.0,
            gap_placement: GapPlacement::FourSided,
        }
    }
}

impl CutoutParameters {
    pub fn validate(&self) -> CamToolResult<()> {
        require_positive("tool_diameter", self.tool_diameter)?;
        require_non_negative("margin", self.margin)?;
        require_non_negative("gap_size", self.gap_size)?;
        Ok(())
    }
}

/// Cut paths around the bounds of `source`.
///
/// Returns independent open paths in a fixed order: two "U" paths for
/// top-bottom and left-right placement, four corner paths for four-sided.
/// A gap that would consume a whole edge is rejected.
pub fn cutout(source: &Artwork, params: &CutoutParameters) -> CamToolResult<GeometrySet> {
    params.validate()?;

    let name = format!("{}_cutout", source.name());
    let mut result = GeometrySet::new(name, source.units());

    let Some(bounds) = source.bounds() else {
        info!("Cutout of '{}' skipped: artwork is empty", source.name());
        return Ok(result);
    };

    let d = params.tool_diameter;
    let rect = bounds.expand(params.margin + d / 2.0);
    let gap = params.gap_size + d;

    let (check_width, check_height) = match params.gap_placement {
        GapPlacement::TopBottom => (true, false),
        GapPlacement::LeftRight => (false, true),
        GapPlacement::FourSided => (true, true),
    };
    if check_width && gap >= rect.width() {
        return Err(ParameterError::Incompatible(format!(
            "gap of {} (gap_size + tool_diameter) does not fit a horizontal edge of length {}",
            gap,
            rect.width()
        ))
        .into());
    }
    if check_height && gap >= rect.height() {
        return Err(ParameterError::Incompatible(format!(
            "gap of {} (gap_size + tool_diameter) does not fit a vertical edge of length {}",
            gap,
            rect.height()
        ))
        .into());
    }

    let hgap = gap / 2.0;
    let mid = rect.center();
    // Counter-clockwise from the left end of the top gap
    let pts = [
        Point::new(mid.x - hgap, rect.max_y),
        Point::new(rect.min_x, rect.max_y),
        Point::new(rect.min_x, mid.y + hgap),
        Point::new(rect.min_x, mid.y - hgap),
        Point::new(rect.min_x, rect.min_y),
        Point::new(mid.x - hgap, rect.min_y),
        Point::new(mid.x + hgap, rect.min_y),
        Point::new(rect.max_x, rect.min_y),
        Point::new(rect.max_x, mid.y - hgap),
        Point::new(rect.max_x, mid.y + hgap),
        Point::new(rect.max_x, rect.max_y),
        Point::new(mid.x + hgap, rect.max_y),
    ];

    let paths: Vec<Vec<Point>> = match params.gap_placement {
        GapPlacement::TopBottom => vec![
            vec![pts[0], pts[1], pts[4], pts[5]],
            vec![pts[6], pts[7], pts[10], pts[11]],
        ],
        GapPlacement::LeftRight => vec![
            vec![pts[9], pts[10], pts[1], pts[2]],
            vec![pts[3], pts[4], pts[7], pts[8]],
        ],
        GapPlacement::FourSided => vec![
            vec![pts[0], pts[1], pts[2]],
            vec![pts[3], pts[4], pts[5]],
            vec![pts[6], pts[7], pts[8]],
            vec![pts[9], pts[10], pts[11]],
        ],
    };

    debug!(
        "Cutout of '{}': {} paths, {} placement, rectangle {:.4} x {:.4}",
        source.name(),
        paths.len(),
        params.gap_placement,
        rect.width(),
        rect.height()
    );
    result.extend(paths.into_iter().map(Shape::polyline));
    Ok(result)
}
