//! Pocket clearing ("paint").
//!
//! Fills the inside of a polygon with tool-centre paths so the swept tool
//! covers the polygon shrunk by the margin. Two strategies:
//!
//! - **standard**: concentric insets of the clearable area, stepping by
//!   `s = d * (1 - overlap)` until nothing is left. Each component gets one
//!   finishing inset of `s / 2` on the step where it vanishes.
//! - **seed**: concentric circles of radius `s/2 + k*s` around a seed point,
//!   clipped to the tool-centre area, followed by that area's boundary.

use crate::error::{
    require_fraction, require_non_negative, require_positive, CamToolError, CamToolResult,
    ParameterError,
};
use crate::offset::{buffer, interior_point, region_contains};
use pcbkit_core::{CancelToken, GeometrySet, PassCallback, Point, Shape, Units};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Upper bound on passes for a single polygon.
const MAX_PASSES: usize = 10_000;

/// Minimum segment count for seed circles.
const MIN_CIRCLE_SEGMENTS: usize = 16;

/// Clearing strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaintMethod {
    Standard,
    Seed,
}

impl Default for PaintMethod {
    fn default() -> Self {
        Self::Standard
    }
}

impl fmt::Display for PaintMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaintMethod::Standard => write!(f, "standard"),
            PaintMethod::Seed => write!(f, "seed"),
        }
    }
}

impl FromStr for PaintMethod {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "seed" => Ok(Self::Seed),
            other => Err(ParameterError::Unsupported {
                name: "method".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Parameters for pocket clearing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaintParameters {
    /// Tool diameter (document units)
    pub tool_diameter: f64,
    /// Fraction of the tool diameter adjacent paths overlap, in `[0, 1)`
    pub overlap: f64,
    /// Material left untouched along the polygon boundary
    pub margin: f64,
    pub method: PaintMethod,
}

impl Default for PaintParameters {
    fn default() -> Self {
        Self {
            tool_diameter: 1.0,
            overlap: 0.15,
            margin: 0.0,
            method: PaintMethod::Standard,
        }
    }
}

impl PaintParameters {
    pub fn validate(&self) -> CamToolResult<()> {
        require_positive("tool_diameter", self.tool_diameter)?;
        require_fraction("overlap", self.overlap)?;
        require_non_negative("margin", self.margin)?;
        Ok(())
    }

    /// Distance between adjacent paths.
    pub fn step(&self) -> f64 {
        self.tool_diameter * (1.0 - self.overlap)
    }
}

/// Clear the polygon of `source` that contains `point`.
///
/// With the seed method, `point` is also the preferred seed. A point outside
/// every polygon is reported as [`CamToolError::LookupMiss`].
pub fn paint(
    source: &GeometrySet,
    point: Point,
    params: &PaintParameters,
    cancel: &CancelToken,
) -> CamToolResult<GeometrySet> {
    params.validate()?;
    let target = source
        .find_polygon(&point)
        .ok_or(CamToolError::LookupMiss {
            x: point.x,
            y: point.y,
        })?;
    let mut set = clear_polygon(target, source.units, params, Some(point), cancel)?;
    set.name = format!("{}_paint", source.name);
    Ok(set)
}

/// Clear a single polygon.
pub fn clear_polygon(
    target: &Shape,
    units: Units,
    params: &PaintParameters,
    seed: Option<Point>,
    cancel: &CancelToken,
) -> CamToolResult<GeometrySet> {
    clear_polygon_with_progress(target, units, params, seed, cancel, &mut |_, _| {})
}

/// Clear a single polygon, reporting each finished pass to `on_pass`.
///
/// Cancellation is checked after each pass; the first pass is always
/// produced.
pub fn clear_polygon_with_progress(
    target: &Shape,
    units: Units,
    params: &PaintParameters,
    seed: Option<Point>,
    cancel: &CancelToken,
    on_pass: PassCallback<'_>,
) -> CamToolResult<GeometrySet> {
    params.validate()?;
    if !target.is_closed() {
        return Err(CamToolError::InvalidParameters(
            "pocket clearing needs a closed polygon".to_string(),
        ));
    }

    let clearable = if params.margin > 0.0 {
        buffer(std::slice::from_ref(target), -params.margin)
    } else {
        vec![target.clone()]
    };

    let mut result = GeometrySet::new("paint", units);
    if clearable.is_empty() {
        info!("Polygon vanishes inside margin {}; nothing to clear", params.margin);
        return Ok(result);
    }

    let passes = match params.method {
        PaintMethod::Standard => standard_passes(&clearable, params, cancel, on_pass),
        PaintMethod::Seed => seed_passes(&clearable, params, seed, cancel, on_pass),
    };
    for pass in passes {
        result.extend(pass);
    }
    debug!(
        "{} clearing produced {} shapes",
        params.method,
        result.len()
    );
    Ok(result)
}

fn standard_passes(
    clearable: &[Shape],
    params: &PaintParameters,
    cancel: &CancelToken,
    on_pass: PassCallback<'_>,
) -> Vec<Vec<Shape>> {
    let step = params.step();
    let mut passes = Vec::new();

    let mut current = buffer(clearable, -params.tool_diameter / 2.0);
    if current.is_empty() {
        info!(
            "Tool of diameter {} does not fit the polygon",
            params.tool_diameter
        );
        return passes;
    }

    loop {
        on_pass(passes.len(), current.len());
        passes.push(current.clone());

        if cancel.is_cancelled() {
            info!("Clearing cancelled after {} passes", passes.len());
            break;
        }
        if passes.len() >= MAX_PASSES {
            warn!("Clearing stopped at {} passes", MAX_PASSES);
            break;
        }

        let next = buffer(&current, -step);

        // Components that vanish on this step get their finishing inset now,
        // even while others carry on
        let vanished: Vec<Shape> = current
            .iter()
            .filter(|c| !next.iter().any(|n| succeeds(c, n)))
            .cloned()
            .collect();
        if !vanished.is_empty() {
            let finishing = buffer(&vanished, -step / 2.0);
            if !finishing.is_empty() {
                on_pass(passes.len(), finishing.len());
                passes.push(finishing);
            }
        }

        if next.is_empty() {
            break;
        }
        current = next;
    }
    passes
}

/// True if `inset` came from shrinking `component`.
fn succeeds(component: &Shape, inset: &Shape) -> bool {
    interior_point(inset).map_or(false, |p| component.contains_point(&p))
}

fn seed_passes(
    clearable: &[Shape],
    params: &PaintParameters,
    seed: Option<Point>,
    cancel: &CancelToken,
    on_pass: PassCallback<'_>,
) -> Vec<Vec<Shape>> {
    let step = params.step();
    let mut passes = Vec::new();

    let area = buffer(clearable, -params.tool_diameter / 2.0);
    if area.is_empty() {
        info!(
            "Tool of diameter {} does not fit the polygon",
            params.tool_diameter
        );
        return passes;
    }

    let seed = match seed.filter(|p| region_contains(&area, p)) {
        Some(p) => Some(p),
        None => area
            .iter()
            .max_by(|a, b| a.area().total_cmp(&b.area()))
            .and_then(interior_point),
    };

    if let Some(seed) = seed {
        let reach = area
            .iter()
            .flat_map(|s| s.rings())
            .flat_map(|r| r.iter())
            .map(|p| p.distance_to(&seed))
            .fold(0.0_f64, f64::max);
        debug!(
            "Seed clearing from ({:.4}, {:.4}), reach {:.4}",
            seed.x, seed.y, reach
        );

        let mut radius = step / 2.0;
        while radius - step / 2.0 <= reach {
            let circle = circle_points(seed, radius, params.tool_diameter);
            let pieces: Vec<Shape> = clip_path(&circle, true, &area)
                .into_iter()
                .map(Shape::polyline)
                .collect();
            on_pass(passes.len(), pieces.len());
            passes.push(pieces);

            if cancel.is_cancelled() {
                info!("Clearing cancelled after {} passes", passes.len());
                return passes;
            }
            if passes.len() >= MAX_PASSES {
                warn!("Clearing stopped at {} passes", MAX_PASSES);
                return passes;
            }
            radius += step;
        }
    } else {
        info!("No interior seed found; emitting boundary only");
    }

    on_pass(passes.len(), area.len());
    passes.push(area);
    passes
}

/// Closed circle approximation with chords no longer than `d / 4`.
fn circle_points(center: Point, radius: f64, tool_diameter: f64) -> Vec<Point> {
    let circumference = 2.0 * PI * radius;
    let segments =
        ((circumference / (tool_diameter / 4.0)).ceil() as usize).max(MIN_CIRCLE_SEGMENTS);
    (0..segments)
        .map(|i| {
            let a = 2.0 * PI * i as f64 / segments as f64;
            Point::new(center.x + radius * a.cos(), center.y + radius * a.sin())
        })
        .collect()
}

/// Parameters `t` in (0, 1) where segment `a`-`b` crosses segment `c`-`d`.
fn segment_crossing(a: Point, b: Point, c: Point, d: Point) -> Option<f64> {
    let r = (b.x - a.x, b.y - a.y);
    let s = (d.x - c.x, d.y - c.y);
    let denom = r.0 * s.1 - r.1 * s.0;
    if denom.abs() < 1e-15 {
        return None;
    }
    let qp = (c.x - a.x, c.y - a.y);
    let t = (qp.0 * s.1 - qp.1 * s.0) / denom;
    let u = (qp.0 * r.1 - qp.1 * r.0) / denom;
    if t > 0.0 && t < 1.0 && (0.0..=1.0).contains(&u) {
        Some(t)
    } else {
        None
    }
}

/// Parts of a path that lie inside `region`, in path order.
fn clip_path(points: &[Point], closed: bool, region: &[Shape]) -> Vec<Vec<Point>> {
    let n = points.len();
    if n < 2 {
        return Vec::new();
    }
    let edge_count = if closed { n } else { n - 1 };
    let rings: Vec<&[Point]> = region.iter().flat_map(|s| s.rings()).collect();

    let mut runs: Vec<Vec<Point>> = Vec::new();
    let mut current: Vec<Point> = Vec::new();
    let mut all_inside = true;

    for i in 0..edge_count {
        let a = points[i];
        let b = points[(i + 1) % n];

        let mut ts = vec![0.0, 1.0];
        for ring in &rings {
            let m = ring.len();
            for j in 0..m {
                if let Some(t) = segment_crossing(a, b, ring[j], ring[(j + 1) % m]) {
                    ts.push(t);
                }
            }
        }
        ts.sort_by(|x, y| x.total_cmp(y));
        ts.dedup_by(|x, y| (*x - *y).abs() < 1e-12);

        for w in ts.windows(2) {
            let lerp = |t: f64| Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t);
            let mid = lerp((w[0] + w[1]) / 2.0);
            if region_contains(region, &mid) {
                let start = lerp(w[0]);
                if current.is_empty() {
                    current.push(start);
                }
                current.push(lerp(w[1]));
            } else {
                all_inside = false;
                if current.len() >= 2 {
                    runs.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
            }
        }
    }
    if current.len() >= 2 {
        runs.push(current);
    }

    // A closed path that starts and ends inside wraps around
    if closed && runs.len() > 1 && !all_inside {
        let first_start = runs[0][0];
        let last_end = runs[runs.len() - 1][runs[runs.len() - 1].len() - 1];
        if first_start.approx_eq(&last_end, 1e-9) {
            if let Some(mut last) = runs.pop() {
                last.extend(runs[0].iter().skip(1).copied());
                runs[0] = last;
            }
        }
    }
    runs
}
