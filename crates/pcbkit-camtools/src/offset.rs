//! Offset kernel
//!
//! Grows and shrinks polygonal regions. Single rings are offset with
//! `cavalier_contours`; region algebra (union, difference) goes through
//! `csgrs` sketches. Arc segments produced by the offsetter are linearised
//! before anything leaves this module.

use cavalier_contours::polyline::{PlineSource, PlineSourceMut, PlineVertex, Polyline};
use csgrs::sketch::Sketch;
use csgrs::traits::CSG;
use nalgebra::{Matrix4, Vector3};
use pcbkit_core::{clean_ring, point_in_ring, signed_area, Point, Shape};
use std::f64::consts::PI;
use std::panic;
use tracing::{debug, warn};

/// Vertices closer than this are merged.
pub const MERGE_TOLERANCE: f64 = 1e-5;

/// Rings with less absolute area than this are dropped as degenerate.
pub const MIN_RING_AREA: f64 = 1e-9;

/// Angular step used when linearising arcs.
const ARC_STEP: f64 = 5.0 * PI / 180.0;

/// Segment count for stroke end caps.
const CAP_SEGMENTS: usize = 72;

/// Grow (`distance > 0`) or shrink (`distance < 0`) the region covered by
/// `shapes`.
///
/// Polygon exteriors are offset by `distance` and holes by the opposite
/// amount, then everything is unioned. Open polylines become stroked regions
/// with round caps when growing and vanish when shrinking. Degenerate rings
/// are dropped; an empty result is not an error.
pub fn buffer(shapes: &[Shape], distance: f64) -> Vec<Shape> {
    if distance == 0.0 {
        return sketch_to_shapes(&shapes_to_sketch(shapes));
    }

    let mut region = Sketch::new();
    for shape in shapes {
        let piece = match shape {
            Shape::Polygon { exterior, holes } => buffer_polygon(exterior, holes, distance),
            Shape::Polyline { points } => {
                if distance > 0.0 {
                    stroke_polyline(points, 2.0 * distance)
                } else {
                    Sketch::new()
                }
            }
        };
        region = region.union(&piece);
    }

    let result = sketch_to_shapes(&region);
    debug!(
        "buffer({}) of {} shapes produced {} shapes",
        distance,
        shapes.len(),
        result.len()
    );
    result
}

/// Union of the polygons in `shapes`. Polylines are ignored.
pub fn union(shapes: &[Shape]) -> Vec<Shape> {
    sketch_to_shapes(&shapes_to_sketch(shapes))
}

/// Region of `a` not covered by `b`.
pub fn difference(a: &[Shape], b: &[Shape]) -> Vec<Shape> {
    sketch_to_shapes(&shapes_to_sketch(a).difference(&shapes_to_sketch(b)))
}

/// Point containment over a list of regions.
pub fn region_contains(region: &[Shape], p: &Point) -> bool {
    region.iter().any(|s| s.contains_point(p))
}

fn buffer_polygon(exterior: &[Point], holes: &[Vec<Point>], distance: f64) -> Sketch<()> {
    let outer = offset_region(exterior, distance);
    if holes.is_empty() {
        return outer;
    }

    let mut inner = Sketch::new();
    for hole in holes {
        inner = inner.union(&offset_region(hole, -distance));
    }
    outer.difference(&inner)
}

/// Region covered by the offset of one ring: enclosing rings minus voids.
fn offset_region(ring: &[Point], delta: f64) -> Sketch<()> {
    let mut filled = Sketch::new();
    let mut voids = Sketch::new();
    for r in offset_ring(ring, delta) {
        if signed_area(&r) > 0.0 {
            filled = filled.union(&ring_to_sketch(&r));
        } else {
            let mut ccw = r;
            ccw.reverse();
            voids = voids.union(&ring_to_sketch(&ccw));
        }
    }
    filled.difference(&voids)
}

/// Offset the region enclosed by a single ring. Positive `delta` grows it.
///
/// Rings enclosing part of the offset region are counter-clockwise. A
/// clockwise ring is a void, e.g. where growing a C shape closes its mouth.
/// Shrinking may split the region or remove it entirely.
pub fn offset_ring(ring: &[Point], delta: f64) -> Vec<Vec<Point>> {
    let cleaned = clean_ring(ring, MERGE_TOLERANCE);
    let original_area = signed_area(&cleaned).abs();
    if cleaned.len() < 3 || original_area < MIN_RING_AREA {
        return Vec::new();
    }
    if delta == 0.0 {
        return vec![cleaned];
    }

    let mut ccw = cleaned;
    if signed_area(&ccw) < 0.0 {
        ccw.reverse();
    }
    let pline = ring_to_polyline(&ccw);

    // Positive offsets on a counter-clockwise ring move inward; confirm by
    // area and retry with the other sign if the offsetter disagrees.
    let first = run_offset(&pline, -delta);
    if offset_direction_matches(&first, original_area, delta) {
        return orient_rings(first);
    }
    let second = run_offset(&pline, delta);
    if offset_direction_matches(&second, original_area, delta) {
        return orient_rings(second);
    }
    warn!(
        "Offset of ring with area {} by {} gave inconsistent results; ring dropped",
        original_area, delta
    );
    Vec::new()
}

fn offset_direction_matches(rings: &[Vec<Point>], original_area: f64, delta: f64) -> bool {
    if rings.is_empty() {
        // Only a shrink may legitimately remove the ring
        return delta < 0.0;
    }
    let largest = rings
        .iter()
        .map(|r| signed_area(r).abs())
        .fold(0.0_f64, f64::max);
    if delta > 0.0 {
        largest > original_area
    } else {
        largest < original_area
    }
}

/// Make enclosing rings counter-clockwise and voids clockwise. Enclosing
/// rings of one offset never nest, so a ring inside another is a void.
fn orient_rings(mut rings: Vec<Vec<Point>>) -> Vec<Vec<Point>> {
    let voids: Vec<bool> = rings
        .iter()
        .enumerate()
        .map(|(i, ring)| {
            let depth = rings
                .iter()
                .enumerate()
                .filter(|(j, other)| *j != i && point_in_ring(&ring[0], other))
                .count();
            depth % 2 == 1
        })
        .collect();
    for (ring, is_void) in rings.iter_mut().zip(voids) {
        if is_void == (signed_area(ring) > 0.0) {
            ring.reverse();
        }
    }
    rings
}

fn run_offset(pline: &Polyline<f64>, offset: f64) -> Vec<Vec<Point>> {
    let result = panic::catch_unwind(panic::AssertUnwindSafe(|| pline.parallel_offset(offset)));
    match result {
        Ok(offsets) => offsets
            .iter()
            .map(polyline_to_ring)
            .map(|r| clean_ring(&r, MERGE_TOLERANCE))
            .filter(|r| r.len() >= 3 && signed_area(r).abs() >= MIN_RING_AREA)
            .collect(),
        Err(_) => {
            warn!("Panic during parallel offset of ring; ring dropped");
            Vec::new()
        }
    }
}

pub(crate) fn ring_to_polyline(ring: &[Point]) -> Polyline<f64> {
    let mut pline = Polyline::new();
    for p in ring {
        pline.add_vertex(PlineVertex::new(p.x, p.y, 0.0));
    }
    pline.set_is_closed(true);
    pline
}

/// Vertices of a closed polyline with bulge arcs linearised.
pub(crate) fn polyline_to_ring(pline: &Polyline<f64>) -> Vec<Point> {
    let mut points = Vec::new();
    let count = pline.vertex_count();
    if count < 2 {
        return points;
    }

    for i in 0..count {
        let v1 = pline.at(i);
        let v2 = pline.at((i + 1) % count);
        points.push(Point::new(v1.x, v1.y));

        if v1.bulge.abs() <= 1e-5 {
            continue;
        }
        let chord_len = ((v2.x - v1.x).powi(2) + (v2.y - v1.y).powi(2)).sqrt();
        if chord_len <= 1e-5 {
            continue;
        }
        let theta = 4.0 * v1.bulge.atan();
        let radius = (chord_len / (2.0 * (theta / 2.0).sin())).abs();
        // Negative past half a turn, which puts the centre on the far side
        let dist_to_center = radius * (theta.abs() / 2.0).cos();
        let mx = (v1.x + v2.x) / 2.0;
        let my = (v1.y + v2.y) / 2.0;
        let nx = -(v2.y - v1.y) / chord_len;
        let ny = (v2.x - v1.x) / chord_len;
        let sign = if v1.bulge > 0.0 { 1.0 } else { -1.0 };
        let cx = mx + nx * dist_to_center * sign;
        let cy = my + ny * dist_to_center * sign;

        let start_angle = (v1.y - cy).atan2(v1.x - cx);
        let mut end_angle = (v2.y - cy).atan2(v2.x - cx);
        if v1.bulge > 0.0 {
            if end_angle <= start_angle {
                end_angle += 2.0 * PI;
            }
        } else if end_angle >= start_angle {
            end_angle -= 2.0 * PI;
        }

        let sweep = end_angle - start_angle;
        let segments = ((sweep.abs() / ARC_STEP).ceil() as usize).max(2);
        for j in 1..segments {
            let t = j as f64 / segments as f64;
            let angle = start_angle + sweep * t;
            points.push(Point::new(
                cx + radius * angle.cos(),
                cy + radius * angle.sin(),
            ));
        }
    }
    points
}

pub(crate) fn ring_to_sketch(ring: &[Point]) -> Sketch<()> {
    if ring.len() < 3 {
        return Sketch::new();
    }
    let pts: Vec<[f64; 2]> = ring.iter().map(|p| [p.x, p.y]).collect();
    Sketch::polygon(&pts, None)
}

/// Sketch covering the polygons of `shapes`.
pub(crate) fn shapes_to_sketch(shapes: &[Shape]) -> Sketch<()> {
    let mut sketch = Sketch::new();
    for shape in shapes {
        if let Shape::Polygon { exterior, holes } = shape {
            let mut piece = ring_to_sketch(exterior);
            for hole in holes {
                piece = piece.difference(&ring_to_sketch(hole));
            }
            sketch = sketch.union(&piece);
        }
    }
    sketch
}

/// Convert a sketch back to polygons, dropping degenerate rings.
pub(crate) fn sketch_to_shapes(sketch: &Sketch<()>) -> Vec<Shape> {
    let mut shapes = Vec::new();
    let mp = sketch.to_multipolygon();
    for poly in mp.0 {
        let exterior: Vec<Point> = poly
            .exterior()
            .0
            .iter()
            .map(|c| Point::new(c.x, c.y))
            .collect();
        let exterior = clean_ring(&exterior, MERGE_TOLERANCE);
        if exterior.len() < 3 || signed_area(&exterior).abs() < MIN_RING_AREA {
            continue;
        }

        let mut holes = Vec::new();
        for interior in poly.interiors() {
            let hole: Vec<Point> = interior.0.iter().map(|c| Point::new(c.x, c.y)).collect();
            let hole = clean_ring(&hole, MERGE_TOLERANCE);
            if hole.len() >= 3 && signed_area(&hole).abs() >= MIN_RING_AREA {
                holes.push(hole);
            }
        }
        shapes.push(Shape::polygon_with_holes(exterior, holes));
    }
    shapes
}

fn circle_at(center: Point, radius: f64) -> Sketch<()> {
    let c: Sketch<()> = Sketch::circle(radius, CAP_SEGMENTS, None);
    c.transform(&Matrix4::new_translation(&Vector3::new(center.x, center.y, 0.0)))
}

/// Rectangle of `width` around the segment `p1`-`p2`, with round ends.
fn create_thick_segment(p1: Point, p2: Point, width: f64) -> Sketch<()> {
    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;
    let len = (dx * dx + dy * dy).sqrt();

    if len < 1e-6 {
        return circle_at(p1, width / 2.0);
    }

    let angle = dy.atan2(dx);
    let cx = (p1.x + p2.x) / 2.0;
    let cy = (p1.y + p2.y) / 2.0;
    let half_w = width / 2.0;
    let half_l = len / 2.0;

    let pts = vec![
        [-half_l, -half_w],
        [half_l, -half_w],
        [half_l, half_w],
        [-half_l, half_w],
    ];
    let rect: Sketch<()> = Sketch::polygon(&pts, None);

    let rotation = Matrix4::new_rotation(Vector3::new(0.0, 0.0, angle));
    let translation = Matrix4::new_translation(&Vector3::new(cx, cy, 0.0));
    let rect = rect.transform(&(translation * rotation));

    rect.union(&circle_at(p1, half_w)).union(&circle_at(p2, half_w))
}

fn stroke_polyline(points: &[Point], width: f64) -> Sketch<()> {
    match points.len() {
        0 => Sketch::new(),
        1 => circle_at(points[0], width / 2.0),
        _ => {
            let mut stroke = Sketch::new();
            for pair in points.windows(2) {
                stroke = stroke.union(&create_thick_segment(pair[0], pair[1], width));
            }
            stroke
        }
    }
}

/// Interior point of a polygon, or `None` if it has no usable interior.
///
/// Casts a horizontal scanline through the middle of the bounds and takes the
/// midpoint of the widest inside interval.
pub fn interior_point(shape: &Shape) -> Option<Point> {
    let bbox = shape.bounds()?;
    let rings = shape.rings();
    let fractions = [0.5, 0.25, 0.75, 0.125, 0.375, 0.625, 0.875];

    for f in fractions {
        let y = bbox.min_y + bbox.height() * f;
        let mut xs = Vec::new();
        for ring in &rings {
            let n = ring.len();
            for i in 0..n {
                let a = ring[i];
                let b = ring[(i + 1) % n];
                if (a.y > y) != (b.y > y) {
                    xs.push(a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y));
                }
            }
        }
        xs.sort_by(|a, b| a.total_cmp(b));

        let best = xs
            .chunks_exact(2)
            .map(|c| (c[0], c[1]))
            .filter(|(x0, x1)| x1 - x0 > MERGE_TOLERANCE)
            .max_by(|a, b| (a.1 - a.0).total_cmp(&(b.1 - b.0)));
        if let Some((x0, x1)) = best {
            let candidate = Point::new((x0 + x1) / 2.0, y);
            if shape.contains_point(&candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(size, 0.0),
            Point::new(size, size),
            Point::new(0.0, size),
        ]
    }

    fn total_area(shapes: &[Shape]) -> f64 {
        shapes.iter().map(Shape::area).sum()
    }

    #[test]
    fn test_offset_ring_grows_and_shrinks() {
        let grown = offset_ring(&square(10.0), 1.0);
        assert_eq!(grown.len(), 1);
        // 12x12 square with rounded corners: 100 + 4*10 + pi
        let area = signed_area(&grown[0]).abs();
        assert!((area - (140.0 + PI)).abs() < 0.05, "area {}", area);

        let shrunk = offset_ring(&square(10.0), -1.0);
        assert_eq!(shrunk.len(), 1);
        assert!((signed_area(&shrunk[0]).abs() - 64.0).abs() < 1e-6);
    }

    #[test]
    fn test_offset_ring_orientation_independent() {
        let mut cw = square(10.0);
        cw.reverse();
        let grown = offset_ring(&cw, 1.0);
        assert_eq!(grown.len(), 1);
        assert!(signed_area(&grown[0]).abs() > 140.0);
    }

    #[test]
    fn test_offset_ring_vanishes() {
        assert!(offset_ring(&square(2.0), -1.5).is_empty());
        assert!(offset_ring(&[Point::new(0.0, 0.0), Point::new(1.0, 0.0)], 1.0).is_empty());
    }

    #[test]
    fn test_buffer_hole_shrinks_when_growing() {
        let washer = Shape::polygon_with_holes(
            square(10.0),
            vec![vec![
                Point::new(3.0, 3.0),
                Point::new(3.0, 7.0),
                Point::new(7.0, 7.0),
                Point::new(7.0, 3.0),
            ]],
        );
        let grown = buffer(&[washer.clone()], 0.5);
        assert_eq!(grown.len(), 1);
        let area = total_area(&grown);
        // outer 11x11 rounded minus inner 3x3
        let expected = 121.0 - (1.0 - PI / 4.0) - 9.0;
        assert!((area - expected).abs() < 0.05, "area {}", area);
        assert!(!grown[0].contains_point(&Point::new(5.0, 5.0)));
    }

    #[test]
    fn test_buffer_merges_overlapping_regions() {
        let a = Shape::polygon(square(4.0));
        let mut b = Shape::polygon(square(4.0));
        b.transform(|p| Point::new(p.x + 5.0, p.y));
        let merged = buffer(&[a, b], 1.0);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_buffer_strokes_polylines() {
        let line = Shape::polyline(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
        let stroked = buffer(&[line.clone()], 0.5);
        assert_eq!(stroked.len(), 1);
        assert!(stroked[0].contains_point(&Point::new(5.0, 0.4)));
        assert!(!stroked[0].contains_point(&Point::new(5.0, 0.6)));
        assert!(buffer(&[line], -0.5).is_empty());
    }

    #[test]
    fn test_orient_rings_marks_voids_clockwise() {
        let void: Vec<Point> = square(2.0)
            .into_iter()
            .map(|p| Point::new(p.x + 4.0, p.y + 4.0))
            .collect();
        let mut outer = square(10.0);
        outer.reverse();

        let rings = orient_rings(vec![outer, void]);
        assert!(signed_area(&rings[0]) > 0.0);
        assert!(signed_area(&rings[1]) < 0.0);

        let mut apart: Vec<Point> = square(2.0)
            .into_iter()
            .map(|p| Point::new(p.x + 20.0, p.y))
            .collect();
        apart.reverse();
        let rings = orient_rings(vec![square(10.0), apart]);
        assert!(rings.iter().all(|r| signed_area(r) > 0.0));
    }

    #[test]
    fn test_interior_point_of_ring_shape() {
        let washer = Shape::polygon_with_holes(
            square(10.0),
            vec![vec![
                Point::new(2.0, 2.0),
                Point::new(2.0, 8.0),
                Point::new(8.0, 8.0),
                Point::new(8.0, 2.0),
            ]],
        );
        let p = interior_point(&washer).unwrap();
        assert!(washer.contains_point(&p));
    }
}
