use super::{point_in_ring, signed_area, BoundingBox, Point};
use serde::{Deserialize, Serialize};

/// A single piece of planar geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    /// Closed region. Rings are stored without a repeated closing vertex.
    Polygon {
        exterior: Vec<Point>,
        #[serde(default)]
        holes: Vec<Vec<Point>>,
    },
    /// Open path.
    Polyline { points: Vec<Point> },
}

impl Shape {
    pub fn polygon(exterior: Vec<Point>) -> Self {
        Shape::Polygon {
            exterior,
            holes: Vec::new(),
        }
    }

    pub fn polygon_with_holes(exterior: Vec<Point>, holes: Vec<Vec<Point>>) -> Self {
        Shape::Polygon { exterior, holes }
    }

    pub fn polyline(points: Vec<Point>) -> Self {
        Shape::Polyline { points }
    }

    /// Axis-aligned rectangle as a counter-clockwise polygon.
    pub fn rectangle(min: Point, max: Point) -> Self {
        Shape::polygon(vec![
            Point::new(min.x, min.y),
            Point::new(max.x, min.y),
            Point::new(max.x, max.y),
            Point::new(min.x, max.y),
        ])
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Shape::Polygon { .. })
    }

    /// Rings in cut order: exterior first, then holes. A polyline yields its
    /// single point list.
    pub fn rings(&self) -> Vec<&[Point]> {
        match self {
            Shape::Polygon { exterior, holes } => {
                let mut rings: Vec<&[Point]> = Vec::with_capacity(1 + holes.len());
                rings.push(exterior.as_slice());
                rings.extend(holes.iter().map(|h| h.as_slice()));
                rings
            }
            Shape::Polyline { points } => vec![points.as_slice()],
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.rings().iter().map(|r| r.len()).sum()
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        match self {
            // Holes lie within the exterior
            Shape::Polygon { exterior, .. } => BoundingBox::from_points(exterior),
            Shape::Polyline { points } => BoundingBox::from_points(points),
        }
    }

    /// Enclosed area with holes subtracted. Zero for polylines.
    pub fn area(&self) -> f64 {
        match self {
            Shape::Polygon { exterior, holes } => {
                let outer = signed_area(exterior).abs();
                let inner: f64 = holes.iter().map(|h| signed_area(h).abs()).sum();
                (outer - inner).max(0.0)
            }
            Shape::Polyline { .. } => 0.0,
        }
    }

    /// Point containment. Points inside a hole are outside the polygon;
    /// polylines contain nothing.
    pub fn contains_point(&self, p: &Point) -> bool {
        match self {
            Shape::Polygon { exterior, holes } => {
                point_in_ring(p, exterior) && !holes.iter().any(|h| point_in_ring(p, h))
            }
            Shape::Polyline { .. } => false,
        }
    }

    /// Apply `f` to every vertex.
    pub fn transform<F>(&mut self, f: F)
    where
        F: Fn(Point) -> Point,
    {
        match self {
            Shape::Polygon { exterior, holes } => {
                for p in exterior.iter_mut() {
                    *p = f(*p);
                }
                for hole in holes.iter_mut() {
                    for p in hole.iter_mut() {
                        *p = f(*p);
                    }
                }
            }
            Shape::Polyline { points } => {
                for p in points.iter_mut() {
                    *p = f(*p);
                }
            }
        }
    }

    /// Reverse the traversal direction of the exterior ring (or polyline).
    pub fn reverse_exterior(&mut self) {
        match self {
            Shape::Polygon { exterior, .. } => exterior.reverse(),
            Shape::Polyline { points } => points.reverse(),
        }
    }

    pub fn exterior(&self) -> &[Point] {
        match self {
            Shape::Polygon { exterior, .. } => exterior,
            Shape::Polyline { points } => points,
        }
    }
}
