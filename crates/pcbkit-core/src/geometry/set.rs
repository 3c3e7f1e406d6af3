use super::{BoundingBox, Point, Shape};
use crate::error::{GeometryError, GeometryResult};
use crate::units::Units;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Named, ordered collection of shapes in one unit.
///
/// Order is significant: it is the order the G-code synthesizer cuts in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometrySet {
    pub name: String,
    #[serde(default)]
    pub units: Units,
    #[serde(default)]
    pub shapes: Vec<Shape>,
}

impl GeometrySet {
    pub fn new(name: impl Into<String>, units: Units) -> Self {
        Self {
            name: name.into(),
            units,
            shapes: Vec::new(),
        }
    }

    pub fn with_shapes(name: impl Into<String>, units: Units, shapes: Vec<Shape>) -> Self {
        Self {
            name: name.into(),
            units,
            shapes,
        }
    }

    pub fn push(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    pub fn extend<I: IntoIterator<Item = Shape>>(&mut self, shapes: I) {
        self.shapes.extend(shapes);
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        self.shapes
            .iter()
            .filter_map(Shape::bounds)
            .reduce(|a, b| a.union(&b))
    }

    /// First polygon containing `point`, in storage order.
    pub fn find_polygon(&self, point: &Point) -> Option<&Shape> {
        self.shapes
            .iter()
            .find(|s| s.is_closed() && s.contains_point(point))
    }

    /// Scale every vertex about `origin`.
    pub fn scale(&mut self, sx: f64, sy: f64, origin: Point) {
        for shape in &mut self.shapes {
            shape.transform(|p| {
                Point::new(
                    origin.x + (p.x - origin.x) * sx,
                    origin.y + (p.y - origin.y) * sy,
                )
            });
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        for shape in &mut self.shapes {
            shape.transform(|p| Point::new(p.x + dx, p.y + dy));
        }
    }

    /// Rescale coordinates into `units`. No-op if already there.
    pub fn convert_units(&mut self, units: Units) {
        if self.units == units {
            return;
        }
        let factor = self.units.factor_to(units);
        self.scale(factor, factor, Point::default());
        debug!("Converted '{}' from {} to {}", self.name, self.units, units);
        self.units = units;
    }

    /// Concatenate several sets in order. All sets must share units.
    pub fn join(name: impl Into<String>, sets: &[GeometrySet]) -> GeometryResult<GeometrySet> {
        let first = sets.first().ok_or(GeometryError::NothingToJoin)?;
        let mut joined = GeometrySet::new(name, first.units);
        for set in sets {
            if set.units != first.units {
                return Err(GeometryError::UnitMismatch {
                    expected: first.units,
                    found: set.units,
                });
            }
            joined.extend(set.shapes.iter().cloned());
        }
        Ok(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_squares() -> GeometrySet {
        GeometrySet::with_shapes(
            "copper",
            Units::Millimeters,
            vec![
                Shape::rectangle(Point::new(0.0, 0.0), Point::new(2.0, 2.0)),
                Shape::rectangle(Point::new(5.0, 0.0), Point::new(7.0, 2.0)),
            ],
        )
    }

    #[test]
    fn test_find_polygon() {
        let set = two_squares();
        let hit = set.find_polygon(&Point::new(6.0, 1.0)).unwrap();
        assert_eq!(hit.bounds().unwrap().min_x, 5.0);
        assert!(set.find_polygon(&Point::new(3.5, 1.0)).is_none());
    }

    #[test]
    fn test_bounds_union() {
        let bbox = two_squares().bounds().unwrap();
        assert_eq!(bbox, BoundingBox::new(0.0, 0.0, 7.0, 2.0));
        assert!(GeometrySet::new("empty", Units::Inches).bounds().is_none());
    }

    #[test]
    fn test_convert_units() {
        let mut set = two_squares();
        set.convert_units(Units::Inches);
        assert_eq!(set.units, Units::Inches);
        let bbox = set.bounds().unwrap();
        assert!((bbox.max_x - 7.0 / 25.4).abs() < 1e-12);
    }

    #[test]
    fn test_join_rejects_mixed_units() {
        let a = two_squares();
        let b = GeometrySet::new("other", Units::Inches);
        assert!(matches!(
            GeometrySet::join("all", &[a.clone(), b]),
            Err(GeometryError::UnitMismatch { .. })
        ));
        let joined = GeometrySet::join("all", &[a.clone(), a]).unwrap();
        assert_eq!(joined.len(), 4);
        assert!(matches!(
            GeometrySet::join("none", &[]),
            Err(GeometryError::NothingToJoin)
        ));
    }
}
