//! Artwork: the geometry kinds the engines accept interchangeably.

use crate::geometry::{BoundingBox, DrillSet, GeometrySet, Point};
use crate::units::Units;
use serde::{Deserialize, Serialize};

/// Either polygonal artwork (copper, outlines, toolpaths) or drill data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Artwork {
    Polygonal(GeometrySet),
    Drill(DrillSet),
}

impl Artwork {
    pub fn name(&self) -> &str {
        match self {
            Artwork::Polygonal(g) => &g.name,
            Artwork::Drill(d) => &d.name,
        }
    }

    pub fn units(&self) -> Units {
        match self {
            Artwork::Polygonal(g) => g.units,
            Artwork::Drill(d) => d.units,
        }
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        match self {
            Artwork::Polygonal(g) => g.bounds(),
            Artwork::Drill(d) => d.bounds(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Artwork::Polygonal(g) => g.is_empty(),
            Artwork::Drill(d) => d.is_empty(),
        }
    }

    /// Apply `f` to every stored position.
    pub fn transform<F>(&mut self, f: F)
    where
        F: Fn(Point) -> Point,
    {
        match self {
            Artwork::Polygonal(g) => {
                for shape in &mut g.shapes {
                    shape.transform(&f);
                }
            }
            Artwork::Drill(d) => d.transform(&f),
        }
    }

    pub fn as_geometry(&self) -> Option<&GeometrySet> {
        match self {
            Artwork::Polygonal(g) => Some(g),
            Artwork::Drill(_) => None,
        }
    }

    pub fn as_drill(&self) -> Option<&DrillSet> {
        match self {
            Artwork::Drill(d) => Some(d),
            Artwork::Polygonal(_) => None,
        }
    }
}

impl From<GeometrySet> for Artwork {
    fn from(set: GeometrySet) -> Self {
        Artwork::Polygonal(set)
    }
}

impl From<DrillSet> for Artwork {
    fn from(set: DrillSet) -> Self {
        Artwork::Drill(set)
    }
}
