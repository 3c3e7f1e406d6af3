use super::{BoundingBox, Point};
use crate::error::{GeometryError, GeometryResult};
use crate::units::Units;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Drill tool table entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub key: String,
    pub diameter: f64,
}

impl Tool {
    pub fn new(key: impl Into<String>, diameter: f64) -> Self {
        Self {
            key: key.into(),
            diameter,
        }
    }
}

/// A single hole, referring to its tool by key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillPoint {
    pub position: Point,
    pub tool: String,
}

impl DrillPoint {
    pub fn new(position: Point, tool: impl Into<String>) -> Self {
        Self {
            position,
            tool: tool.into(),
        }
    }
}

/// Drill data: ordered tool table plus ordered hole positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillSet {
    pub name: String,
    #[serde(default)]
    pub units: Units,
    #[serde(default)]
    pub tools: Vec<Tool>,
    #[serde(default)]
    pub points: Vec<DrillPoint>,
}

impl DrillSet {
    pub fn new(name: impl Into<String>, units: Units) -> Self {
        Self {
            name: name.into(),
            units,
            tools: Vec::new(),
            points: Vec::new(),
        }
    }

    /// Add a tool, replacing any existing entry with the same key.
    pub fn add_tool(&mut self, tool: Tool) -> GeometryResult<()> {
        if !(tool.diameter.is_finite() && tool.diameter > 0.0) {
            return Err(GeometryError::InvalidToolDiameter {
                key: tool.key,
                diameter: tool.diameter,
            });
        }
        match self.tools.iter_mut().find(|t| t.key == tool.key) {
            Some(existing) => *existing = tool,
            None => self.tools.push(tool),
        }
        Ok(())
    }

    pub fn tool(&self, key: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.key == key)
    }

    /// Add a hole. The tool must already be in the table.
    pub fn add_point(&mut self, position: Point, tool: &str) -> GeometryResult<()> {
        if self.tool(tool).is_none() {
            return Err(GeometryError::UnknownTool(tool.to_string()));
        }
        self.points.push(DrillPoint::new(position, tool));
        Ok(())
    }

    /// Check that every point references a known tool with a valid diameter.
    pub fn validate(&self) -> GeometryResult<()> {
        for tool in &self.tools {
            if !(tool.diameter.is_finite() && tool.diameter > 0.0) {
                return Err(GeometryError::InvalidToolDiameter {
                    key: tool.key.clone(),
                    diameter: tool.diameter,
                });
            }
        }
        for point in &self.points {
            if self.tool(&point.tool).is_none() {
                return Err(GeometryError::UnknownTool(point.tool.clone()));
            }
        }
        Ok(())
    }

    /// Points drilled with `key`, in input order.
    pub fn points_for_tool<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a DrillPoint> {
        self.points.iter().filter(move |p| p.tool == key)
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Bounds including each hole's radius.
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.points
            .iter()
            .map(|p| {
                let r = self.tool(&p.tool).map(|t| t.diameter / 2.0).unwrap_or(0.0);
                BoundingBox::new(
                    p.position.x - r,
                    p.position.y - r,
                    p.position.x + r,
                    p.position.y + r,
                )
            })
            .reduce(|a, b| a.union(&b))
    }

    pub fn transform<F>(&mut self, f: F)
    where
        F: Fn(Point) -> Point,
    {
        for point in &mut self.points {
            point.position = f(point.position);
        }
    }

    /// Rescale positions and tool diameters into `units`.
    pub fn convert_units(&mut self, units: Units) {
        if self.units == units {
            return;
        }
        let factor = self.units.factor_to(units);
        self.transform(|p| Point::new(p.x * factor, p.y * factor));
        for tool in &mut self.tools {
            tool.diameter *= factor;
        }
        debug!(
            "Converted drills '{}' from {} to {} ({} tools)",
            self.name,
            self.units,
            units,
            self.tools.len()
        );
        self.units = units;
    }
}
