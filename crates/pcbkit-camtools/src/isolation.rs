//! Isolation routing.
//!
//! Produces the tool-centre paths that separate copper regions from the
//! surrounding copper. Pass `i` runs at distance
//! `(2i + 1) / 2 * d - i * overlap * d` from the copper edge.

use crate::error::{require_fraction, require_positive, CamToolResult, ParameterError};
use crate::offset::buffer;
use pcbkit_core::{CancelToken, GeometrySet, Shape};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Parameters for isolation routing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationParameters {
    /// Tool diameter (document units)
    pub tool_diameter: f64,
    /// Number of passes, at least 1
    pub passes: u32,
    /// Fraction of the tool diameter consecutive passes overlap, in `[0, 1)`
    pub overlap: f64,
    /// Emit all passes in one geometry set
    pub combine: bool,
}

impl Default for IsolationParameters {
    fn default() -> Self {
        Self {
            tool_diameter: 0.2,
            passes: 1,
            overlap: 0.15,
            combine: true,
        }
    }
}

impl IsolationParameters {
    pub fn validate(&self) -> CamToolResult<()> {
        require_positive("tool_diameter", self.tool_diameter)?;
        if self.passes < 1 {
            return Err(ParameterError::InvalidValue {
                name: "passes".to_string(),
                reason: "at least one pass is required".to_string(),
            }
            .into());
        }
        require_fraction("overlap", self.overlap)?;
        Ok(())
    }

    /// Offset distance of pass `index` from the copper edge.
    pub fn pass_offset(&self, index: u32) -> f64 {
        let i = index as f64;
        let d = self.tool_diameter;
        (2.0 * i + 1.0) / 2.0 * d - i * self.overlap * d
    }
}

/// Result of an isolation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IsolationOutput {
    /// All passes in one set, pass 0 first.
    Combined(GeometrySet),
    /// One set per pass.
    PerPass(Vec<GeometrySet>),
}

impl IsolationOutput {
    /// Flatten into geometry sets, in pass order.
    pub fn into_sets(self) -> Vec<GeometrySet> {
        match self {
            IsolationOutput::Combined(set) => vec![set],
            IsolationOutput::PerPass(sets) => sets,
        }
    }

    pub fn shape_count(&self) -> usize {
        match self {
            IsolationOutput::Combined(set) => set.len(),
            IsolationOutput::PerPass(sets) => sets.iter().map(GeometrySet::len).sum(),
        }
    }
}

/// Generate isolation passes around `source`.
///
/// Parameters are validated before any geometry is touched. Degenerate or
/// empty input yields an empty result. When `cancel` fires, the passes
/// finished so far are returned.
pub fn isolate(
    source: &GeometrySet,
    params: &IsolationParameters,
    cancel: &CancelToken,
) -> CamToolResult<IsolationOutput> {
    params.validate()?;

    let mut passes: Vec<Vec<Shape>> = Vec::new();
    for index in 0..params.passes {
        if cancel.is_cancelled() {
            info!(
                "Isolation of '{}' cancelled after {} of {} passes",
                source.name,
                passes.len(),
                params.passes
            );
            break;
        }

        let offset = params.pass_offset(index);
        let mut shapes = buffer(&source.shapes, offset);
        if index == 0 {
            // Conventional milling on the first pass
            for shape in &mut shapes {
                shape.reverse_exterior();
            }
        }
        debug!(
            "Isolation pass {} of '{}' at offset {:.4}: {} shapes",
            index,
            source.name,
            offset,
            shapes.len()
        );
        passes.push(shapes);
    }

    if passes.iter().all(Vec::is_empty) {
        info!("Isolation of '{}' produced no geometry", source.name);
    }

    let output = if params.combine {
        let mut combined = GeometrySet::new(format!("{}_iso", source.name), source.units);
        for shapes in passes {
            combined.extend(shapes);
        }
        IsolationOutput::Combined(combined)
    } else {
        IsolationOutput::PerPass(
            passes
                .into_iter()
                .enumerate()
                .map(|(i, shapes)| {
                    GeometrySet::with_shapes(
                        format!("{}_iso{}", source.name, i + 1),
                        source.units,
                        shapes,
                    )
                })
                .collect(),
        )
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_offset() {
        let params = IsolationParameters {
            tool_diameter: 0.2,
            passes: 3,
            overlap: 0.1,
            combine: true,
        };
        assert!((params.pass_offset(0) - 0.1).abs() < 1e-12);
        assert!((params.pass_offset(1) - 0.28).abs() < 1e-12);
        assert!((params.pass_offset(2) - 0.46).abs() < 1e-12);
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        let mut params = IsolationParameters::default();
        assert!(params.validate().is_ok());

        params.tool_diameter = f64::NAN;
        assert!(params.validate().is_err());

        params = IsolationParameters {
            passes: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());

        params = IsolationParameters {
            overlap: 1.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
