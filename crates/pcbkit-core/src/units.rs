//! Unit handling
//!
//! Every document carries exactly one linear unit. The engines never infer
//! units; they only convert when explicitly asked to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Linear unit of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Units {
    /// Millimeters (metric)
    #[serde(rename = "mm")]
    Millimeters,
    /// Inches (imperial)
    #[serde(rename = "in")]
    Inches,
}

impl Default for Units {
    fn default() -> Self {
        Self::Millimeters
    }
}

impl Units {
    /// Factor that converts a length in `self` into `to`.
    pub fn factor_to(self, to: Units) -> f64 {
        match (self, to) {
            (Units::Millimeters, Units::Inches) => 1.0 / MM_PER_INCH,
            (Units::Inches, Units::Millimeters) => MM_PER_INCH,
            _ => 1.0,
        }
    }

    /// Convert a value from one unit to another
    pub fn convert(value: f64, from: Units, to: Units) -> f64 {
        if from == to {
            return value;
        }
        value * from.factor_to(to)
    }

    /// G-code word selecting this unit (`G21` for mm, `G20` for inches).
    pub fn gcode_word(self) -> &'static str {
        match self {
            Units::Millimeters => "G21",
            Units::Inches => "G20",
        }
    }

    /// Short label ("mm" or "in")
    pub fn label(self) -> &'static str {
        match self {
            Units::Millimeters => "mm",
            Units::Inches => "in",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mm" | "metric" | "millimeters" => Ok(Self::Millimeters),
            "in" | "inch" | "inches" | "imperial" => Ok(Self::Inches),
            _ => Err(format!("Unknown unit: {}", s)),
        }
    }
}
