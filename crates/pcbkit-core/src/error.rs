//! Error types for the geometry store.
//!
//! Engine-level failures (invalid parameters, lookup misses) live in the CAM
//! tools crate; this module only covers misuse of the containers themselves.

use crate::units::Units;
use thiserror::Error;

/// Errors raised by geometry containers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Two containers with different units were combined.
    #[error("Unit mismatch: expected {expected}, found {found}")]
    UnitMismatch {
        /// Units of the receiving container.
        expected: Units,
        /// Units of the offending container.
        found: Units,
    },

    /// A drill point references a tool that is not in the tool table.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A tool was declared with an unusable diameter.
    #[error("Invalid diameter {diameter} for tool {key}")]
    InvalidToolDiameter {
        /// Tool key.
        key: String,
        /// Offending diameter.
        diameter: f64,
    },

    /// Join was requested over an empty list.
    #[error("Nothing to join")]
    NothingToJoin,
}

/// Result type alias for geometry store operations.
pub type GeometryResult<T> = Result<T, GeometryError>;
