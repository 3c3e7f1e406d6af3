//! Error types for the CAM tools crate.
//!
//! This module provides structured error types for engine operations and
//! parameter validation.

use pcbkit_core::GeometryError;
use std::io;
use thiserror::Error;

/// Errors that can occur during engine operations.
#[derive(Error, Debug)]
pub enum CamToolError {
    /// Invalid parameters were provided to an engine.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// A point did not resolve to any polygon.
    #[error("No polygon contains point ({x}, {y})")]
    LookupMiss { x: f64, y: f64 },

    /// The request was cancelled before any output was produced.
    #[error("Operation cancelled")]
    Cancelled,

    /// The engine worker is no longer running.
    #[error("Engine worker disconnected")]
    WorkerDisconnected,

    /// I/O error, e.g. while starting the worker thread.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// A parameter validation error occurred.
    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),

    /// The geometry store rejected an operation.
    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),
}

impl CamToolError {
    /// True for errors raised before any geometry was touched.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(
            self,
            CamToolError::InvalidParameters(_) | CamToolError::Parameter(_)
        )
    }
}

/// Errors related to engine parameter validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    /// A parameter value is out of the valid range.
    #[error("Parameter '{name}' out of range: {value} (valid: {min}..{max})")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A parameter value is invalid.
    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: String, reason: String },

    /// Parameters are mutually incompatible.
    #[error("Incompatible parameters: {0}")]
    Incompatible(String),

    /// A keyword parameter is not one of the supported values.
    #[error("Unsupported value for '{name}': {value}")]
    Unsupported { name: String, value: String },
}

/// Result type alias for CAM tool operations.
pub type CamToolResult<T> = Result<T, CamToolError>;

/// Result type alias for parameter validation.
pub type ParameterResult<T> = Result<T, ParameterError>;

/// Require a finite value strictly greater than zero.
pub fn require_positive(name: &str, value: f64) -> ParameterResult<()> {
    if !value.is_finite() {
        return Err(ParameterError::InvalidValue {
            name: name.to_string(),
            reason: "must be a finite number".to_string(),
        });
    }
    if value <= 0.0 {
        return Err(ParameterError::InvalidValue {
            name: name.to_string(),
            reason: format!("must be positive, got {}", value),
        });
    }
    Ok(())
}

/// Require a finite value greater than or equal to zero.
pub fn require_non_negative(name: &str, value: f64) -> ParameterResult<()> {
    if !value.is_finite() {
        return Err(ParameterError::InvalidValue {
            name: name.to_string(),
            reason: "must be a finite number".to_string(),
        });
    }
    if value < 0.0 {
        return Err(ParameterError::InvalidValue {
            name: name.to_string(),
            reason: format!("must not be negative, got {}", value),
        });
    }
    Ok(())
}

/// Require a finite value in the half-open range `[0, 1)`.
pub fn require_fraction(name: &str, value: f64) -> ParameterResult<()> {
    if !value.is_finite() || !(0.0..1.0).contains(&value) {
        return Err(ParameterError::OutOfRange {
            name: name.to_string(),
            value,
            min: 0.0,
            max: 1.0,
        });
    }
    Ok(())
}
