//! Unified error handling for the route-corridor library.
//!
//! Parsing and parameter validation fail fast. Numeric degeneracy (empty tracks,
//! single-point routes, zero-length segments) is never an error: those inputs
//! produce empty results instead, so an interactive caller can pass them through
//! transiently.

use thiserror::Error;

/// Unified error type for route-corridor operations.
#[derive(Debug, Clone, PartialEq, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
#[cfg_attr(feature = "ffi", uniffi(flat_error))]
pub enum CorridorError {
    /// Track text is not well-formed markup (or not UTF-8).
    #[error("track parse error at byte {position}: {message}")]
    Parse { position: u64, message: String },

    /// A caller-supplied parameter is out of range.
    #[error("invalid parameter `{parameter}`: {message}")]
    InvalidParameter {
        parameter: &'static str,
        message: String,
    },

    /// The geometry backend produced an unusable shape.
    ///
    /// Usually recoverable by retrying with a different radius.
    #[error("geometry error during {stage}: {message}")]
    Geometry { stage: &'static str, message: String },

    /// Cooperative cancellation was requested while work was in flight.
    #[error("{stage} cancelled")]
    Cancelled { stage: &'static str },
}

/// Result type alias for route-corridor operations.
pub type Result<T> = std::result::Result<T, CorridorError>;

impl CorridorError {
    pub(crate) fn invalid(parameter: &'static str, message: impl Into<String>) -> Self {
        CorridorError::InvalidParameter {
            parameter,
            message: message.into(),
        }
    }

    pub(crate) fn geometry(stage: &'static str, message: impl Into<String>) -> Self {
        CorridorError::Geometry {
            stage,
            message: message.into(),
        }
    }

    /// True for errors the caller can fix by changing an input parameter.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, CorridorError::InvalidParameter { .. })
    }
}

/// Reject radii that cannot produce a meaningful corridor.
pub(crate) fn validate_radius(radius_km: f64) -> Result<()> {
    if !radius_km.is_finite() || radius_km <= 0.0 {
        return Err(CorridorError::invalid(
            "radius_km",
            format!("must be a positive number of kilometres, got {}", radius_km),
        ));
    }
    Ok(())
}

/// Reject position ranges that are reversed or not numbers.
pub(crate) fn validate_range(start_km: f64, end_km: f64) -> Result<()> {
    if start_km.is_nan() || end_km.is_nan() {
        return Err(CorridorError::invalid(
            "position_range",
            "range bounds must be numbers",
        ));
    }
    if start_km > end_km {
        return Err(CorridorError::invalid(
            "position_range",
            format!("start {:.3} km is after end {:.3} km", start_km, end_km),
        ));
    }
    Ok(())
}
