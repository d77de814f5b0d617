//! Input validation errors shared by every core component.

use thiserror::Error;

/// Malformed caller input, rejected before any I/O happens.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    /// Coordinate component is NaN or infinite.
    #[error("{field}: coordinate must be a finite number")]
    NonFinite { field: &'static str },

    /// Latitude outside [-90, 90].
    #[error("{field}: latitude {value} out of range [-90, 90]")]
    LatitudeOutOfRange { field: &'static str, value: f64 },

    /// Longitude outside [-180, 180].
    #[error("{field}: longitude {value} out of range [-180, 180]")]
    LongitudeOutOfRange { field: &'static str, value: f64 },

    /// Origin and destination resolve to the same port or position.
    #[error("origin and destination must differ")]
    IdenticalEndpoints,

    /// A polyline with fewer than two coordinate pairs.
    #[error("{field}: at least {required} coordinate pairs required, got {actual}")]
    TooFewCoordinates {
        field: &'static str,
        required: usize,
        actual: usize,
    },

    /// Distance metadata below zero.
    #[error("{field}: distance must not be negative")]
    NegativeDistance { field: &'static str },

    /// Required identifier missing or blank.
    #[error("{field} is required")]
    MissingField { field: &'static str },
}

impl InputError {
    /// Name of the request field that violated validation.
    pub fn field(&self) -> &'static str {
        match self {
            Self::NonFinite { field }
            | Self::LatitudeOutOfRange { field, .. }
            | Self::LongitudeOutOfRange { field, .. }
            | Self::TooFewCoordinates { field, .. }
            | Self::NegativeDistance { field }
            | Self::MissingField { field } => *field,
            Self::IdenticalEndpoints => "destination_port_id",
        }
    }

    /// Attach a different field name, used when a nested value is validated
    /// on behalf of an outer request field.
    pub fn with_field(self, field: &'static str) -> Self {
        match self {
            Self::NonFinite { .. } => Self::NonFinite { field },
            Self::LatitudeOutOfRange { value, .. } => Self::LatitudeOutOfRange { field, value },
            Self::LongitudeOutOfRange { value, .. } => Self::LongitudeOutOfRange { field, value },
            Self::TooFewCoordinates {
                required, actual, ..
            } => Self::TooFewCoordinates {
                field,
                required,
                actual,
            },
            Self::NegativeDistance { .. } => Self::NegativeDistance { field },
            Self::MissingField { .. } => Self::MissingField { field },
            Self::IdenticalEndpoints => Self::IdenticalEndpoints,
        }
    }
}

/// Smoothing needs at least three vertices; callers treat this as a no-op
/// with a notice rather than a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("need more points: smoothing requires at least {required} vertices, got {actual}")]
pub struct NeedMorePoints {
    pub required: usize,
    pub actual: usize,
}
