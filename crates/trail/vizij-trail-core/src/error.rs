//! Error types for the trail engine.

use thiserror::Error;

use crate::ids::TrailId;

/// Configuration and lookup failures.
///
/// Geometry write violations are not represented here: they are programming
/// errors and surface as debug assertions instead.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum TrailError {
    #[error("max_frame must be at least 2 (got {0})")]
    InvalidMaxFrame(usize),

    #[error("granularity must be at least 2 (got {0})")]
    InvalidGranularity(usize),

    #[error("fps must be a positive finite number (got {0})")]
    InvalidFps(f32),

    #[error("trail_length must be within [0, 1] (got {0})")]
    InvalidTrailLength(f32),

    #[error("auto_fade_time must be a non-negative finite number (got {0})")]
    InvalidFadeTime(f32),

    #[error("trail has no anchor points to sample")]
    MissingAnchors,

    #[error("unknown trail: {0:?}")]
    UnknownTrail(TrailId),

    #[error("trail config parse error: {0}")]
    ConfigParse(String),
}

impl TrailError {
    /// Errors caused by bad configuration; the instance stays uninitialized
    /// until the host fixes the input.
    #[inline]
    pub fn is_config_error(&self) -> bool {
        !matches!(self, Self::UnknownTrail(_))
    }
}

impl From<serde_json::Error> for TrailError {
    fn from(err: serde_json::Error) -> Self {
        Self::ConfigParse(err.to_string())
    }
}
