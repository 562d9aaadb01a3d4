//! Configuration for trail instances and the shared geometry pool.

use glam::Vec4;
use serde::{Deserialize, Serialize};

use crate::error::TrailError;
use crate::ids::MaterialKey;

/// Default number of history snapshots kept per trail.
pub const DEFAULT_MAX_FRAME: usize = 14;
/// Default number of cross-sections per ribbon.
pub const DEFAULT_GRANULARITY: usize = 60;
/// Default sampling rate (samples pushed per second).
pub const DEFAULT_FPS: f32 = 60.0;
/// Default fade duration applied on implicit deactivation, in seconds.
pub const DEFAULT_AUTO_FADE_TIME: f32 = 0.3;
/// Default growth block for the geometry buffer (elements per block).
pub const DEFAULT_BLOCK_SIZE: usize = 108;
/// Default seconds between bounding-volume recomputations.
pub const DEFAULT_BOUNDS_INTERVAL: f32 = 1.0;

/// Per-trail settings. Every field is defaulted so partial JSON works.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailConfig {
    /// History depth, also the number of curve control points.
    pub max_frame: usize,
    /// Cross-sections per ribbon. Fixed for the lifetime of a segment.
    pub granularity: usize,
    /// Sampling rate; one history sample every `1 / fps` seconds.
    pub fps: f32,
    /// Fraction of the curve length to render, in [0, 1].
    pub trail_length: f32,
    /// Fade duration used when the trail is disabled without an explicit fade.
    pub auto_fade_time: f32,
    /// Vertex color, linear RGBA.
    pub color: Vec4,
    pub material: Option<MaterialKey>,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            max_frame: DEFAULT_MAX_FRAME,
            granularity: DEFAULT_GRANULARITY,
            fps: DEFAULT_FPS,
            trail_length: 1.0,
            auto_fade_time: DEFAULT_AUTO_FADE_TIME,
            color: Vec4::ONE,
            material: None,
        }
    }
}

impl TrailConfig {
    /// Parse a (possibly partial) JSON object and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, TrailError> {
        let cfg: TrailConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), TrailError> {
        if self.max_frame < 2 {
            return Err(TrailError::InvalidMaxFrame(self.max_frame));
        }
        if self.granularity < 2 {
            return Err(TrailError::InvalidGranularity(self.granularity));
        }
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(TrailError::InvalidFps(self.fps));
        }
        if !(0.0..=1.0).contains(&self.trail_length) {
            return Err(TrailError::InvalidTrailLength(self.trail_length));
        }
        if !(self.auto_fade_time.is_finite() && self.auto_fade_time >= 0.0) {
            return Err(TrailError::InvalidFadeTime(self.auto_fade_time));
        }
        Ok(())
    }

    /// Seconds between history samples.
    #[inline]
    pub fn update_interval(&self) -> f32 {
        1.0 / self.fps
    }

    /// Vertices owned by one ribbon: edge, centerline, edge per cross-section.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.granularity * 3
    }

    /// Indices owned by one ribbon: four triangles between consecutive sections.
    #[inline]
    pub fn index_count(&self) -> usize {
        self.granularity.saturating_sub(1) * 12
    }
}

/// Settings for the shared geometry buffer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Capacity grows in multiples of this many elements.
    pub block_size: usize,
    /// Seconds of frame time between bounding-volume recomputations.
    pub bounds_interval: f32,
    pub material: Option<MaterialKey>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            bounds_interval: DEFAULT_BOUNDS_INTERVAL,
            material: None,
        }
    }
}
