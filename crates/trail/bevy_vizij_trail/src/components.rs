use bevy::prelude::*;
use vizij_trail_core::{TrailConfig, TrailId};

/// A ribbon swept between two anchor entities (typically the base and tip
/// of a blade). The anchors' `GlobalTransform` translations are sampled
/// every frame.
#[derive(Component, Debug, Clone)]
pub struct WeaponTrail {
    pub config: TrailConfig,
    pub start: Entity,
    pub end: Entity,
    /// Desired enabled flag; toggling it starts or fades the trail.
    pub enabled: bool,
    /// Fraction of the ribbon to draw, capped at 1.
    pub trail_length: f32,
}

impl WeaponTrail {
    pub fn new(start: Entity, end: Entity) -> Self {
        let config = TrailConfig::default();
        Self {
            trail_length: config.trail_length,
            config,
            start,
            end,
            enabled: true,
        }
    }

    /// Replace the config. `trail_length` starts from the configured value.
    pub fn with_config(mut self, config: TrailConfig) -> Self {
        self.trail_length = config.trail_length;
        self.config = config;
        self
    }
}

/// Inserted once the trail has been registered with the engine.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailHandle(pub TrailId);

/// Marks the entity that carries the shared trail mesh.
#[derive(Component)]
pub struct TrailMeshMarker;
