//! Bevy adapter for `vizij-trail-core`.
//!
//! Add [`VizijTrailPlugin`], then spawn a [`WeaponTrail`] component that
//! points at two anchor entities. All trails render through one shared mesh
//! entity spawned at startup.

use bevy::prelude::*;
use vizij_trail_core::{PoolConfig, TrailSystem};

mod components;
mod resources;
mod systems;

pub use components::{TrailHandle, TrailMeshMarker, WeaponTrail};
pub use resources::{TrailEngine, TrailEntities, TrailMaterials, TrailMesh};
pub use systems::BevyMeshSink;

/// Send when the host swaps scenes. Every trail re-initializes lazily and the
/// shared mesh starts over.
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct SceneReloaded;

#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrailSet {
    /// Registration and per-trail ticking (Update).
    Tick,
    /// Mesh upload (PostUpdate).
    Flush,
}

#[derive(Default)]
pub struct VizijTrailPlugin {
    pub pool: PoolConfig,
}

impl Plugin for VizijTrailPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(TrailEngine(TrailSystem::new(self.pool.clone())))
            .init_resource::<TrailEntities>()
            .init_resource::<TrailMaterials>()
            .add_event::<SceneReloaded>()
            .add_systems(Startup, systems::spawn_trail_mesh)
            .add_systems(
                Update,
                (
                    systems::handle_scene_reload,
                    systems::register_trails,
                    systems::release_removed_trails,
                    systems::update_trails,
                )
                    .chain()
                    .in_set(TrailSet::Tick),
            )
            .add_systems(
                PostUpdate,
                (systems::apply_trail_material, systems::flush_trail_mesh)
                    .chain()
                    .in_set(TrailSet::Flush),
            );
    }
}
