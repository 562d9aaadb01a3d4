use bevy::prelude::*;
use hashbrown::HashMap;
use vizij_trail_core::{MaterialKey, TrailId, TrailSystem};

/// The core trail system: shared geometry plus every registered trail.
#[derive(Resource)]
pub struct TrailEngine(pub TrailSystem);

/// Handles for the single mesh entity all trails draw into.
#[derive(Resource, Clone, Debug)]
pub struct TrailMesh {
    pub entity: Entity,
    pub mesh: Handle<Mesh>,
    /// Used while the buffer has no material key, or an unknown one.
    pub material: Handle<StandardMaterial>,
}

/// Entity -> trail id, used to release trails whose component went away.
#[derive(Resource, Default)]
pub struct TrailEntities {
    pub by_entity: HashMap<Entity, TrailId>,
}

/// Renderer materials for the opaque keys carried in trail configs. The
/// shared mesh switches to the entry matching the buffer's key.
#[derive(Resource, Default)]
pub struct TrailMaterials {
    pub by_key: HashMap<MaterialKey, Handle<StandardMaterial>>,
}
