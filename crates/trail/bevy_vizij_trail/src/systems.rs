use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use bevy::render::primitives::Aabb;
use bevy::render::render_asset::RenderAssetUsages;
use hashbrown::HashMap;
use vizij_trail_core::{Aabb as TrailBounds, Anchors, MeshSink, TrailId, Vec2, Vec3, Vec4};

use crate::components::{TrailHandle, TrailMeshMarker, WeaponTrail};
use crate::resources::{TrailEngine, TrailEntities, TrailMaterials, TrailMesh};
use crate::SceneReloaded;

/// Stages flushed arrays so the `Mesh` asset is only touched (and marked
/// modified) when something actually changed.
#[derive(Default)]
pub struct BevyMeshSink {
    positions: Option<Vec<[f32; 3]>>,
    uvs: Option<Vec<[f32; 2]>>,
    colors: Option<Vec<[f32; 4]>>,
    indices: Option<Vec<u32>>,
    bounds: Option<TrailBounds>,
}

impl BevyMeshSink {
    pub fn has_mesh_data(&self) -> bool {
        self.positions.is_some()
            || self.uvs.is_some()
            || self.colors.is_some()
            || self.indices.is_some()
    }

    pub fn bounds(&self) -> Option<TrailBounds> {
        self.bounds
    }

    /// Move staged arrays into `mesh`.
    pub fn apply(&mut self, mesh: &mut Mesh) {
        if let Some(positions) = self.positions.take() {
            mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
        }
        if let Some(uvs) = self.uvs.take() {
            mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
        }
        if let Some(colors) = self.colors.take() {
            mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, colors);
        }
        if let Some(indices) = self.indices.take() {
            mesh.insert_indices(Indices::U32(indices));
        }
    }
}

impl MeshSink for BevyMeshSink {
    fn upload_positions(&mut self, positions: &[Vec3]) {
        self.positions = Some(positions.iter().map(|p| p.to_array()).collect());
    }

    fn upload_uvs(&mut self, uvs: &[Vec2]) {
        self.uvs = Some(uvs.iter().map(|uv| uv.to_array()).collect());
    }

    fn upload_colors(&mut self, colors: &[Vec4]) {
        self.colors = Some(colors.iter().map(|c| c.to_array()).collect());
    }

    fn upload_indices(&mut self, indices: &[u32]) {
        self.indices = Some(indices.to_vec());
    }

    fn update_bounds(&mut self, bounds: TrailBounds) {
        self.bounds = Some(bounds);
    }
}

/// Startup: spawn the shared, unlit, double-sided trail mesh entity.
pub fn spawn_trail_mesh(
    mut commands: Commands,
    engine: Res<TrailEngine>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let mesh = meshes.add(Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::default(),
    ));
    let material = materials.add(StandardMaterial {
        base_color: Color::WHITE,
        unlit: true,
        double_sided: true,
        cull_mode: None,
        alpha_mode: AlphaMode::Blend,
        ..default()
    });
    let name = engine
        .0
        .buffer()
        .material()
        .map(|m| m.0.clone())
        .unwrap_or_else(|| "vizij_trail".to_string());

    let entity = commands
        .spawn((
            PbrBundle {
                mesh: mesh.clone(),
                material: material.clone(),
                ..default()
            },
            // Bounds come from the trail buffer, not from Bevy's mesh pass.
            Aabb::default(),
            TrailMeshMarker,
            Name::new(name),
        ))
        .id();

    commands.insert_resource(TrailMesh {
        entity,
        mesh,
        material,
    });
}

/// Register freshly added `WeaponTrail`s with the engine.
pub fn register_trails(
    mut commands: Commands,
    mut engine: ResMut<TrailEngine>,
    mut entities: ResMut<TrailEntities>,
    added: Query<(Entity, &WeaponTrail), Added<WeaponTrail>>,
) {
    for (entity, trail) in added.iter() {
        match engine.0.add_trail(trail.config.clone()) {
            Ok(id) => {
                commands.entity(entity).insert(TrailHandle(id));
                entities.by_entity.insert(entity, id);
                log::debug!("weapon trail on {entity:?} registered as {id:?}");
            }
            Err(err) => log::error!("weapon trail on {entity:?} rejected: {err}"),
        }
    }
}

pub fn release_removed_trails(
    mut removed: RemovedComponents<WeaponTrail>,
    mut engine: ResMut<TrailEngine>,
    mut entities: ResMut<TrailEntities>,
) {
    for entity in removed.read() {
        if let Some(id) = entities.by_entity.remove(&entity) {
            engine.0.remove_trail(id);
        }
    }
}

/// Push component state into the engine, then run its update phase with
/// anchor positions read from `GlobalTransform`.
pub fn update_trails(
    time: Res<Time>,
    mut engine: ResMut<TrailEngine>,
    trails: Query<(&WeaponTrail, &TrailHandle)>,
    transforms: Query<&GlobalTransform>,
) {
    let mut anchors: HashMap<TrailId, Anchors> = HashMap::new();
    for (trail, handle) in trails.iter() {
        if let Some(instance) = engine.0.trail_mut(handle.0) {
            instance.set_enabled(trail.enabled);
            instance.set_trail_length(trail.trail_length);
        }
        if let (Ok(start), Ok(end)) = (transforms.get(trail.start), transforms.get(trail.end)) {
            anchors.insert(handle.0, Anchors::new(start.translation(), end.translation()));
        }
    }

    engine
        .0
        .update(time.delta_seconds(), &mut |id: TrailId| anchors.get(&id).copied());
}

/// Point the mesh entity at the material registered for the buffer's key.
pub fn apply_trail_material(
    engine: Res<TrailEngine>,
    materials: Res<TrailMaterials>,
    target: Option<Res<TrailMesh>>,
    mut handles: Query<&mut Handle<StandardMaterial>, With<TrailMeshMarker>>,
) {
    let Some(target) = target else {
        return;
    };
    let wanted = engine
        .0
        .buffer()
        .material()
        .and_then(|key| materials.by_key.get(key))
        .unwrap_or(&target.material);
    if let Ok(mut handle) = handles.get_mut(target.entity) {
        if *handle != *wanted {
            *handle = wanted.clone();
        }
    }
}

/// PostUpdate: flush the shared buffer into the mesh asset and its `Aabb`.
pub fn flush_trail_mesh(
    time: Res<Time>,
    mut engine: ResMut<TrailEngine>,
    target: Option<Res<TrailMesh>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut aabbs: Query<&mut Aabb, With<TrailMeshMarker>>,
) {
    let Some(target) = target else {
        return;
    };
    let mut sink = BevyMeshSink::default();
    engine.0.late_update(&mut sink, time.delta_seconds());

    if sink.has_mesh_data() {
        if let Some(mesh) = meshes.get_mut(&target.mesh) {
            sink.apply(mesh);
        }
    }
    if let Some(bounds) = sink.bounds() {
        if let Ok(mut aabb) = aabbs.get_mut(target.entity) {
            *aabb = Aabb::from_min_max(bounds.min, bounds.max);
        }
    }
}

/// Any number of reload events in a frame collapse into one reset.
pub fn handle_scene_reload(mut events: EventReader<SceneReloaded>, mut engine: ResMut<TrailEngine>) {
    if events.read().count() > 0 {
        engine.0.scene_reloaded();
    }
}
