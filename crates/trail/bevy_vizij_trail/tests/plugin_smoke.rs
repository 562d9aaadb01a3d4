use std::time::Duration;

use bevy::prelude::*;
use bevy::render::primitives::Aabb;
use bevy::time::TimeUpdateStrategy;
use bevy_vizij_trail::{
    SceneReloaded, TrailEngine, TrailEntities, TrailHandle, TrailMaterials, TrailMesh,
    VizijTrailPlugin, WeaponTrail,
};
use vizij_trail_core::{MaterialKey, TrailConfig, TrailState};

fn app() -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(AssetPlugin::default())
        .init_asset::<Mesh>()
        .init_asset::<StandardMaterial>()
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            1.0 / 60.0,
        )))
        .add_plugins(VizijTrailPlugin::default());
    app
}

fn spawn_blade(app: &mut App, cfg: TrailConfig) -> Entity {
    let world = app.world_mut();
    let base = world
        .spawn(GlobalTransform::from_translation(Vec3::ZERO))
        .id();
    let tip = world
        .spawn(GlobalTransform::from_translation(Vec3::new(0.0, 1.0, 0.0)))
        .id();
    world.spawn(WeaponTrail::new(base, tip).with_config(cfg)).id()
}

fn small_cfg() -> TrailConfig {
    TrailConfig {
        max_frame: 4,
        granularity: 6,
        ..TrailConfig::default()
    }
}

fn state_of(app: &App, entity: Entity) -> Option<TrailState> {
    let handle = app.world().get::<TrailHandle>(entity)?;
    let engine = app.world().get_resource::<TrailEngine>()?;
    engine.0.trail(handle.0).map(|t| t.state())
}

#[test]
fn plugin_inserts_engine_and_mesh() {
    let mut app = app();
    assert!(app.world().get_resource::<TrailEngine>().is_some());
    assert!(app.world().get_resource::<TrailEntities>().is_some());

    app.update();
    let target = app.world().get_resource::<TrailMesh>().cloned();
    let target = target.expect("mesh spawned at startup");
    let meshes = app.world().resource::<Assets<Mesh>>();
    assert!(meshes.get(&target.mesh).is_some());
}

#[test]
fn weapon_trail_fills_the_shared_mesh() {
    let mut app = app();
    let trail = spawn_blade(&mut app, small_cfg());
    for _ in 0..10 {
        app.update();
    }

    assert_eq!(state_of(&app, trail), Some(TrailState::Active));

    let target = app.world().resource::<TrailMesh>().clone();
    let meshes = app.world().resource::<Assets<Mesh>>();
    let mesh = meshes.get(&target.mesh).expect("mesh asset");
    let vertices = mesh
        .attribute(Mesh::ATTRIBUTE_POSITION)
        .map(|a| a.len())
        .unwrap_or(0);
    assert_eq!(vertices, 6 * 3);
    assert_eq!(mesh.indices().map(|i| i.len()), Some(5 * 12));
    assert!(mesh.attribute(Mesh::ATTRIBUTE_UV_0).is_some());
    assert!(mesh.attribute(Mesh::ATTRIBUTE_COLOR).is_some());

    let aabb = app
        .world()
        .get::<Aabb>(target.entity)
        .copied()
        .expect("aabb on mesh entity");
    assert!((aabb.center.y - 0.5).abs() < 1e-4);
    assert!((aabb.half_extents.y - 0.5).abs() < 1e-4);
}

#[test]
fn disabling_the_component_fades_the_trail_out() {
    let mut app = app();
    let trail = spawn_blade(&mut app, small_cfg());
    for _ in 0..5 {
        app.update();
    }
    assert_eq!(state_of(&app, trail), Some(TrailState::Active));

    if let Some(mut weapon) = app.world_mut().get_mut::<WeaponTrail>(trail) {
        weapon.enabled = false;
    }
    app.update();
    assert_eq!(state_of(&app, trail), Some(TrailState::Fading));

    for _ in 0..40 {
        app.update();
    }
    assert_eq!(state_of(&app, trail), Some(TrailState::Inactive));
}

#[test]
fn despawned_trail_is_released() {
    let mut app = app();
    let trail = spawn_blade(&mut app, small_cfg());
    app.update();
    assert_eq!(app.world().resource::<TrailEngine>().0.len(), 1);

    app.world_mut().despawn(trail);
    app.update();
    assert!(app.world().resource::<TrailEngine>().0.is_empty());
    assert!(app.world().resource::<TrailEntities>().by_entity.is_empty());
}

#[test]
fn scene_reload_starts_a_new_buffer_generation() {
    let mut app = app();
    let trail = spawn_blade(&mut app, small_cfg());
    for _ in 0..3 {
        app.update();
    }
    let before = app.world().resource::<TrailEngine>().0.buffer().id();

    app.world_mut().send_event(SceneReloaded);
    app.update();

    let engine = &app.world().resource::<TrailEngine>().0;
    assert_ne!(engine.buffer().id(), before);
    // Still enabled, so it re-initializes in the same frame.
    assert_eq!(state_of(&app, trail), Some(TrailState::Active));
    let handle = app.world().get::<TrailHandle>(trail).copied();
    let segment = handle
        .and_then(|h| engine.trail(h.0))
        .and_then(|t| t.segment())
        .expect("segment after reload");
    assert_eq!(segment.buffer, engine.buffer().id());
}

#[test]
fn invalid_config_is_not_registered() {
    let mut app = app();
    let trail = spawn_blade(
        &mut app,
        TrailConfig {
            fps: 0.0,
            ..TrailConfig::default()
        },
    );
    app.update();
    assert!(app.world().get::<TrailHandle>(trail).is_none());
    assert!(app.world().resource::<TrailEngine>().0.is_empty());

    // Config round-trips through JSON the same way hosts load it.
    let json = serde_json::to_string(&small_cfg()).expect("serialize");
    assert_eq!(TrailConfig::from_json_str(&json).ok(), Some(small_cfg()));
}

#[test]
fn configured_trail_length_survives_ticking() {
    let mut app = app();
    let trail = spawn_blade(
        &mut app,
        TrailConfig {
            trail_length: 0.5,
            ..small_cfg()
        },
    );
    assert_eq!(
        app.world().get::<WeaponTrail>(trail).map(|w| w.trail_length),
        Some(0.5)
    );
    for _ in 0..5 {
        app.update();
    }

    let handle = app.world().get::<TrailHandle>(trail).copied().expect("registered");
    let engine = &app.world().resource::<TrailEngine>().0;
    let instance = engine.trail(handle.0).expect("trail");
    assert_eq!(instance.trail_length(), 0.5);
    assert_eq!(instance.rendered_fraction(), 0.5);
}

#[test]
fn trail_material_key_selects_the_mesh_material() {
    let mut app = app();
    let slash = app
        .world_mut()
        .resource_mut::<Assets<StandardMaterial>>()
        .add(StandardMaterial::default());
    app.world_mut()
        .resource_mut::<TrailMaterials>()
        .by_key
        .insert(MaterialKey("slash".to_string()), slash.clone());

    let trail = spawn_blade(
        &mut app,
        TrailConfig {
            material: Some(MaterialKey("slash".to_string())),
            ..small_cfg()
        },
    );
    app.update();
    assert_eq!(state_of(&app, trail), Some(TrailState::Active));

    let target = app.world().resource::<TrailMesh>().clone();
    let used = app
        .world()
        .get::<Handle<StandardMaterial>>(target.entity)
        .cloned()
        .expect("material on mesh entity");
    assert_eq!(used, slash);
    assert_ne!(used, target.material);
}
