use vizij_trail_core::{
    Aabb, Anchors, MeshSink, PoolConfig, TrailConfig, TrailError, TrailId, TrailState,
    TrailSystem, Vec2, Vec3, Vec4,
};

#[derive(Default)]
struct CountingSink {
    flushes_with_positions: usize,
    vertex_count: usize,
    index_count: usize,
    bounds: Option<Aabb>,
}

impl MeshSink for CountingSink {
    fn upload_positions(&mut self, positions: &[Vec3]) {
        self.flushes_with_positions += 1;
        self.vertex_count = positions.len();
    }
    fn upload_uvs(&mut self, _uvs: &[Vec2]) {}
    fn upload_colors(&mut self, _colors: &[Vec4]) {}
    fn upload_indices(&mut self, indices: &[u32]) {
        self.index_count = indices.len();
    }
    fn update_bounds(&mut self, bounds: Aabb) {
        self.bounds = Some(bounds);
    }
}

fn small_cfg() -> TrailConfig {
    TrailConfig {
        max_frame: 4,
        granularity: 5,
        ..TrailConfig::default()
    }
}

fn anchors_for(id: TrailId) -> Option<Anchors> {
    let x = id.0 as f32 * 10.0;
    Some(Anchors::new(
        Vec3::new(x, 0.0, 0.0),
        Vec3::new(x, 1.0, 0.0),
    ))
}

#[test]
fn trails_share_one_buffer_and_one_flush() -> anyhow::Result<()> {
    let mut sys: TrailSystem = TrailSystem::new(PoolConfig::default());
    let a = sys.add_trail(small_cfg())?;
    let b = sys.add_trail(small_cfg())?;
    sys.set_enabled(a, true)?;
    sys.set_enabled(b, true)?;

    let mut sink = CountingSink::default();
    for _ in 0..10 {
        sys.update(1.0 / 60.0, &mut anchors_for);
        sys.late_update(&mut sink, 1.0 / 60.0);
    }

    assert_eq!(sink.flushes_with_positions, 10);
    assert_eq!(sink.vertex_count, 2 * 15);
    assert_eq!(sink.index_count, 2 * 48);

    let seg_a = sys.trail(a).and_then(|t| t.segment()).expect("segment a");
    let seg_b = sys.trail(b).and_then(|t| t.segment()).expect("segment b");
    assert_eq!(seg_a.vertex_offset, 0);
    assert_eq!(seg_b.vertex_offset, 15);

    // Each trail only wrote inside its own range.
    let positions = sys.buffer().positions();
    assert!(positions[..15].iter().all(|p| p.x == 0.0));
    assert!(positions[15..].iter().all(|p| p.x == 10.0));

    let bounds = sink.bounds.expect("bounds on first flush");
    assert_eq!(bounds.min.x, 0.0);
    assert_eq!(bounds.max.x, 10.0);
    Ok(())
}

#[test]
fn invalid_config_is_rejected_on_add() {
    let mut sys: TrailSystem = TrailSystem::default();
    let err = sys
        .add_trail(TrailConfig {
            granularity: 1,
            ..TrailConfig::default()
        })
        .unwrap_err();
    assert_eq!(err, TrailError::InvalidGranularity(1));
    assert!(sys.is_empty());
}

#[test]
fn missing_anchors_leave_trail_uninitialized() -> anyhow::Result<()> {
    let mut sys: TrailSystem = TrailSystem::default();
    let id = sys.add_trail(small_cfg())?;
    sys.set_enabled(id, true)?;

    for _ in 0..3 {
        sys.update(1.0 / 60.0, &mut |_: TrailId| -> Option<Anchors> { None });
    }
    assert_eq!(sys.trail(id).map(|t| t.state()), Some(TrailState::Uninitialized));
    assert_eq!(sys.buffer().vertex_used(), 0);

    // Once anchors show up the pending enable goes through.
    sys.update(1.0 / 60.0, &mut anchors_for);
    assert_eq!(sys.trail(id).map(|t| t.state()), Some(TrailState::Active));
    Ok(())
}

#[test]
fn scene_reload_reinitializes_lazily() -> anyhow::Result<()> {
    let mut sys: TrailSystem = TrailSystem::default();
    let a = sys.add_trail(small_cfg())?;
    let b = sys.add_trail(small_cfg())?;
    sys.set_enabled(a, true)?;
    sys.update(1.0 / 60.0, &mut anchors_for);
    let first_buffer = sys.buffer().id();

    sys.scene_reloaded();
    assert_ne!(sys.buffer().id(), first_buffer);
    assert_eq!(sys.buffer().vertex_used(), 0);
    for id in [a, b] {
        assert_eq!(sys.trail(id).map(|t| t.state()), Some(TrailState::Uninitialized));
        assert!(sys.trail(id).and_then(|t| t.segment()).is_none());
    }

    // Trail `a` is still wanted, so it comes back; `b` never was.
    sys.update(1.0 / 60.0, &mut anchors_for);
    assert_eq!(sys.trail(a).map(|t| t.state()), Some(TrailState::Active));
    assert_eq!(sys.trail(b).map(|t| t.state()), Some(TrailState::Uninitialized));
    let seg = sys.trail(a).and_then(|t| t.segment()).expect("segment");
    assert_eq!(seg.buffer, sys.buffer().id());
    assert_eq!(seg.vertex_offset, 0);
    Ok(())
}

#[test]
fn unknown_trail_ids_are_errors() {
    let mut sys: TrailSystem = TrailSystem::default();
    let ghost = TrailId(99);
    assert_eq!(sys.set_enabled(ghost, true), Err(TrailError::UnknownTrail(ghost)));
    assert_eq!(sys.activate(ghost), Err(TrailError::UnknownTrail(ghost)));
    assert!(sys.remove_trail(ghost).is_none());
}

#[test]
fn removed_trail_collapses_its_ribbon() -> anyhow::Result<()> {
    let mut sys: TrailSystem = TrailSystem::default();
    let id = sys.add_trail(small_cfg())?;
    if let Some(trail) = sys.trail_mut(id) {
        trail.set_anchors(Anchors::new(Vec3::ZERO, Vec3::Y));
    }
    sys.activate(id)?;
    for i in 0..6 {
        let x = i as f32;
        sys.update(1.0 / 60.0, &mut |_: TrailId| {
            Some(Anchors::new(Vec3::new(x, 0.0, 0.0), Vec3::new(x, 1.0, 0.0)))
        });
    }
    let seg = sys.trail(id).and_then(|t| t.segment()).expect("segment");

    let removed = sys.remove_trail(id).expect("trail existed");
    assert_eq!(removed.state(), TrailState::Uninitialized);
    assert!(removed.segment().is_none());
    assert!(sys.trail(id).is_none());
    assert_eq!(sys.buffer().free_segments(), 1);

    let head = Vec3::new(5.0, 0.5, 0.0);
    let range = seg.vertex_offset..seg.vertex_offset + seg.vertex_count;
    assert!(sys.buffer().positions()[range].iter().all(|p| *p == head));
    Ok(())
}

#[test]
fn removed_segment_is_reused_by_same_sized_trail() -> anyhow::Result<()> {
    let mut sys: TrailSystem = TrailSystem::default();
    for _ in 0..20 {
        let id = sys.add_trail(small_cfg())?;
        sys.set_enabled(id, true)?;
        sys.update(1.0 / 60.0, &mut anchors_for);
        sys.remove_trail(id);
    }
    // Spawn/despawn churn never grows past one segment.
    assert_eq!(sys.buffer().vertex_used(), 15);
    assert_eq!(sys.buffer().index_used(), 48);

    // A differently sized trail still gets fresh space.
    let wide = sys.add_trail(TrailConfig {
        granularity: 8,
        ..small_cfg()
    })?;
    sys.set_enabled(wide, true)?;
    sys.update(1.0 / 60.0, &mut anchors_for);
    let seg = sys.trail(wide).and_then(|t| t.segment()).expect("segment");
    assert_eq!(seg.vertex_offset, 15);
    assert_eq!(sys.buffer().free_segments(), 1);
    Ok(())
}
