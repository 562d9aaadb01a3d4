use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vizij_trail_core::{
    Aabb, Anchors, MeshSink, PoolConfig, TrailConfig, TrailId, TrailSystem, Vec2, Vec3, Vec4,
};

struct NullSink;

impl MeshSink for NullSink {
    fn upload_positions(&mut self, positions: &[Vec3]) {
        black_box(positions);
    }
    fn upload_uvs(&mut self, uvs: &[Vec2]) {
        black_box(uvs);
    }
    fn upload_colors(&mut self, colors: &[Vec4]) {
        black_box(colors);
    }
    fn upload_indices(&mut self, indices: &[u32]) {
        black_box(indices);
    }
    fn update_bounds(&mut self, bounds: Aabb) {
        black_box(bounds);
    }
}

fn bench_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("trail_frame");
    for trails in [1usize, 8, 64] {
        let mut sys: TrailSystem = TrailSystem::new(PoolConfig::default());
        for _ in 0..trails {
            let id = sys.add_trail(TrailConfig::default()).expect("valid config");
            sys.set_enabled(id, true).expect("trail exists");
        }
        let mut frame = 0u32;
        group.bench_with_input(BenchmarkId::from_parameter(trails), &trails, |b, _| {
            b.iter(|| {
                frame = frame.wrapping_add(1);
                let angle = frame as f32 * 0.05;
                let mut resolver = |id: TrailId| {
                    let dir = Vec3::new(angle.cos(), angle.sin(), id.0 as f32 * 0.01);
                    Some(Anchors::new(dir * 0.2, dir * 1.2))
                };
                sys.update(1.0 / 60.0, &mut resolver);
                sys.late_update(&mut NullSink, 1.0 / 60.0)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_frame);
criterion_main!(benches);
