//! Shared, growable geometry buffer carved into fixed-size segments.
//!
//! Four arrays grow together: positions, UVs and colors per vertex, plus the
//! triangle index list. Trails never see the arrays directly; they write
//! through the [`Segment`] they were issued, and the host reads everything
//! back once per frame through a [`MeshSink`] during [`GeometryBuffer::flush`].

use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::config::PoolConfig;
use crate::ids::{BufferId, MaterialKey};

/// Fixed sub-range of a [`GeometryBuffer`] owned by one trail.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub vertex_offset: usize,
    pub vertex_count: usize,
    pub index_offset: usize,
    pub index_count: usize,
    pub buffer: BufferId,
}

/// Axis-aligned bounding box of the combined mesh.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Bounds of a point set; `None` when it is empty.
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let (min, max) = rest
            .iter()
            .fold((*first, *first), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
        Some(Self { min, max })
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
}

/// Host-side receiver of mesh data. Only arrays that changed since the last
/// flush are handed over.
pub trait MeshSink {
    fn upload_positions(&mut self, positions: &[Vec3]);
    fn upload_uvs(&mut self, uvs: &[Vec2]);
    fn upload_colors(&mut self, colors: &[Vec4]);
    fn upload_indices(&mut self, indices: &[u32]);
    fn update_bounds(&mut self, bounds: Aabb);
}

/// What a flush pushed to the sink.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub positions: bool,
    pub uvs: bool,
    pub colors: bool,
    pub indices: bool,
    pub bounds: bool,
}

impl FlushReport {
    #[inline]
    pub fn uploaded_anything(&self) -> bool {
        self.positions || self.uvs || self.colors || self.indices || self.bounds
    }
}

#[derive(Copy, Clone, Debug, Default)]
struct DirtyFlags {
    positions: bool,
    uvs: bool,
    colors: bool,
    indices: bool,
}

#[derive(Debug)]
pub struct GeometryBuffer {
    id: BufferId,
    block_size: usize,
    bounds_interval: f32,
    material: Option<MaterialKey>,

    positions: Vec<Vec3>,
    uvs: Vec<Vec2>,
    colors: Vec<Vec4>,
    indices: Vec<u32>,

    vertex_used: usize,
    index_used: usize,
    // Released segments of this generation, reused by same-sized allocations.
    free: Vec<Segment>,

    dirty: DirtyFlags,
    bounds: Option<Aabb>,
    bounds_elapsed: f32,
    first_flush: bool,
}

impl GeometryBuffer {
    pub fn new(id: BufferId, cfg: &PoolConfig) -> Self {
        Self {
            id,
            block_size: cfg.block_size.max(1),
            bounds_interval: cfg.bounds_interval,
            material: cfg.material.clone(),
            positions: Vec::new(),
            uvs: Vec::new(),
            colors: Vec::new(),
            indices: Vec::new(),
            vertex_used: 0,
            index_used: 0,
            free: Vec::new(),
            dirty: DirtyFlags::default(),
            bounds: None,
            bounds_elapsed: 0.0,
            first_flush: true,
        }
    }

    #[inline]
    pub fn id(&self) -> BufferId {
        self.id
    }

    #[inline]
    pub fn material(&self) -> Option<&MaterialKey> {
        self.material.as_ref()
    }

    pub fn set_material(&mut self, material: Option<MaterialKey>) {
        self.material = material;
    }

    #[inline]
    pub fn vertex_used(&self) -> usize {
        self.vertex_used
    }

    #[inline]
    pub fn vertex_total(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn index_used(&self) -> usize {
        self.index_used
    }

    #[inline]
    pub fn index_total(&self) -> usize {
        self.indices.len()
    }

    /// Used portion of the position array.
    #[inline]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions[..self.vertex_used]
    }

    #[inline]
    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs[..self.vertex_used]
    }

    #[inline]
    pub fn colors(&self) -> &[Vec4] {
        &self.colors[..self.vertex_used]
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices[..self.index_used]
    }

    /// Last computed bounding volume.
    #[inline]
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    /// Round `deficit` up to whole blocks.
    #[inline]
    fn grow_amount(&self, deficit: usize) -> usize {
        deficit.div_ceil(self.block_size) * self.block_size
    }

    /// Reserve a segment. A released segment of exactly the same size is
    /// reused; otherwise the new one goes after all previous ones. Existing
    /// segments keep their offsets; only capacity changes.
    pub fn allocate(&mut self, vertex_count: usize, index_count: usize) -> Segment {
        if let Some(at) = self
            .free
            .iter()
            .position(|s| s.vertex_count == vertex_count && s.index_count == index_count)
        {
            let segment = self.free.swap_remove(at);
            log::debug!(
                "geometry buffer {:?}: reuse segment at vertex {}",
                self.id,
                segment.vertex_offset
            );
            return segment;
        }
        let vertex_need = (self.vertex_used + vertex_count).saturating_sub(self.vertex_total());
        let index_need = (self.index_used + index_count).saturating_sub(self.index_total());
        if vertex_need > 0 || index_need > 0 {
            let vertex_grow = self.grow_amount(vertex_need);
            let index_grow = self.grow_amount(index_need);
            self.enlarge(vertex_grow, index_grow);
        }

        let segment = Segment {
            vertex_offset: self.vertex_used,
            vertex_count,
            index_offset: self.index_used,
            index_count,
            buffer: self.id,
        };
        self.vertex_used += vertex_count;
        self.index_used += index_count;
        self.mark_all_dirty();
        segment
    }

    /// Return a segment for reuse. Its contents stay as they are until the
    /// next owner writes them. Segments from another generation are ignored.
    pub fn release(&mut self, segment: Segment) {
        if !self.owns(&segment) {
            log::warn!("geometry buffer {:?}: ignored release of stale segment", self.id);
            return;
        }
        if self.free.contains(&segment) {
            log::warn!("geometry buffer {:?}: segment released twice", self.id);
            return;
        }
        self.free.push(segment);
    }

    /// Number of released segments waiting for reuse.
    #[inline]
    pub fn free_segments(&self) -> usize {
        self.free.len()
    }

    /// Copy-and-grow all four arrays. Previously used contents move forward
    /// unchanged; new tail slots are zeroed.
    fn enlarge(&mut self, vertex_grow: usize, index_grow: usize) {
        let vertex_total = self.vertex_total() + vertex_grow;
        let index_total = self.index_total() + index_grow;
        log::debug!(
            "geometry buffer {:?}: grow to {} vertices / {} indices",
            self.id,
            vertex_total,
            index_total
        );
        self.positions.resize(vertex_total, Vec3::ZERO);
        self.uvs.resize(vertex_total, Vec2::ZERO);
        self.colors.resize(vertex_total, Vec4::ZERO);
        self.indices.resize(index_total, 0);
    }

    fn mark_all_dirty(&mut self) {
        self.dirty = DirtyFlags {
            positions: true,
            uvs: true,
            colors: true,
            indices: true,
        };
    }

    /// Segments issued by another buffer or a previous generation of this one.
    #[inline]
    fn owns(&self, segment: &Segment) -> bool {
        segment.buffer == self.id
    }

    /// Write one vertex of `segment`. `local` must be below
    /// `segment.vertex_count`; violations assert in debug builds and are
    /// dropped in release builds.
    pub fn write_vertex(
        &mut self,
        segment: &Segment,
        local: usize,
        position: Vec3,
        uv: Vec2,
        color: Vec4,
    ) {
        debug_assert!(
            local < segment.vertex_count,
            "vertex {local} outside segment of {}",
            segment.vertex_count
        );
        debug_assert!(self.owns(segment), "segment from a stale buffer");
        if local >= segment.vertex_count || !self.owns(segment) {
            log::warn!("geometry buffer {:?}: rejected vertex write", self.id);
            return;
        }
        let at = segment.vertex_offset + local;
        if at >= self.vertex_used {
            return;
        }
        self.positions[at] = position;
        self.uvs[at] = uv;
        self.colors[at] = color;
        self.dirty.positions = true;
        self.dirty.uvs = true;
        self.dirty.colors = true;
    }

    /// Write one index of `segment`. `vertex` is a buffer-global vertex id.
    pub fn write_index(&mut self, segment: &Segment, local: usize, vertex: u32) {
        debug_assert!(
            local < segment.index_count,
            "index {local} outside segment of {}",
            segment.index_count
        );
        debug_assert!(self.owns(segment), "segment from a stale buffer");
        if local >= segment.index_count || !self.owns(segment) {
            log::warn!("geometry buffer {:?}: rejected index write", self.id);
            return;
        }
        let at = segment.index_offset + local;
        if at >= self.index_used {
            return;
        }
        self.indices[at] = vertex;
        self.dirty.indices = true;
    }

    /// Push dirty arrays to `sink` and clear the flags. Bounds are recomputed
    /// on the first flush and then whenever `bounds_interval` seconds of
    /// frame time have accumulated.
    pub fn flush(&mut self, sink: &mut dyn MeshSink, dt: f32) -> FlushReport {
        let mut report = FlushReport::default();
        let used = self.vertex_used;

        if self.dirty.positions {
            sink.upload_positions(&self.positions[..used]);
            report.positions = true;
        }
        if self.dirty.uvs {
            sink.upload_uvs(&self.uvs[..used]);
            report.uvs = true;
        }
        if self.dirty.colors {
            sink.upload_colors(&self.colors[..used]);
            report.colors = true;
        }
        if self.dirty.indices {
            sink.upload_indices(&self.indices[..self.index_used]);
            report.indices = true;
        }
        self.dirty = DirtyFlags::default();

        self.bounds_elapsed += dt;
        if self.first_flush || self.bounds_elapsed >= self.bounds_interval {
            self.bounds_elapsed = 0.0;
            // An empty buffer keeps the first-flush request pending.
            if let Some(bounds) = Aabb::from_points(&self.positions[..used]) {
                self.first_flush = false;
                self.bounds = Some(bounds);
                sink.update_bounds(bounds);
                report.bounds = true;
            }
        }
        report
    }

    /// Forget every segment and start a new generation under `id`. Capacity is
    /// kept so a reloaded scene can refill without growing again.
    pub fn reset(&mut self, id: BufferId) {
        self.id = id;
        self.vertex_used = 0;
        self.index_used = 0;
        self.free.clear();
        self.bounds = None;
        self.bounds_elapsed = 0.0;
        self.first_flush = true;
        self.mark_all_dirty();
    }
}
