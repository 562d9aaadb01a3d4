//! TrailSystem: owns the shared geometry buffer and every trail instance, and
//! drives the two per-frame phases.
//!
//! Methods:
//! - new, add_trail, remove_trail, update (update phase), late_update (flush),
//!   scene_reloaded

use hashbrown::HashMap;

use crate::buffer::{FlushReport, GeometryBuffer, MeshSink};
use crate::config::{PoolConfig, TrailConfig};
use crate::error::TrailError;
use crate::ids::{IdAllocator, TrailId};
use crate::spline::{CatmullRomSpline, CurveFitter};
use crate::trail::{Anchors, TrailInstance};

/// Supplies current anchor positions per trail. Adapters (Bevy, tests)
/// implement this and pass it into [`TrailSystem::update`].
pub trait AnchorResolver {
    fn resolve(&mut self, trail: TrailId) -> Option<Anchors>;
}

impl<F> AnchorResolver for F
where
    F: FnMut(TrailId) -> Option<Anchors>,
{
    fn resolve(&mut self, trail: TrailId) -> Option<Anchors> {
        self(trail)
    }
}

#[derive(Debug)]
struct TrailSlot<C> {
    instance: TrailInstance<C>,
    // Set after the first logged failure so a broken trail logs once.
    error_reported: bool,
}

#[derive(Debug)]
pub struct TrailSystem<C = CatmullRomSpline> {
    ids: IdAllocator,
    buffer: GeometryBuffer,
    trails: HashMap<TrailId, TrailSlot<C>>,
    // Insertion order, so segment layout is deterministic.
    order: Vec<TrailId>,
}

impl<C: CurveFitter> TrailSystem<C> {
    pub fn new(cfg: PoolConfig) -> Self {
        let mut ids = IdAllocator::new();
        let buffer = GeometryBuffer::new(ids.alloc_buffer(), &cfg);
        Self {
            ids,
            buffer,
            trails: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a trail with a custom curve scheme. The config is validated
    /// up front; geometry is allocated lazily on first activation.
    pub fn add_trail_with_curve(
        &mut self,
        cfg: TrailConfig,
        curve: C,
    ) -> Result<TrailId, TrailError> {
        cfg.validate()?;
        let id = self.ids.alloc_trail();
        self.trails.insert(
            id,
            TrailSlot {
                instance: TrailInstance::with_curve(cfg, curve),
                error_reported: false,
            },
        );
        self.order.push(id);
        Ok(id)
    }

    /// Drop a trail. Its ribbon is collapsed and its segment goes back to
    /// the buffer for the next trail of the same size.
    pub fn remove_trail(&mut self, id: TrailId) -> Option<TrailInstance<C>> {
        let mut slot = self.trails.remove(&id)?;
        self.order.retain(|t| *t != id);
        if let Some(segment) = slot.instance.detach(&mut self.buffer) {
            self.buffer.release(segment);
        }
        Some(slot.instance)
    }

    pub fn trail(&self, id: TrailId) -> Option<&TrailInstance<C>> {
        self.trails.get(&id).map(|s| &s.instance)
    }

    pub fn trail_mut(&mut self, id: TrailId) -> Option<&mut TrailInstance<C>> {
        self.trails.get_mut(&id).map(|s| &mut s.instance)
    }

    /// Trail ids in registration order.
    pub fn trail_ids(&self) -> &[TrailId] {
        &self.order
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[inline]
    pub fn buffer(&self) -> &GeometryBuffer {
        &self.buffer
    }

    pub fn set_enabled(&mut self, id: TrailId, enabled: bool) -> Result<(), TrailError> {
        self.trail_mut(id)
            .ok_or(TrailError::UnknownTrail(id))?
            .set_enabled(enabled);
        Ok(())
    }

    /// Activate a trail right away instead of waiting for the next update.
    pub fn activate(&mut self, id: TrailId) -> Result<(), TrailError> {
        let slot = self.trails.get_mut(&id).ok_or(TrailError::UnknownTrail(id))?;
        slot.instance.activate(&mut self.buffer)
    }

    pub fn deactivate(&mut self, id: TrailId) -> Result<(), TrailError> {
        let slot = self.trails.get_mut(&id).ok_or(TrailError::UnknownTrail(id))?;
        slot.instance.deactivate(&mut self.buffer);
        Ok(())
    }

    pub fn request_fade_out(&mut self, id: TrailId, duration: f32) -> Result<(), TrailError> {
        self.trail_mut(id)
            .ok_or(TrailError::UnknownTrail(id))?
            .request_fade_out(duration);
        Ok(())
    }

    /// Update phase: advance every trail once. Configuration problems are
    /// logged once per trail and leave that trail inactive; they never abort
    /// the frame for the others.
    pub fn update(&mut self, dt: f32, resolver: &mut dyn AnchorResolver) {
        for id in &self.order {
            let Some(slot) = self.trails.get_mut(id) else {
                continue;
            };
            let anchors = resolver.resolve(*id);
            match slot.instance.update(dt, anchors, &mut self.buffer) {
                Ok(()) => slot.error_reported = false,
                Err(err) => {
                    if !slot.error_reported {
                        log::error!("trail {:?}: {err}", id);
                        slot.error_reported = true;
                    }
                }
            }
        }
    }

    /// Late phase: flush the shared buffer exactly once.
    pub fn late_update(&mut self, sink: &mut dyn MeshSink, dt: f32) -> FlushReport {
        self.buffer.flush(sink, dt)
    }

    /// The host loaded a new scene: every segment is gone and each trail
    /// re-initializes on its next activation.
    pub fn scene_reloaded(&mut self) {
        let id = self.ids.alloc_buffer();
        self.buffer.reset(id);
        for slot in self.trails.values_mut() {
            slot.instance.invalidate();
            slot.error_reported = false;
        }
        log::debug!("trail system: scene reload, buffer generation {:?}", id);
    }
}

impl<C: CurveFitter + Default> TrailSystem<C> {
    pub fn add_trail(&mut self, cfg: TrailConfig) -> Result<TrailId, TrailError> {
        let mut curve = C::default();
        curve.set_granularity(cfg.granularity);
        self.add_trail_with_curve(cfg, curve)
    }
}

impl<C: CurveFitter> Default for TrailSystem<C> {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}
