//! Per-instance trail controller: lifecycle state machine, timed sampling,
//! fade-out, and the ribbon rebuild pass.
//!
//! Lifecycle: `Uninitialized -> Inactive -> Active <-> Fading -> Inactive`.
//! Every ribbon owns one segment of the shared [`GeometryBuffer`] holding
//! `granularity` cross-sections of three vertices (edge, centerline, edge).

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::buffer::{GeometryBuffer, Segment};
use crate::config::TrailConfig;
use crate::curve::CurveAdapter;
use crate::error::TrailError;
use crate::history::HistoryWindow;
use crate::ids::MaterialKey;
use crate::spline::{CatmullRomSpline, CurveFitter};

/// Fade duration used in place of zero so fade progress never divides by zero.
pub const MIN_FADE_DURATION: f32 = 1e-4;

/// Slack when comparing the sampling accumulator against the interval.
const TIMING_EPSILON: f64 = 1e-6;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrailState {
    /// No segment or curve yet; activation initializes lazily.
    Uninitialized,
    Inactive,
    Active,
    /// Still ticking, with the rendered fraction driven by the fade.
    Fading,
}

impl TrailState {
    #[inline]
    pub fn is_ticking(self) -> bool {
        matches!(self, TrailState::Active | TrailState::Fading)
    }
}

/// World-space anchor positions for one tick.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Anchors {
    pub start: Vec3,
    pub end: Vec3,
}

impl Anchors {
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct Fade {
    /// Current opacity factor in [0, 1] (may dip below 0 on the final step).
    value: f32,
    /// Value when the current fade started.
    from: f32,
    elapsed: f32,
    duration: f32,
}

impl Fade {
    const OPAQUE: Fade = Fade {
        value: 1.0,
        from: 1.0,
        elapsed: 0.0,
        duration: 1.0,
    };
}

#[derive(Debug)]
pub struct TrailInstance<C = CatmullRomSpline> {
    cfg: TrailConfig,
    state: TrailState,
    anchors: Option<Anchors>,
    history: HistoryWindow,
    curve: CurveAdapter<C>,
    segment: Option<Segment>,
    half_width: f32,
    fade: Fade,
    accumulator: f64,

    // Host-driven enable flag and the value seen at the last reconcile.
    desired_enabled: bool,
    seen_enabled: bool,

    // Manual rendered fraction; negative means a manual fade already finished.
    trail_length: f32,
    prev_trail_length: f32,

    samples_pushed: u64,
}

impl TrailInstance<CatmullRomSpline> {
    pub fn new(cfg: TrailConfig) -> Self {
        let granularity = cfg.granularity;
        Self::with_curve(cfg, CatmullRomSpline::new(granularity))
    }
}

impl<C: CurveFitter> TrailInstance<C> {
    /// Build an uninitialized trail around a caller-provided curve scheme.
    pub fn with_curve(cfg: TrailConfig, curve: C) -> Self {
        let history = HistoryWindow::new(cfg.max_frame, Vec3::ZERO, Vec3::ZERO);
        let trail_length = cfg.trail_length;
        Self {
            cfg,
            state: TrailState::Uninitialized,
            anchors: None,
            history,
            curve: CurveAdapter::new(curve),
            segment: None,
            half_width: 0.0,
            fade: Fade::OPAQUE,
            accumulator: 0.0,
            desired_enabled: false,
            seen_enabled: false,
            trail_length,
            prev_trail_length: trail_length,
            samples_pushed: 0,
        }
    }

    // ----- accessors -----

    #[inline]
    pub fn config(&self) -> &TrailConfig {
        &self.cfg
    }

    #[inline]
    pub fn state(&self) -> TrailState {
        self.state
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.state != TrailState::Uninitialized
    }

    #[inline]
    pub fn history(&self) -> &HistoryWindow {
        &self.history
    }

    #[inline]
    pub fn curve(&self) -> &C {
        self.curve.curve()
    }

    #[inline]
    pub fn segment(&self) -> Option<Segment> {
        self.segment
    }

    /// Half the anchor separation measured at initialization.
    #[inline]
    pub fn half_width(&self) -> f32 {
        self.half_width
    }

    #[inline]
    pub fn samples_pushed(&self) -> u64 {
        self.samples_pushed
    }

    #[inline]
    pub fn anchors(&self) -> Option<Anchors> {
        self.anchors
    }

    #[inline]
    pub fn trail_length(&self) -> f32 {
        self.trail_length
    }

    #[inline]
    pub fn desired_enabled(&self) -> bool {
        self.desired_enabled
    }

    /// Opaque material reference from the config, if any.
    #[inline]
    pub fn material(&self) -> Option<&MaterialKey> {
        self.cfg.material.as_ref()
    }

    /// Current fade factor; 1 when not fading.
    #[inline]
    pub fn fade_value(&self) -> f32 {
        self.fade.value.max(0.0)
    }

    /// Fraction of the curve the ribbon currently covers.
    pub fn rendered_fraction(&self) -> f32 {
        let base = self.trail_length.clamp(0.0, 1.0);
        match self.state {
            TrailState::Active => base,
            TrailState::Fading => base * self.fade.value.max(0.0),
            TrailState::Uninitialized | TrailState::Inactive => 0.0,
        }
    }

    // ----- host inputs -----

    pub fn set_anchors(&mut self, anchors: Anchors) {
        self.anchors = Some(anchors);
    }

    /// Desired on/off flag, reconciled at the start of the next `update`.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.desired_enabled = enabled;
    }

    /// Manually drive the rendered fraction. Values above 1 are capped; a
    /// negative value marks a finished manual fade, so a later disable skips
    /// the automatic fade.
    pub fn set_trail_length(&mut self, fraction: f32) {
        self.trail_length = fraction.min(1.0);
    }

    /// Swap the configuration. The trail drops back to `Uninitialized`; the
    /// old segment stays reserved in the buffer until the next reset.
    pub fn reconfigure(&mut self, cfg: TrailConfig) {
        let anchors = self.anchors.unwrap_or(Anchors::new(Vec3::ZERO, Vec3::ZERO));
        self.history = HistoryWindow::new(cfg.max_frame, anchors.start, anchors.end);
        self.trail_length = cfg.trail_length;
        self.prev_trail_length = cfg.trail_length;
        self.cfg = cfg;
        self.invalidate();
    }

    // ----- lifecycle -----

    /// Allocate the segment, write the index topology and seed a degenerate
    /// curve. No-op when already initialized.
    pub fn initialize(&mut self, buffer: &mut GeometryBuffer) -> Result<(), TrailError> {
        if self.is_initialized() {
            return Ok(());
        }
        self.cfg.validate()?;
        let anchors = self.anchors.ok_or(TrailError::MissingAnchors)?;

        self.half_width = anchors.start.distance(anchors.end) * 0.5;
        self.history.reset_all(anchors.start, anchors.end);

        let segment = buffer.allocate(self.cfg.vertex_count(), self.cfg.index_count());
        self.write_indices(buffer, &segment);
        self.segment = Some(segment);
        self.bind_material(buffer);

        self.curve
            .seed(self.history.head(), self.cfg.max_frame, self.cfg.granularity);
        self.state = TrailState::Inactive;
        log::debug!(
            "trail initialized: {} vertices at offset {}, half width {}",
            segment.vertex_count,
            segment.vertex_offset,
            self.half_width
        );
        Ok(())
    }

    /// Start (or restart) the ribbon at the current anchors, with no fade and
    /// no leftover history.
    pub fn activate(&mut self, buffer: &mut GeometryBuffer) -> Result<(), TrailError> {
        self.initialize(buffer)?;
        let anchors = self.anchors.ok_or(TrailError::MissingAnchors)?;

        self.fade = Fade::OPAQUE;
        self.accumulator = 0.0;
        self.history.reset_all(anchors.start, anchors.end);
        self.curve.sync(&self.history);

        self.state = TrailState::Active;
        // Direct calls do not fight the host flag; only its edges count.
        self.seen_enabled = self.desired_enabled;
        self.rebuild_geometry(buffer);
        log::debug!("trail activated");
        Ok(())
    }

    /// Stop ticking and collapse the ribbon onto the head. The segment is kept
    /// for a later reactivation.
    pub fn deactivate(&mut self, buffer: &mut GeometryBuffer) {
        if !self.is_initialized() {
            return;
        }
        self.state = TrailState::Inactive;
        self.seen_enabled = self.desired_enabled;
        self.collapse_geometry(buffer);
        log::debug!("trail deactivated");
    }

    /// Fade the ribbon out over `duration` seconds. A zero duration is
    /// coerced to [`MIN_FADE_DURATION`]. Restarting a fade continues from the
    /// current fade value, so the rendered fraction never grows back.
    pub fn request_fade_out(&mut self, duration: f32) {
        if !self.state.is_ticking() {
            return;
        }
        let duration = if duration > 0.0 {
            duration
        } else {
            MIN_FADE_DURATION
        };
        let from = self.fade.value.clamp(0.0, 1.0);
        self.fade = Fade {
            value: from,
            from,
            elapsed: 0.0,
            duration,
        };
        self.state = TrailState::Fading;
        log::debug!("trail fading over {duration}s");
    }

    /// Collapse the ribbon and give up its segment. The trail is left
    /// uninitialized; the caller hands the segment back to the buffer.
    pub(crate) fn detach(&mut self, buffer: &mut GeometryBuffer) -> Option<Segment> {
        self.deactivate(buffer);
        let segment = self.segment.take();
        self.invalidate();
        segment
    }

    /// Drop all cached geometry and curve state (scene reload). The next
    /// activation initializes again against the current buffer.
    pub fn invalidate(&mut self) {
        self.state = TrailState::Uninitialized;
        self.segment = None;
        self.fade = Fade::OPAQUE;
        self.accumulator = 0.0;
        // Forget the last reconciled flag so an enabled trail re-activates.
        self.seen_enabled = false;
    }

    // ----- per-frame update -----

    /// Advance one frame. Configuration problems are returned and leave the
    /// trail uninitialized; the caller decides how loudly to report them.
    pub fn update(
        &mut self,
        dt: f32,
        anchors: Option<Anchors>,
        buffer: &mut GeometryBuffer,
    ) -> Result<(), TrailError> {
        if let Some(anchors) = anchors {
            self.anchors = Some(anchors);
        }
        let result = self.tick(dt, buffer);
        self.prev_trail_length = self.trail_length;
        result
    }

    fn tick(&mut self, dt: f32, buffer: &mut GeometryBuffer) -> Result<(), TrailError> {
        self.reconcile_enabled(buffer)?;
        if !self.state.is_ticking() {
            return Ok(());
        }
        let anchors = self.anchors.ok_or(TrailError::MissingAnchors)?;

        self.history.record_head(anchors.start, anchors.end);

        let interval = 1.0 / f64::from(self.cfg.fps);
        self.accumulator += f64::from(dt);
        if self.accumulator + TIMING_EPSILON < interval {
            return Ok(());
        }
        self.accumulator -= interval;

        self.history.push_sample(anchors.start, anchors.end);
        self.curve.sync(&self.history);
        self.samples_pushed += 1;

        if self.state == TrailState::Fading {
            self.fade.elapsed += interval as f32;
            self.fade.value = self.fade.from * (1.0 - self.fade.elapsed / self.fade.duration);
            if self.fade.value < 0.0 {
                self.deactivate(buffer);
                return Ok(());
            }
        }

        self.rebuild_geometry(buffer);
        Ok(())
    }

    /// Turn edges of the desired-enabled flag into transitions.
    fn reconcile_enabled(&mut self, buffer: &mut GeometryBuffer) -> Result<(), TrailError> {
        match (self.seen_enabled, self.desired_enabled) {
            (false, true) => {
                // A fading trail restarts opaque; an active one keeps going.
                if self.state != TrailState::Active {
                    self.activate(buffer)?;
                }
                self.seen_enabled = true;
            }
            (true, false) => {
                self.seen_enabled = false;
                if self.state.is_ticking() {
                    if self.prev_trail_length < 0.0 {
                        self.deactivate(buffer);
                    } else {
                        self.request_fade_out(self.cfg.auto_fade_time * self.prev_trail_length);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    // ----- geometry -----

    /// Two triangles per quad, two quads (edge-center, center-edge) between
    /// consecutive cross-sections. Written once; only vertices change later.
    fn write_indices(&self, buffer: &mut GeometryBuffer, segment: &Segment) {
        for i in 0..self.cfg.granularity - 1 {
            let base = (segment.vertex_offset + i * 3) as u32;
            let next = base + 3;
            let tris = [
                next,
                next + 1,
                base,
                next + 1,
                base + 1,
                base,
                next + 1,
                next + 2,
                base + 1,
                next + 2,
                base + 2,
                base + 1,
            ];
            for (k, v) in tris.into_iter().enumerate() {
                buffer.write_index(segment, i * 12 + k, v);
            }
        }
    }

    /// Sample the curve at `granularity` evenly spaced arc-length fractions
    /// scaled by the rendered fraction and write the cross-sections.
    fn rebuild_geometry(&self, buffer: &mut GeometryBuffer) {
        let Some(segment) = self.segment else {
            return;
        };
        let fraction = self.rendered_fraction();
        let color = self.cfg.color;
        let last = (self.cfg.granularity - 1) as f32;
        for i in 0..self.cfg.granularity {
            let v = i as f32 / last;
            let (center, normal) = self.curve.sample(v * fraction);
            let offset = normal.normalize_or_zero() * self.half_width;
            let base = i * 3;
            buffer.write_vertex(&segment, base, center + offset, Vec2::new(0.0, v), color);
            buffer.write_vertex(&segment, base + 1, center, Vec2::new(0.5, v), color);
            buffer.write_vertex(&segment, base + 2, center - offset, Vec2::new(1.0, v), color);
        }
    }

    /// Hand the configured material to the shared buffer. The buffer renders
    /// with one material, so the first key wins and conflicts are logged.
    fn bind_material(&self, buffer: &mut GeometryBuffer) {
        let Some(key) = &self.cfg.material else {
            return;
        };
        match buffer.material() {
            None => buffer.set_material(Some(key.clone())),
            Some(current) if current != key => log::warn!(
                "trail material {:?} ignored, buffer {:?} already renders with {:?}",
                key,
                buffer.id(),
                current
            ),
            Some(_) => {}
        }
    }

    /// Pile every vertex onto the head midpoint so the ribbon has no area.
    fn collapse_geometry(&self, buffer: &mut GeometryBuffer) {
        let Some(segment) = self.segment else {
            return;
        };
        let head = self.history.head().midpoint();
        let last = (self.cfg.granularity - 1) as f32;
        for i in 0..self.cfg.granularity {
            let v = i as f32 / last;
            for (k, u) in [0.0, 0.5, 1.0].into_iter().enumerate() {
                buffer.write_vertex(&segment, i * 3 + k, head, Vec2::new(u, v), self.cfg.color);
            }
        }
    }
}
