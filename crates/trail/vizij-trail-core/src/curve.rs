//! Glue between the snapshot history and a [`CurveFitter`].
//!
//! Control point `i` mirrors history entry `i`: the snapshot midpoint becomes
//! the position and the start-to-end vector becomes the normal.

use glam::Vec3;

use crate::history::HistoryWindow;
use crate::snapshot::Snapshot;
use crate::spline::CurveFitter;

#[derive(Debug, Clone)]
pub struct CurveAdapter<C> {
    curve: C,
    slots: usize,
}

impl<C: CurveFitter> CurveAdapter<C> {
    pub fn new(curve: C) -> Self {
        Self { curve, slots: 0 }
    }

    /// Rebuild the control list with `slots` copies of `head`, giving a
    /// zero-length curve that cannot visibly uncoil on first activation.
    pub fn seed(&mut self, head: &Snapshot, slots: usize, granularity: usize) {
        self.curve.set_granularity(granularity);
        self.curve.clear();
        for _ in 0..slots {
            self.curve
                .add_control_point(head.midpoint(), head.direction());
        }
        self.slots = slots;
        self.curve.refresh();
    }

    /// Copy the history into the control points and refresh the curve.
    /// Slots beyond the current history length repeat the oldest entry.
    pub fn sync(&mut self, history: &HistoryWindow) {
        let tail = *history.tail();
        for i in 0..self.slots {
            let snap = history.get(i).copied().unwrap_or(tail);
            self.curve
                .set_control_point(i, snap.midpoint(), snap.direction());
        }
        self.curve.refresh();
    }

    /// Centerline position and cross direction at arc-length fraction `t`.
    #[inline]
    pub fn sample(&self, t: f32) -> (Vec3, Vec3) {
        (
            self.curve.interpolate_by_len(t),
            self.curve.interpolate_normal_by_len(t),
        )
    }

    #[inline]
    pub fn slots(&self) -> usize {
        self.slots
    }

    #[inline]
    pub fn curve(&self) -> &C {
        &self.curve
    }

    #[inline]
    pub fn curve_mut(&mut self) -> &mut C {
        &mut self.curve
    }
}
