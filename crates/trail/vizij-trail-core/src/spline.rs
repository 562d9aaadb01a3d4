//! Curve fitting boundary and the default Catmull-Rom implementation.
//!
//! The trail controller only relies on the [`CurveFitter`] contract: an
//! ordered list of control points (position + normal) that can be rewritten
//! in place, a `refresh` step, and sampling by normalized arc length.

use glam::Vec3;

/// One input sample of the curve.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ControlPoint {
    pub position: Vec3,
    pub normal: Vec3,
}

/// Curve scheme used by trails. `t` is normalized arc length in [0, 1], with
/// 0 at the first control point.
pub trait CurveFitter {
    fn clear(&mut self);
    fn add_control_point(&mut self, position: Vec3, normal: Vec3);
    fn control_point_count(&self) -> usize;
    /// Move an existing control point. Out-of-range indices are ignored.
    fn set_control_point(&mut self, index: usize, position: Vec3, normal: Vec3);
    /// Re-derive segments after control points moved.
    fn refresh(&mut self);
    fn interpolate_by_len(&self, t: f32) -> Vec3;
    fn interpolate_normal_by_len(&self, t: f32) -> Vec3;
    fn granularity(&self) -> usize;
    fn set_granularity(&mut self, granularity: usize);
}

/// Uniform Catmull-Rom spline with a per-segment arc-length table.
///
/// Segment lengths are estimated with `granularity` chords each. Within a
/// segment the local parameter is taken proportional to the remaining length,
/// which is close enough for ribbons sampled at 60 cross-sections.
#[derive(Clone, Debug)]
pub struct CatmullRomSpline {
    points: Vec<ControlPoint>,
    segment_lengths: Vec<f32>,
    total_length: f32,
    granularity: usize,
}

impl Default for CatmullRomSpline {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_GRANULARITY)
    }
}

impl CatmullRomSpline {
    pub fn new(granularity: usize) -> Self {
        Self {
            points: Vec::new(),
            segment_lengths: Vec::new(),
            total_length: 0.0,
            granularity: granularity.max(1),
        }
    }

    #[inline]
    pub fn total_length(&self) -> f32 {
        self.total_length
    }

    #[inline]
    pub fn control_points(&self) -> &[ControlPoint] {
        &self.points
    }

    /// Position on segment `i` (between points `i` and `i + 1`) at local `u`.
    fn eval_segment(&self, i: usize, u: f32) -> Vec3 {
        let last = self.points.len() - 1;
        let p0 = self.points[i.saturating_sub(1)].position;
        let p1 = self.points[i].position;
        let p2 = self.points[(i + 1).min(last)].position;
        let p3 = self.points[(i + 2).min(last)].position;
        catmull_rom(p0, p1, p2, p3, u)
    }

    /// Map arc-length fraction `t` to (segment, local parameter).
    fn locate(&self, t: f32) -> Option<(usize, f32)> {
        if self.points.len() < 2 || self.total_length <= f32::EPSILON {
            return None;
        }
        let target = t.clamp(0.0, 1.0) * self.total_length;
        let mut walked = 0.0;
        for (i, &len) in self.segment_lengths.iter().enumerate() {
            if walked + len >= target && len > 0.0 {
                return Some((i, ((target - walked) / len).clamp(0.0, 1.0)));
            }
            walked += len;
        }
        // Rounding left us past the end: pin to the last non-empty segment.
        self.segment_lengths
            .iter()
            .rposition(|&len| len > 0.0)
            .map(|i| (i, 1.0))
    }
}

#[inline]
fn catmull_rom(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, u: f32) -> Vec3 {
    let u2 = u * u;
    let u3 = u2 * u;
    0.5 * ((2.0 * p1)
        + (p2 - p0) * u
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * u2
        + (3.0 * p1 - p0 - 3.0 * p2 + p3) * u3)
}

impl CurveFitter for CatmullRomSpline {
    fn clear(&mut self) {
        self.points.clear();
        self.segment_lengths.clear();
        self.total_length = 0.0;
    }

    fn add_control_point(&mut self, position: Vec3, normal: Vec3) {
        self.points.push(ControlPoint { position, normal });
    }

    fn control_point_count(&self) -> usize {
        self.points.len()
    }

    fn set_control_point(&mut self, index: usize, position: Vec3, normal: Vec3) {
        if let Some(cp) = self.points.get_mut(index) {
            cp.position = position;
            cp.normal = normal;
        }
    }

    fn refresh(&mut self) {
        self.segment_lengths.clear();
        self.total_length = 0.0;
        if self.points.len() < 2 {
            return;
        }
        let steps = self.granularity;
        for i in 0..self.points.len() - 1 {
            let mut len = 0.0;
            let mut prev = self.points[i].position;
            for s in 1..=steps {
                let p = self.eval_segment(i, s as f32 / steps as f32);
                len += prev.distance(p);
                prev = p;
            }
            self.segment_lengths.push(len);
            self.total_length += len;
        }
    }

    fn interpolate_by_len(&self, t: f32) -> Vec3 {
        match self.locate(t) {
            Some((i, u)) => self.eval_segment(i, u),
            None => self.points.first().map_or(Vec3::ZERO, |cp| cp.position),
        }
    }

    fn interpolate_normal_by_len(&self, t: f32) -> Vec3 {
        match self.locate(t) {
            Some((i, u)) => {
                let a = self.points[i].normal;
                let b = self.points[(i + 1).min(self.points.len() - 1)].normal;
                a.lerp(b, u)
            }
            None => self.points.first().map_or(Vec3::ZERO, |cp| cp.normal),
        }
    }

    fn granularity(&self) -> usize {
        self.granularity
    }

    fn set_granularity(&mut self, granularity: usize) {
        self.granularity = granularity.max(1);
    }
}
