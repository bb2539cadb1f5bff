//! How a freshly typed glyph travels to its layout position.
//!
//! Animators are stateless: the pose is a function of the target, the spawn
//! time and the current time, so a reflow simply swaps the target. Whatever
//! the motion, the resting position is exactly the layout position.

use crate::config::DropConfig;
use crate::layout::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphPose {
    pub pos: Point,
    pub settled: bool,
}

pub trait GlyphAnimator {
    fn pose(&self, target: Point, spawned_at: f64, now: f64) -> GlyphPose;
}

/// Places glyphs straight onto the grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapAnimator;

impl GlyphAnimator for SnapAnimator {
    fn pose(&self, target: Point, _spawned_at: f64, _now: f64) -> GlyphPose {
        GlyphPose {
            pos: target,
            settled: true,
        }
    }
}

/// Drops the glyph from above, lets it bounce with decaying height and snaps
/// it onto the target once a bounce is slower than `settle_speed`.
#[derive(Debug, Clone)]
pub struct DropAnimator {
    height: f64,
    gravity: f64,
    restitution: f64,
    settle_speed: f64,
}

impl DropAnimator {
    pub fn new(cfg: &DropConfig) -> Self {
        Self {
            height: cfg.drop_height_px,
            gravity: cfg.gravity_px_s2,
            restitution: cfg.restitution.clamp(0.0, 0.95),
            settle_speed: cfg.settle_speed.max(1e-3),
        }
    }

    /// Height above the target at `t` seconds after spawning; `None` once settled.
    fn height_at(&self, t: f64) -> Option<f64> {
        if !(self.height > 0.0 && self.gravity > 0.0) {
            return None;
        }
        if t <= 0.0 {
            return Some(self.height);
        }
        let fall = (2.0 * self.height / self.gravity).sqrt();
        if t < fall {
            return Some(self.height - 0.5 * self.gravity * t * t);
        }
        let mut t = t - fall;
        let mut v = self.gravity * fall;
        loop {
            v *= self.restitution;
            if v < self.settle_speed {
                return None;
            }
            let airtime = 2.0 * v / self.gravity;
            if t < airtime {
                return Some(v * t - 0.5 * self.gravity * t * t);
            }
            t -= airtime;
        }
    }

    /// Time from spawn until the glyph rests on its target.
    pub fn settle_time(&self) -> f64 {
        if !(self.height > 0.0 && self.gravity > 0.0) {
            return 0.0;
        }
        let fall = (2.0 * self.height / self.gravity).sqrt();
        let mut total = fall;
        let mut v = self.gravity * fall;
        loop {
            v *= self.restitution;
            if v < self.settle_speed {
                return total;
            }
            total += 2.0 * v / self.gravity;
        }
    }
}

impl GlyphAnimator for DropAnimator {
    fn pose(&self, target: Point, spawned_at: f64, now: f64) -> GlyphPose {
        match self.height_at(now - spawned_at) {
            Some(h) => GlyphPose {
                pos: Point::new(target.x, target.y - h.max(0.0)),
                settled: false,
            },
            None => GlyphPose {
                pos: target,
                settled: true,
            },
        }
    }
}
