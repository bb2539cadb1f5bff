//! Fading particles left behind by the playback marker.

use std::collections::VecDeque;

use crate::config::PlaybackConfig;
use crate::layout::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailParticle {
    pub pos: Point,
    pub born: f64,
    /// Render scale in `[0.5, 1.5)`; the host picks it (randomly) per particle.
    pub scale: f64,
}

#[derive(Debug, Clone)]
pub struct Trail {
    particles: VecDeque<TrailParticle>,
    fade: f64,
    spacing: f64,
    max: usize,
}

impl Trail {
    pub fn new(cfg: &PlaybackConfig) -> Self {
        Self {
            particles: VecDeque::new(),
            fade: cfg.trail_fade,
            spacing: cfg.trail_spacing_px,
            max: cfg.trail_max_particles.max(1),
        }
    }

    /// Drops a particle at `pos` once the marker has moved `spacing` px since the last one.
    pub fn record(&mut self, pos: Point, now: f64, scale: f64) -> bool {
        if let Some(last) = self.particles.back() {
            if last.pos.distance(pos) < self.spacing {
                return false;
            }
        }
        if self.particles.len() == self.max {
            self.particles.pop_front();
        }
        self.particles.push_back(TrailParticle {
            pos,
            born: now,
            scale: scale.clamp(0.5, 1.5),
        });
        true
    }

    /// Removes particles that have fully faded.
    pub fn expire(&mut self, now: f64) {
        while let Some(front) = self.particles.front() {
            if now - front.born >= self.fade {
                self.particles.pop_front();
            } else {
                break;
            }
        }
    }

    /// Linear fade from 1 at birth to 0 after `fade` seconds.
    pub fn alpha(&self, particle: &TrailParticle, now: f64) -> f64 {
        (1.0 - (now - particle.born) / self.fade).clamp(0.0, 1.0)
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrailParticle> + '_ {
        self.particles.iter()
    }
}
