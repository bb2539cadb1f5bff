//! Playback path: one arcing hop per pair of consecutive note positions.
//!
//! Segment durations balance three constraints: the share of the total
//! duration implied by the smoothed schedule, a floor so hops never become
//! imperceptibly fast, and a speed cap so long hops never streak across the
//! screen. The largest of the three wins, then the user speed multiplier
//! divides it.

use std::fmt::Write as _;

use crate::config::PlaybackConfig;
use crate::layout::Point;
use crate::pitch::NoteName;
use crate::schedule::ScheduleEntry;

/// One hop, drawn as a quadratic Bézier from `from` to `to` through `control`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
    pub control: Point,
    /// Offset from the start of the run (s).
    pub start: f64,
    pub duration: f64,
}

impl Segment {
    pub fn distance(&self) -> f64 {
        self.from.distance(self.to)
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Point on the curve at `t` in `[0, 1]`.
    pub fn point_at(&self, t: f64) -> Point {
        let t = t.clamp(0.0, 1.0);
        let u = 1.0 - t;
        Point::new(
            u * u * self.from.x + 2.0 * u * t * self.control.x + t * t * self.to.x,
            u * u * self.from.y + 2.0 * u * t * self.control.y + t * t * self.to.y,
        )
    }
}

/// Upward bulge of a hop: proportional to horizontal travel, clamped.
pub fn lift_for(from: Point, to: Point, cfg: &PlaybackConfig) -> f64 {
    ((to.x - from.x).abs() * cfg.lift_ratio).clamp(cfg.lift_min, cfg.lift_max)
}

pub fn control_point(from: Point, to: Point, cfg: &PlaybackConfig) -> Point {
    // screen y grows downward, so "up" subtracts
    Point::new(
        (from.x + to.x) / 2.0,
        (from.y + to.y) / 2.0 - lift_for(from, to, cfg),
    )
}

/// `t_i / total`, or an even `i / (n - 1)` spread when any fraction is not finite.
pub fn key_fractions(times: &[f64], total: f64) -> Vec<f64> {
    let fractions: Vec<f64> = times.iter().map(|t| t / total).collect();
    if fractions.iter().all(|f| f.is_finite()) {
        return fractions;
    }
    let n = times.len();
    if n <= 1 {
        return vec![0.0; n];
    }
    (0..n).map(|i| i as f64 / (n - 1) as f64).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackPlan {
    pub points: Vec<Point>,
    pub notes: Vec<Option<NoteName>>,
    /// When the marker reaches each point; `arrivals[0] == 0`.
    pub arrivals: Vec<f64>,
    pub segments: Vec<Segment>,
    /// Last smoothed time plus the tail pad.
    pub total_duration: f64,
    /// Last arrival plus the tail pad: when the run is over.
    pub run_length: f64,
}

impl PlaybackPlan {
    /// `None` for an empty schedule. `points` and `schedule` are index-aligned;
    /// any excess on either side is ignored.
    pub fn build(
        points: &[Point],
        schedule: &[ScheduleEntry],
        cfg: &PlaybackConfig,
    ) -> Option<Self> {
        let n = points.len().min(schedule.len());
        if n == 0 {
            return None;
        }
        let points = points[..n].to_vec();
        let times: Vec<f64> = schedule[..n].iter().map(|e| e.relative_time).collect();
        let notes: Vec<Option<NoteName>> = schedule[..n].iter().map(|e| e.note).collect();
        let speed = if cfg.speed.is_finite() && cfg.speed > 0.0 {
            cfg.speed
        } else {
            1.0
        };

        let total_duration = times[n - 1] + cfg.tail_pad;
        let fractions = key_fractions(&times, total_duration);

        let mut arrivals = Vec::with_capacity(n);
        let mut segments = Vec::with_capacity(n.saturating_sub(1));
        let mut clock = 0.0;
        arrivals.push(clock);
        for i in 0..n - 1 {
            let (from, to) = (points[i], points[i + 1]);
            let share = (fractions[i + 1] - fractions[i]) * total_duration;
            let share = if share.is_finite() { share } else { 0.0 };
            let travel = from.distance(to) / cfg.max_px_per_sec;
            let duration = share.max(cfg.min_segment).max(travel) / speed;
            segments.push(Segment {
                from,
                to,
                control: control_point(from, to, cfg),
                start: clock,
                duration,
            });
            clock += duration;
            arrivals.push(clock);
        }

        Some(Self {
            points,
            notes,
            arrivals,
            segments,
            total_duration,
            run_length: clock + cfg.tail_pad,
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Index of the segment in flight at `elapsed`, if any.
    pub fn active_segment(&self, elapsed: f64) -> Option<usize> {
        if elapsed < 0.0 {
            return None;
        }
        self.segments.iter().position(|s| elapsed < s.end())
    }

    /// Marker position at `elapsed` seconds into the run.
    pub fn position_at(&self, elapsed: f64) -> Point {
        if elapsed <= 0.0 || self.segments.is_empty() {
            return self.points[0];
        }
        match self.active_segment(elapsed) {
            Some(i) => {
                let seg = &self.segments[i];
                let t = if seg.duration > 0.0 {
                    (elapsed - seg.start) / seg.duration
                } else {
                    1.0
                };
                seg.point_at(t)
            }
            None => self.points[self.points.len() - 1],
        }
    }

    /// SVG path data tracing the whole run (`M x y Q cx cy x y ...`).
    pub fn svg_path(&self) -> String {
        let mut d = String::new();
        let first = self.points[0];
        let _ = write!(d, "M {:.2} {:.2}", first.x, first.y);
        for seg in &self.segments {
            let _ = write!(
                d,
                " Q {:.2} {:.2} {:.2} {:.2}",
                seg.control.x, seg.control.y, seg.to.x, seg.to.y
            );
        }
        d
    }
}
