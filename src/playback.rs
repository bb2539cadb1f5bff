//! Playback session: the playhead state machine.
//!
//! `Idle → Scheduling → Running → Idle`. A single `tick(now)` per animation
//! frame advances the marker along the plan and reports every note whose
//! arrival time has passed, each exactly once. Cancelling a run (directly or by
//! starting a new one) discards its remaining notes, clears the trail and
//! moves the run id on, so anything still holding an old trigger can tell.

use tracing::{debug, info};

use crate::config::PlaybackConfig;
use crate::layout::Point;
use crate::path::PlaybackPlan;
use crate::pitch::NoteName;
use crate::schedule::ScheduleEntry;
use crate::trail::Trail;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Idle,
    Scheduling,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteTrigger {
    pub run: u64,
    /// Position in the note-bearing sequence.
    pub index: usize,
    pub note: NoteName,
    /// Planned offset from the start of the run (s).
    pub at: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackFrame {
    pub marker: Option<Point>,
    pub notes: Vec<NoteTrigger>,
    pub finished: bool,
}

#[derive(Debug)]
pub struct PlaybackSession {
    phase: PlaybackPhase,
    run: u64,
    plan: Option<PlaybackPlan>,
    started_at: f64,
    next_note: usize,
    trail: Trail,
    show_marker: bool,
}

impl PlaybackSession {
    pub fn new(cfg: &PlaybackConfig) -> Self {
        Self {
            phase: PlaybackPhase::Idle,
            run: 0,
            plan: None,
            started_at: 0.0,
            next_note: 0,
            trail: Trail::new(cfg),
            show_marker: cfg.show_marker,
        }
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == PlaybackPhase::Running
    }

    /// Current run id (0 before the first run). Triggers carrying any other id
    /// belong to a cancelled or replaced run.
    pub fn run_id(&self) -> u64 {
        self.run
    }

    pub fn plan(&self) -> Option<&PlaybackPlan> {
        self.plan.as_ref()
    }

    pub fn trail(&self) -> &Trail {
        &self.trail
    }

    pub fn show_marker(&self) -> bool {
        self.show_marker
    }

    pub fn set_show_marker(&mut self, show: bool) {
        self.show_marker = show;
    }

    /// Cancels any run in flight and starts a new one. Returns the new run id,
    /// or `None` when there is nothing to play (the session stays idle).
    pub fn start(
        &mut self,
        points: &[Point],
        schedule: &[ScheduleEntry],
        cfg: &PlaybackConfig,
        now: f64,
    ) -> Option<u64> {
        self.cancel();
        self.phase = PlaybackPhase::Scheduling;
        let Some(plan) = PlaybackPlan::build(points, schedule, cfg) else {
            self.phase = PlaybackPhase::Idle;
            debug!("playback requested with no note-bearing events");
            return None;
        };
        self.run += 1;
        info!(
            run = self.run,
            notes = plan.len(),
            seconds = plan.run_length,
            "playback started"
        );
        self.plan = Some(plan);
        self.started_at = now;
        self.next_note = 0;
        self.phase = PlaybackPhase::Running;
        Some(self.run)
    }

    /// Stops the current run, discarding unfired notes. Returns whether one was running.
    pub fn cancel(&mut self) -> bool {
        let was_running = self.phase == PlaybackPhase::Running;
        if was_running {
            debug!(run = self.run, fired = self.next_note, "playback cancelled");
            self.run += 1;
        }
        self.phase = PlaybackPhase::Idle;
        self.plan = None;
        self.next_note = 0;
        self.trail.clear();
        was_running
    }

    pub fn tick(&mut self, now: f64, particle_scale: f64) -> PlaybackFrame {
        let mut frame = PlaybackFrame::default();
        if self.phase != PlaybackPhase::Running {
            self.trail.expire(now);
            return frame;
        }
        let Some(plan) = self.plan.as_ref() else {
            self.phase = PlaybackPhase::Idle;
            return frame;
        };
        let elapsed = now - self.started_at;

        while self.next_note < plan.len() && plan.arrivals[self.next_note] <= elapsed {
            if let Some(note) = plan.notes[self.next_note] {
                frame.notes.push(NoteTrigger {
                    run: self.run,
                    index: self.next_note,
                    note,
                    at: plan.arrivals[self.next_note],
                });
            }
            self.next_note += 1;
        }

        let marker = plan.position_at(elapsed);
        let done = elapsed >= plan.run_length;
        frame.marker = Some(marker);
        self.trail.record(marker, now, particle_scale);
        self.trail.expire(now);

        if done {
            info!(run = self.run, "playback finished");
            self.phase = PlaybackPhase::Idle;
            self.plan = None;
            frame.finished = true;
        }
        frame
    }
}
