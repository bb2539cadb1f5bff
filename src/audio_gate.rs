//! Holds note intents until the host audio subsystem is ready.
//!
//! Browsers only start audio after a user gesture, and starting is
//! asynchronous. The gate queues whatever should sound in the meantime (the
//! keystroke that triggered initialization included) and releases it in
//! order once the host reports the context running. If initialization fails
//! the queue is dropped and the toy keeps going without sound.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::pitch::NoteName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioState {
    Uninitialized,
    Pending,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteIntent {
    pub note: NoteName,
    pub velocity: f64,
    /// Playback run that produced the note; `None` for a keystroke.
    pub run: Option<u64>,
}

#[derive(Debug)]
pub struct AudioGate {
    state: AudioState,
    queue: VecDeque<NoteIntent>,
}

impl Default for AudioGate {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioGate {
    pub fn new() -> Self {
        Self {
            state: AudioState::Uninitialized,
            queue: VecDeque::new(),
        }
    }

    pub fn state(&self) -> AudioState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == AudioState::Ready
    }

    /// True the first time it is called: the caller should start initializing.
    pub fn begin_init(&mut self) -> bool {
        if self.state == AudioState::Uninitialized {
            self.state = AudioState::Pending;
            true
        } else {
            false
        }
    }

    /// Returns the intent when it can play right now. Before the gate opens it
    /// is queued instead; after a failure it is dropped.
    pub fn submit(&mut self, intent: NoteIntent) -> Option<NoteIntent> {
        match self.state {
            AudioState::Ready => Some(intent),
            AudioState::Failed => None,
            AudioState::Uninitialized | AudioState::Pending => {
                self.queue.push_back(intent);
                None
            }
        }
    }

    /// Opens the gate and hands back everything queued, oldest first.
    pub fn mark_ready(&mut self) -> Vec<NoteIntent> {
        if self.state != AudioState::Ready {
            debug!(queued = self.queue.len(), "audio ready");
        }
        self.state = AudioState::Ready;
        self.queue.drain(..).collect()
    }

    pub fn mark_failed(&mut self, reason: &str) {
        warn!(reason, dropped = self.queue.len(), "audio unavailable, continuing silently");
        self.state = AudioState::Failed;
        self.queue.clear();
    }

    /// Forgets queued notes from any playback run other than `current_run`.
    /// Keystroke notes stay.
    pub fn drop_stale(&mut self, current_run: u64) {
        self.queue
            .retain(|intent| intent.run.is_none_or(|run| run == current_run));
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}
