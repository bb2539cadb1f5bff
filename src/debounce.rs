//! Inactivity timer that triggers automatic playback.
//!
//! Debounce, not throttle: every keystroke pushes the deadline out again, and
//! the timer fires once after the typist has been quiet for `delay` seconds.

#[derive(Debug, Clone, PartialEq)]
pub struct InactivityTimer {
    delay: f64,
    deadline: Option<f64>,
}

impl InactivityTimer {
    pub fn new(delay: f64) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn restart(&mut self, now: f64) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// True exactly once, on the first poll at or after the deadline.
    pub fn poll(&mut self, now: f64) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
