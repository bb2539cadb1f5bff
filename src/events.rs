//! Append-only log of typed characters.

use serde::{Deserialize, Serialize};

use crate::pitch::NoteName;

/// One recorded keystroke. `x`/`y` are the layout position from the most
/// recent reflow and go stale until the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "char")]
    pub character: char,
    pub note: Option<NoteName>,
    #[serde(rename = "time")]
    pub timestamp: f64,
    pub x: f64,
    pub y: f64,
}

impl Event {
    pub fn new(character: char, note: Option<NoteName>, timestamp: f64) -> Self {
        Self {
            character,
            note,
            timestamp,
            x: 0.0,
            y: 0.0,
        }
    }

    pub fn is_newline(&self) -> bool {
        self.character == '\n'
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends and returns the new index. A timestamp older than the previous
    /// event is raised to it so the log stays non-decreasing.
    pub fn push(&mut self, mut event: Event) -> usize {
        if let Some(last) = self.events.last() {
            if event.timestamp.is_nan() || event.timestamp < last.timestamp {
                event.timestamp = last.timestamp;
            }
        }
        self.events.push(event);
        self.events.len() - 1
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop()
    }

    pub fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Event> {
        self.events.get(idx)
    }

    pub fn last(&self) -> Option<&Event> {
        self.events.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    pub fn as_slice(&self) -> &[Event] {
        &self.events
    }

    pub fn characters(&self) -> impl Iterator<Item = char> + '_ {
        self.events.iter().map(|e| e.character)
    }

    /// Events that sound a note, in log order. Newlines never carry one.
    pub fn note_bearing(&self) -> impl Iterator<Item = &Event> + '_ {
        self.events
            .iter()
            .filter(|e| !e.is_newline() && e.note.is_some())
    }

    /// Records the layout position of a single event. False when `idx` is out of range.
    pub fn set_position(&mut self, idx: usize, x: f64, y: f64) -> bool {
        match self.events.get_mut(idx) {
            Some(event) => {
                event.x = x;
                event.y = y;
                true
            }
            None => false,
        }
    }

    /// Writes reflowed positions back; `positions` must be index-aligned with the log.
    pub fn apply_positions(&mut self, positions: &[(f64, f64)]) {
        for (event, &(x, y)) in self.events.iter_mut().zip(positions) {
            event.x = x;
            event.y = y;
        }
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(s: &str) -> Option<NoteName> {
        Some(s.parse().unwrap())
    }

    #[test]
    fn push_keeps_timestamps_non_decreasing() {
        let mut log = EventLog::new();
        log.push(Event::new('a', note("C4"), 2.0));
        log.push(Event::new('b', note("D4"), 1.5));
        log.push(Event::new('c', note("E4"), f64::NAN));
        let times: Vec<f64> = log.iter().map(|e| e.timestamp).collect();
        assert_eq!(times, vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn note_bearing_skips_silent_and_newlines() {
        let mut log = EventLog::new();
        log.push(Event::new('a', note("C4"), 0.0));
        log.push(Event::new(' ', None, 0.1));
        log.push(Event::new('\n', None, 0.2));
        log.push(Event::new('b', note("D4"), 0.3));
        let chars: String = log.note_bearing().map(|e| e.character).collect();
        assert_eq!(chars, "ab");
    }

    #[test]
    fn pop_removes_from_the_tail() {
        let mut log = EventLog::new();
        for (i, c) in "abc".chars().enumerate() {
            log.push(Event::new(c, None, i as f64));
        }
        assert_eq!(log.pop().map(|e| e.character), Some('c'));
        assert_eq!(log.len(), 2);
        assert_eq!(log.last().map(|e| e.character), Some('b'));
    }

    #[test]
    fn serializes_with_short_field_names() {
        let mut e = Event::new('a', note("C4"), 0.5);
        e.x = 12.0;
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["char"], "a");
        assert_eq!(v["note"], "C4");
        assert_eq!(v["time"], 0.5);
        assert_eq!(v["x"], 12.0);
    }
}
