//! Note scheduler: turns recorded keystroke times into an evenly paced schedule.
//!
//! Only note-bearing events are scheduled. Times are made relative to the
//! first one and then walked in order: a time closer than `min_gap` or further
//! than `max_gap` from the previous smoothed time is pulled to that bound, any
//! other time is kept as typed. A burst of fast typing still sounds as distinct
//! notes and a long pause does not stall playback. The smoothed times drive
//! both the audible notes and the playhead path.

use crate::config::TimingConfig;
use crate::events::EventLog;
use crate::pitch::NoteName;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleEntry {
    pub relative_time: f64,
    pub note: Option<NoteName>,
}

/// `t_i = max(0, raw_i - raw_0)`, then one ordered walk measures each time
/// against the previous *smoothed* time: too close moves it to `prev + min_gap`,
/// too far moves it to `prev + max_gap`, otherwise `t_i` stays as it is.
pub fn smooth_times(raw: &[f64], min_gap: f64, max_gap: f64) -> Vec<f64> {
    let Some(&first) = raw.first() else {
        return Vec::new();
    };
    // NaN fails the comparison and becomes 0
    let rel: Vec<f64> = raw
        .iter()
        .map(|&t| if t - first > 0.0 { t - first } else { 0.0 })
        .collect();
    let mut out = Vec::with_capacity(rel.len());
    out.push(0.0);
    for &t in &rel[1..] {
        let prev = *out.last().unwrap_or(&0.0);
        let gap = t - prev;
        let next = if !gap.is_finite() || gap < min_gap {
            prev + min_gap
        } else if gap > max_gap {
            prev + max_gap
        } else {
            t
        };
        out.push(next);
    }
    out
}

/// Smoothed schedule for every note-bearing event in the log, in log order.
pub fn build_schedule(log: &EventLog, timing: &TimingConfig) -> Vec<ScheduleEntry> {
    let notes: Vec<_> = log.note_bearing().collect();
    let raw: Vec<f64> = notes.iter().map(|e| e.timestamp).collect();
    smooth_times(&raw, timing.min_gap, timing.max_gap)
        .into_iter()
        .zip(notes)
        .map(|(relative_time, e)| ScheduleEntry {
            relative_time,
            note: e.note,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;

    const MIN: f64 = 0.08;
    const MAX: f64 = 2.0;

    #[test]
    fn empty_and_single_inputs_need_no_smoothing() {
        assert!(smooth_times(&[], MIN, MAX).is_empty());
        assert_eq!(smooth_times(&[42.0], MIN, MAX), vec![0.0]);
    }

    #[test]
    fn fast_bursts_are_spread_to_the_minimum() {
        let out = smooth_times(&[1.0, 1.01, 1.02], MIN, MAX);
        assert_eq!(out[0], 0.0);
        assert!((out[1] - 0.08).abs() < 1e-12);
        assert!((out[2] - 0.16).abs() < 1e-12);
    }

    #[test]
    fn long_pauses_are_capped_at_the_maximum() {
        // 10.5 is still 8.5 s past the capped 2.0, so it is capped again
        let out = smooth_times(&[0.0, 10.0, 10.5], MIN, MAX);
        assert_eq!(out, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn unclamped_times_keep_their_value_after_a_clamp() {
        let out = smooth_times(&[0.0, 0.01, 0.5], MIN, MAX);
        assert_eq!(out[1], 0.08);
        assert_eq!(out[2], 0.5);
    }

    #[test]
    fn comfortable_gaps_pass_through() {
        let out = smooth_times(&[5.0, 5.3, 5.9], MIN, MAX);
        assert!((out[1] - 0.3).abs() < 1e-12);
        assert!((out[2] - 0.9).abs() < 1e-12);
    }

    #[test]
    fn gaps_always_within_bounds() {
        // includes duplicates, reversals and a NaN glitch
        let raw = [3.0, 3.0, 2.0, 9.0, f64::NAN, 9.5, 40.0, 40.01];
        let out = smooth_times(&raw, MIN, MAX);
        for pair in out.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= MIN - 1e-12 && gap <= MAX + 1e-12, "gap {gap}");
        }
    }

    #[test]
    fn schedule_skips_silent_events() {
        let mut log = EventLog::new();
        log.push(Event::new('a', Some("C4".parse().unwrap()), 10.0));
        log.push(Event::new(' ', None, 10.2));
        log.push(Event::new('\n', None, 10.3));
        log.push(Event::new('b', Some("D4".parse().unwrap()), 10.5));
        let sched = build_schedule(&log, &TimingConfig::default());
        assert_eq!(sched.len(), 2);
        assert_eq!(sched[0].relative_time, 0.0);
        assert!((sched[1].relative_time - 0.5).abs() < 1e-12);
        assert_eq!(sched[1].note.unwrap().to_string(), "D4");
    }
}
