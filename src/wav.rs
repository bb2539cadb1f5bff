//! Offline render of a note schedule into a WAV file.
//!
//! Each note is a sine with one soft overtone under a short attack and an
//! exponential decay, mixed at its smoothed schedule time. The mix is peak
//! normalized and written as 16-bit mono PCM through `hound`.

use std::f64::consts::TAU;
use std::io::Cursor;

use tracing::info;

use crate::config::ExportConfig;
use crate::error::{Result, ToyError};
use crate::schedule::ScheduleEntry;

/// Export rate (Hz); fixed, not configurable.
pub const SAMPLE_RATE: u32 = 44_100;
const ATTACK_SECS: f64 = 0.005;
const TAIL_SECS: f64 = 0.25;
const OVERTONE_GAIN: f64 = 0.3;
const PEAK: f64 = 0.9;

/// Mono samples in `[-1, 1]` for `schedule` at [`SAMPLE_RATE`].
pub fn render_samples(schedule: &[ScheduleEntry], cfg: &ExportConfig) -> Vec<f32> {
    let sr = SAMPLE_RATE as f64;
    let last = schedule
        .iter()
        .map(|e| e.relative_time)
        .fold(0.0_f64, f64::max);
    let total = ((last + cfg.note_length + TAIL_SECS) * sr).ceil() as usize;
    let mut mix = vec![0.0_f64; total];
    let note_samples = (cfg.note_length * sr).round() as usize;
    let decay = 6.0 / cfg.note_length;

    for entry in schedule {
        let Some(note) = entry.note else { continue };
        let freq = note.frequency();
        let start = (entry.relative_time.max(0.0) * sr).round() as usize;
        for k in 0..note_samples {
            let Some(slot) = mix.get_mut(start + k) else {
                break;
            };
            let t = k as f64 / sr;
            let attack = (t / ATTACK_SECS).min(1.0);
            let env = attack * (-decay * t).exp();
            let wave = (TAU * freq * t).sin() + OVERTONE_GAIN * (2.0 * TAU * freq * t).sin();
            *slot += cfg.velocity * env * wave;
        }
    }

    let peak = mix.iter().fold(0.0_f64, |m, s| m.max(s.abs()));
    let gain = if peak > PEAK { PEAK / peak } else { 1.0 };
    mix.into_iter().map(|s| (s * gain) as f32).collect()
}

/// Complete RIFF/WAVE file (16-bit PCM, mono) for `schedule`.
pub fn encode_wav(schedule: &[ScheduleEntry], cfg: &ExportConfig) -> Result<Vec<u8>> {
    if !schedule.iter().any(|e| e.note.is_some()) {
        return Err(ToyError::EmptySchedule);
    }
    let samples = render_samples(schedule, cfg);
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for s in &samples {
            writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
        }
        writer.finalize()?;
    }
    let bytes = cursor.into_inner();
    info!(
        notes = schedule.len(),
        samples = samples.len(),
        bytes = bytes.len(),
        "rendered wav"
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(t: f64, note: &str) -> ScheduleEntry {
        ScheduleEntry {
            relative_time: t,
            note: Some(note.parse().unwrap()),
        }
    }

    #[test]
    fn length_covers_last_note_and_tail() {
        let cfg = ExportConfig::default();
        let samples = render_samples(&[entry(0.0, "C4"), entry(1.0, "E4")], &cfg);
        let expected = ((1.0 + cfg.note_length + TAIL_SECS) * SAMPLE_RATE as f64).ceil() as usize;
        assert_eq!(samples.len(), expected);
    }

    #[test]
    fn output_never_clips() {
        let cfg = ExportConfig {
            velocity: 1.0,
            ..ExportConfig::default()
        };
        // a dense cluster sums far above 1.0 before normalization
        let sched: Vec<_> = (0..8).map(|i| entry(i as f64 * 0.001, "A4")).collect();
        let samples = render_samples(&sched, &cfg);
        assert!(samples.iter().all(|s| s.abs() <= PEAK as f32 + 1e-6));
        assert!(samples.iter().any(|s| s.abs() > 0.5));
    }

    #[test]
    fn silence_before_the_first_note_time() {
        let cfg = ExportConfig::default();
        let samples = render_samples(&[entry(0.5, "C4")], &cfg);
        assert!(samples[..22_000].iter().all(|s| *s == 0.0));
        assert!(samples[22_100..23_000].iter().any(|s| *s != 0.0));
    }

    #[test]
    fn header_uses_the_fixed_rate() {
        let json = r#"{"export":{"sample_rate":8000}}"#;
        let cfg = crate::config::ToyConfig::from_json(json).unwrap();
        let bytes = encode_wav(&[entry(0.0, "C4")], &cfg.export).unwrap();
        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().sample_rate, SAMPLE_RATE);
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().bits_per_sample, 16);
    }

    #[test]
    fn empty_schedule_is_refused() {
        let silent = [ScheduleEntry {
            relative_time: 0.0,
            note: None,
        }];
        assert!(matches!(
            encode_wav(&silent, &ExportConfig::default()),
            Err(ToyError::EmptySchedule)
        ));
        assert!(encode_wav(&[], &ExportConfig::default()).is_err());
    }
}
