//! Tunable constants, loadable from the JSON blob the host page passes to
//! `start_toy`. Every field has a default so a partial (or absent) config works.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ToyError};
use crate::layout::Align;
use crate::metrics::DEFAULT_FONT;
use crate::palette::DEFAULT_PALETTE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub font_size_px: f64,
    pub line_height_ratio: f64,
    /// Space advance as a fraction of `reference_glyph`'s width.
    pub space_ratio: f64,
    pub reference_glyph: char,
    /// Used until the host reports a measured container width.
    pub container_width_px: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            font_size_px: 48.0,
            line_height_ratio: 1.4,
            space_ratio: 0.6,
            reference_glyph: 'n',
            container_width_px: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Smallest allowed gap between consecutive scheduled notes (s).
    pub min_gap: f64,
    /// Largest allowed gap between consecutive scheduled notes (s).
    pub max_gap: f64,
    /// Quiet time after the last keystroke before playback starts on its own (s).
    pub inactivity_delay: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            min_gap: 0.08,
            max_gap: 2.0,
            inactivity_delay: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Added after the last note so it can ring out (s).
    pub tail_pad: f64,
    pub min_segment: f64,
    pub max_px_per_sec: f64,
    pub lift_ratio: f64,
    pub lift_min: f64,
    pub lift_max: f64,
    /// User speed multiplier; segment durations are divided by it.
    pub speed: f64,
    pub show_marker: bool,
    pub trail_fade: f64,
    pub trail_spacing_px: f64,
    pub trail_max_particles: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tail_pad: 0.6,
            min_segment: 0.12,
            max_px_per_sec: 1800.0,
            lift_ratio: 0.35,
            lift_min: 10.0,
            lift_max: 90.0,
            speed: 1.0,
            show_marker: false,
            trail_fade: 0.5,
            trail_spacing_px: 6.0,
            trail_max_particles: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub note_length: f64,
    pub velocity: f64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            note_length: 0.45,
            velocity: 0.8,
        }
    }
}

/// Falling-glyph placement. `enabled = false` snaps glyphs straight into place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropConfig {
    pub enabled: bool,
    pub drop_height_px: f64,
    pub gravity_px_s2: f64,
    pub restitution: f64,
    /// Bounces slower than this (px/s) settle onto the layout position.
    pub settle_speed: f64,
}

impl Default for DropConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            drop_height_px: 120.0,
            gravity_px_s2: 2400.0,
            restitution: 0.35,
            settle_speed: 60.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToyConfig {
    pub log_level: String,
    pub theme: String,
    pub palette: String,
    pub font: String,
    pub align: Align,
    /// Id of the element glyphs are rendered into; created when missing.
    pub container_id: String,
    pub storage_key: String,
    pub layout: LayoutConfig,
    pub timing: TimingConfig,
    pub playback: PlaybackConfig,
    pub export: ExportConfig,
    pub drop: DropConfig,
}

impl Default for ToyConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            theme: "dusk".to_string(),
            palette: DEFAULT_PALETTE.to_string(),
            font: DEFAULT_FONT.to_string(),
            align: Align::Left,
            container_id: "lf-stage".to_string(),
            storage_key: "letterfall.state".to_string(),
            layout: LayoutConfig::default(),
            timing: TimingConfig::default(),
            playback: PlaybackConfig::default(),
            export: ExportConfig::default(),
            drop: DropConfig::default(),
        }
    }
}

impl ToyConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ToyConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |value: f64, name: &str| -> Result<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ToyError::Config(format!("{name} must be positive, got {value}")))
            }
        };
        positive(self.layout.font_size_px, "layout.font_size_px")?;
        positive(self.layout.line_height_ratio, "layout.line_height_ratio")?;
        positive(self.timing.min_gap, "timing.min_gap")?;
        positive(self.timing.max_gap, "timing.max_gap")?;
        positive(self.timing.inactivity_delay, "timing.inactivity_delay")?;
        positive(self.playback.min_segment, "playback.min_segment")?;
        positive(self.playback.max_px_per_sec, "playback.max_px_per_sec")?;
        positive(self.playback.speed, "playback.speed")?;
        positive(self.playback.trail_fade, "playback.trail_fade")?;
        positive(self.export.note_length, "export.note_length")?;
        if self.timing.min_gap > self.timing.max_gap {
            return Err(ToyError::Config(format!(
                "timing.min_gap ({}) exceeds timing.max_gap ({})",
                self.timing.min_gap, self.timing.max_gap
            )));
        }
        if !(self.playback.lift_min <= self.playback.lift_max) {
            return Err(ToyError::Config(format!(
                "playback.lift_min ({}) exceeds playback.lift_max ({})",
                self.playback.lift_min, self.playback.lift_max
            )));
        }
        if self.playback.tail_pad < 0.0 || !self.playback.tail_pad.is_finite() {
            return Err(ToyError::Config("playback.tail_pad must be >= 0".to_string()));
        }
        Ok(())
    }
}
