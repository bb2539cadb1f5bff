//! Live note output through Web Audio.
//!
//! The context is created on the first keystroke (a user gesture) and polled
//! from the frame loop until it reports `running`. Until then notes wait in
//! the [`AudioGate`]; if the context cannot be created the toy stays silent.

use wasm_bindgen::prelude::*;
use web_sys::{AudioContext, AudioContextState, OscillatorType};

use crate::audio_gate::{AudioGate, AudioState, NoteIntent};
use crate::pitch::NoteName;

pub struct AudioOut {
    ctx: Option<AudioContext>,
    gate: AudioGate,
    note_length: f64,
}

impl AudioOut {
    pub fn new(note_length: f64) -> Self {
        Self {
            ctx: None,
            gate: AudioGate::new(),
            note_length,
        }
    }

    /// Creates the context on first use and nudges a suspended one to resume.
    /// Must run inside a user gesture handler.
    pub fn ensure_started(&mut self) {
        if self.gate.begin_init() {
            match AudioContext::new() {
                Ok(ctx) => self.ctx = Some(ctx),
                Err(err) => {
                    self.gate
                        .mark_failed(&err.as_string().unwrap_or_else(|| "AudioContext".into()));
                    return;
                }
            }
        }
        if let Some(ctx) = &self.ctx {
            if ctx.state() == AudioContextState::Suspended {
                let _ = ctx.resume();
            }
        }
    }

    /// Opens the gate once the context runs and plays whatever was waiting.
    pub fn poll(&mut self) {
        if self.gate.state() != AudioState::Pending {
            return;
        }
        let Some(ctx) = &self.ctx else {
            return;
        };
        match ctx.state() {
            AudioContextState::Running => {
                for intent in self.gate.mark_ready() {
                    self.sound(&intent);
                }
            }
            AudioContextState::Closed => self.gate.mark_failed("audio context closed"),
            _ => {}
        }
    }

    pub fn submit(&mut self, intent: NoteIntent) {
        if let Some(intent) = self.gate.submit(intent) {
            self.sound(&intent);
        }
    }

    pub fn drop_stale(&mut self, run: u64) {
        self.gate.drop_stale(run);
    }

    fn sound(&self, intent: &NoteIntent) {
        if let Some(ctx) = &self.ctx {
            if let Err(err) = voice(ctx, intent.note, intent.velocity, self.note_length) {
                tracing::warn!(note = %intent.note, ?err, "note dropped");
            }
        }
    }
}

/// One short triangle-wave note with a quick attack and exponential release.
fn voice(ctx: &AudioContext, note: NoteName, velocity: f64, length: f64) -> Result<(), JsValue> {
    let osc = ctx.create_oscillator()?;
    osc.set_type(OscillatorType::Triangle);
    osc.frequency().set_value(note.frequency() as f32);

    let gain = ctx.create_gain()?;
    let t = ctx.current_time();
    let peak = (velocity.clamp(0.0, 1.0) * 0.3) as f32;
    gain.gain().set_value_at_time(0.0, t)?;
    gain.gain().linear_ramp_to_value_at_time(peak, t + 0.01)?;
    gain.gain()
        .exponential_ramp_to_value_at_time(0.001, t + length)?;

    osc.connect_with_audio_node(&gain)?;
    gain.connect_with_audio_node(&ctx.destination())?;
    osc.start()?;
    osc.stop_with_when(t + length + 0.05)?;
    Ok(())
}
