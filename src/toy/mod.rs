//! Browser runtime.
//!
//! `start_toy()` builds one [`ToyRuntime`] and keeps it in a thread-local
//! cell. A keydown listener feeds keystrokes into the [`AppState`] and one
//! `requestAnimationFrame` loop advances audio, playback and the glyph
//! animator. The exported functions below are the page's control surface.
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, window};

use crate::animator::{DropAnimator, GlyphAnimator, SnapAnimator};
use crate::audio_gate::NoteIntent;
use crate::config::ToyConfig;
use crate::document::ToyDocument;
use crate::layout::Align;
use crate::logging;
use crate::state::AppState;

mod audio;
mod dom;
mod storage;

use audio::AudioOut;
use dom::{CanvasMeasure, Stage};

struct ToyRuntime {
    state: AppState,
    stage: Stage,
    audio: AudioOut,
    animator: Box<dyn GlyphAnimator>,
    storage_key: String,
    velocity: f64,
}

impl ToyRuntime {
    fn persist(&self) {
        match self.state.document().to_json() {
            Ok(json) => storage::save(&self.storage_key, &json),
            Err(err) => tracing::warn!(%err, "could not serialize state"),
        }
    }

    /// Mirrors the log onto the stage after anything moved glyphs.
    fn resync(&mut self) {
        if let Err(err) = self.stage.sync(self.state.log()) {
            tracing::warn!(?err, "stage out of sync");
        }
    }

    fn on_key(&mut self, key: &str, now: f64) -> bool {
        let c = match key {
            "Backspace" => {
                if self.state.delete_last(now).is_some() {
                    self.resync();
                    self.persist();
                }
                return true;
            }
            "Enter" => '\n',
            _ => {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => c,
                    _ => return false,
                }
            }
        };
        self.audio.ensure_started();
        let outcome = self.state.type_char(c, now);
        if let Err(err) = self.stage.push_glyph(c, now) {
            tracing::warn!(?err, "could not add glyph");
        }
        self.resync();
        if let Some(note) = outcome.note {
            self.audio.submit(NoteIntent {
                note,
                velocity: self.velocity,
                run: None,
            });
        }
        self.persist();
        true
    }

    fn tick(&mut self, now: f64) {
        let width = self.stage.width();
        if width > 0.0 {
            self.state.set_container_width(width);
        }
        // a delete, reflow or clear since the last frame may have retired the run
        self.audio.drop_stale(self.state.session().run_id());
        self.audio.poll();
        let frame = self.state.tick(now, 0.5 + unit_random());
        for trigger in frame.notes {
            self.audio.submit(NoteIntent {
                note: trigger.note,
                velocity: self.velocity,
                run: Some(trigger.run),
            });
        }
        self.resync();
        self.stage.animate(self.animator.as_ref(), now);
        self.stage
            .render_marker(frame.marker, self.state.session().show_marker());
        if let Err(err) = self.stage.render_trail(self.state.session().trail(), now) {
            tracing::warn!(?err, "trail not drawn");
        }
    }
}

thread_local! {
    static TOY: std::cell::RefCell<Option<ToyRuntime>> = const { std::cell::RefCell::new(None) };
    static LISTENING: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

type FrameCallback = std::rc::Rc<std::cell::RefCell<Option<Closure<dyn FnMut(f64)>>>>;

fn now_secs() -> f64 {
    window()
        .and_then(|w| w.performance())
        .map(|p| p.now() / 1000.0)
        .unwrap_or(0.0)
}

/// Uniform in `[0, 1)` for trail jitter.
#[cfg(feature = "rng")]
fn unit_random() -> f64 {
    let mut bytes = [0u8; 4];
    match getrandom::getrandom(&mut bytes) {
        Ok(()) => u32::from_le_bytes(bytes) as f64 / (u32::MAX as f64 + 1.0),
        Err(_) => lcg_random(),
    }
}

#[cfg(not(feature = "rng"))]
fn unit_random() -> f64 {
    lcg_random()
}

// Not crypto quality; only used for visual jitter.
fn lcg_random() -> f64 {
    let seed = (now_secs() * 1_000_000.0) as u64;
    let x = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (x >> 11) as f64 / (1u64 << 53) as f64
}

fn with_runtime<T>(f: impl FnOnce(&mut ToyRuntime) -> Result<T, JsValue>) -> Result<T, JsValue> {
    TOY.with(|cell| match cell.borrow_mut().as_mut() {
        Some(rt) => f(rt),
        None => Err(JsValue::from_str("toy not started; call start_toy() first")),
    })
}

fn js_err(err: crate::error::ToyError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Starts (or restarts) the toy. `config_json` may be a partial `ToyConfig`.
#[wasm_bindgen]
pub fn start_toy(config_json: Option<String>) -> Result<(), JsValue> {
    let config = match config_json.as_deref() {
        Some(json) if !json.trim().is_empty() => ToyConfig::from_json(json).map_err(js_err)?,
        _ => ToyConfig::default(),
    };
    logging::init(&config.log_level);

    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let doc = win
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let measure = CanvasMeasure::new(&doc)?;
    let storage_key = config.storage_key.clone();
    let animator: Box<dyn GlyphAnimator> = if config.drop.enabled {
        Box::new(DropAnimator::new(&config.drop))
    } else {
        Box::new(SnapAnimator)
    };
    let velocity = config.export.velocity;
    let audio = AudioOut::new(config.export.note_length);
    let container_id = config.container_id.clone();
    let mut state = AppState::new(config, Box::new(measure)).map_err(js_err)?;
    let mut stage = Stage::mount(&doc, &container_id, state.font())?;
    state.set_container_width(stage.width());

    if let Some(json) = storage::load(&storage_key) {
        match ToyDocument::parse_lenient(&json, state.config()) {
            Ok(loaded) => {
                state.load(loaded);
                stage.set_font(state.font())?;
            }
            Err(err) => tracing::warn!(%err, "ignoring unreadable saved state"),
        }
    }
    stage.sync(state.log())?;
    tracing::info!(events = state.log().len(), "toy started");

    TOY.with(|cell| {
        cell.replace(Some(ToyRuntime {
            state,
            stage,
            audio,
            animator,
            storage_key,
            velocity,
        }))
    });

    if !LISTENING.with(|l| l.replace(true)) {
        install_key_listener(&doc)?;
        start_frame_loop();
    }
    Ok(())
}

fn install_key_listener(doc: &Document) -> Result<(), JsValue> {
    let closure = Closure::wrap(Box::new(move |evt: web_sys::KeyboardEvent| {
        if evt.ctrl_key() || evt.meta_key() || evt.alt_key() {
            return;
        }
        let key = evt.key();
        let now = now_secs();
        let handled = TOY.with(|cell| {
            cell.borrow_mut()
                .as_mut()
                .is_some_and(|rt| rt.on_key(&key, now))
        });
        if handled {
            // keeps space from scrolling and Backspace from navigating
            evt.prevent_default();
        }
    }) as Box<dyn FnMut(_)>);
    doc.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

fn start_frame_loop() {
    let f: FrameCallback = std::rc::Rc::new(std::cell::RefCell::new(None));
    let g = f.clone();
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
        TOY.with(|cell| {
            if let Some(rt) = cell.borrow_mut().as_mut() {
                rt.tick(ts / 1000.0);
            }
        });
        if let (Some(w), Some(cb)) = (window(), f.borrow().as_ref()) {
            let _ = w.request_animation_frame(cb.as_ref().unchecked_ref());
        }
    }) as Box<dyn FnMut(f64)>));
    if let (Some(w), Some(cb)) = (window(), g.borrow().as_ref()) {
        let _ = w.request_animation_frame(cb.as_ref().unchecked_ref());
    }
}

/// Plays the typed text right away. Returns false when nothing can sound.
#[wasm_bindgen]
pub fn play_now() -> Result<bool, JsValue> {
    with_runtime(|rt| {
        rt.audio.ensure_started();
        Ok(rt.state.play(now_secs()).is_some())
    })
}

#[wasm_bindgen]
pub fn set_alignment(name: &str) -> Result<(), JsValue> {
    let align: Align = name.parse().map_err(js_err)?;
    with_runtime(|rt| {
        rt.state.set_align(align);
        rt.resync();
        rt.persist();
        Ok(())
    })
}

#[wasm_bindgen]
pub fn set_font(family: &str) -> Result<(), JsValue> {
    with_runtime(|rt| {
        rt.state.set_font(family);
        rt.stage.set_font(rt.state.font())?;
        rt.resync();
        rt.persist();
        Ok(())
    })
}

#[wasm_bindgen]
pub fn set_palette(name: &str) -> Result<(), JsValue> {
    with_runtime(|rt| {
        rt.state.set_palette(name).map_err(js_err)?;
        rt.persist();
        Ok(())
    })
}

#[wasm_bindgen]
pub fn set_theme(name: &str) -> Result<(), JsValue> {
    with_runtime(|rt| {
        rt.state.set_theme(name).map_err(js_err)?;
        rt.persist();
        Ok(())
    })
}

/// Background pattern chosen by the page; persisted with the document.
#[wasm_bindgen]
pub fn set_pattern(name: Option<String>) -> Result<(), JsValue> {
    with_runtime(|rt| {
        rt.state.set_pattern(name);
        rt.persist();
        Ok(())
    })
}

#[wasm_bindgen]
pub fn set_speed(multiplier: f64) -> Result<(), JsValue> {
    with_runtime(|rt| rt.state.set_speed(multiplier).map_err(js_err))
}

#[wasm_bindgen]
pub fn set_show_marker(show: bool) -> Result<(), JsValue> {
    with_runtime(|rt| {
        rt.state.set_show_marker(show);
        Ok(())
    })
}

#[wasm_bindgen]
pub fn clear_toy() -> Result<(), JsValue> {
    with_runtime(|rt| {
        rt.state.clear();
        rt.stage.clear();
        rt.persist();
        Ok(())
    })
}

#[wasm_bindgen]
pub fn export_document() -> Result<String, JsValue> {
    with_runtime(|rt| rt.state.export_document().map_err(js_err))
}

/// Replaces the current text with `json`. Returns how many events were skipped.
#[wasm_bindgen]
pub fn import_document(json: &str) -> Result<u32, JsValue> {
    with_runtime(|rt| {
        let skipped = rt.state.import_document(json).map_err(js_err)?;
        rt.stage.clear();
        rt.stage.set_font(rt.state.font())?;
        rt.resync();
        rt.persist();
        Ok(skipped as u32)
    })
}

/// WAV bytes (16-bit mono PCM) of the current text.
#[wasm_bindgen]
pub fn export_wav() -> Result<Vec<u8>, JsValue> {
    with_runtime(|rt| rt.state.export_wav().map_err(js_err))
}
