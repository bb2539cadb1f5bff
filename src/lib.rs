//! Letterfall core crate.
//!
//! A typing toy: every keystroke drops a letter onto the page and sounds a
//! note from the active palette. After a pause (or on request) the typed text
//! plays back as a marker arcing from letter to letter while the notes sound
//! again, evenly paced. The text can be saved, shared as JSON and rendered to
//! a WAV file.
//!
//! Everything except the `toy` module is plain Rust with no browser
//! dependency, so layout, scheduling and playback run in native tests.
//! `toy` owns the page: DOM stage, Web Audio output and local storage.

use wasm_bindgen::prelude::*;

pub mod animator;
pub mod audio_gate;
pub mod config;
pub mod debounce;
pub mod document;
pub mod error;
pub mod events;
pub mod layout;
pub mod logging;
pub mod metrics;
pub mod palette;
pub mod path;
pub mod pitch;
pub mod playback;
pub mod schedule;
pub mod state;
pub mod trail;
pub mod wav;

mod toy; // browser glue, exported through wasm-bindgen

pub use config::ToyConfig;
pub use document::ToyDocument;
pub use error::{Result, ToyError};
pub use events::{Event, EventLog};
pub use layout::{Align, LayoutEngine, Point};
pub use metrics::{FixedMeasure, FontSpec, GlyphMeasure, Metrics};
pub use palette::Palette;
pub use pitch::NoteName;
pub use state::{AppState, KeyOutcome};
pub use toy::{
    clear_toy, export_document, export_wav, import_document, play_now, set_alignment, set_font,
    set_palette, set_pattern, set_show_marker, set_speed, set_theme, start_toy,
};

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Names of the built-in palettes, in menu order.
#[wasm_bindgen]
pub fn palette_names() -> Vec<String> {
    Palette::names().map(str::to_string).collect()
}
