//! Glyph measurement service.
//!
//! The layout engine never measures text itself. It asks an owned [`Metrics`]
//! object, which wraps a [`GlyphMeasure`] backend (a canvas in the browser, a
//! fixed table in tests) and caches widths for the active font. `init` primes
//! the cache for a font and `dispose` releases it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Fonts the toy ships with and their letter-spacing constants (px).
pub const KNOWN_FONTS: &[(&str, f64)] = &[
    ("Fredoka", 1.0),
    ("Baloo 2", 0.8),
    ("Space Mono", 0.0),
    ("Playfair Display", 0.5),
    ("Caveat", 0.4),
    ("Press Start 2P", 2.0),
];

pub const DEFAULT_FONT: &str = "Fredoka";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    pub family: String,
    pub size_px: f64,
    pub letter_spacing_px: f64,
}

impl FontSpec {
    /// Looks the family up in [`KNOWN_FONTS`]; unknown families get no extra spacing.
    pub fn named(family: &str, size_px: f64) -> Self {
        let letter_spacing_px = KNOWN_FONTS
            .iter()
            .find(|(name, _)| *name == family)
            .map(|(_, spacing)| *spacing)
            .unwrap_or(0.0);
        Self {
            family: family.to_string(),
            size_px,
            letter_spacing_px,
        }
    }

    /// CSS shorthand for canvas `font`.
    pub fn css(&self) -> String {
        format!("{}px '{}', sans-serif", self.size_px, self.family)
    }
}

/// Backend that knows how wide a single glyph renders in a font.
pub trait GlyphMeasure {
    fn measure(&mut self, c: char, font: &FontSpec) -> f64;
}

/// Every glyph is `size_px * ratio` wide, with optional per-character overrides.
/// Used headless and in tests.
#[derive(Debug, Clone)]
pub struct FixedMeasure {
    pub ratio: f64,
    pub overrides: HashMap<char, f64>,
}

impl FixedMeasure {
    pub fn new(ratio: f64) -> Self {
        Self {
            ratio,
            overrides: HashMap::new(),
        }
    }

    /// Override a glyph width in font-size units.
    pub fn with(mut self, c: char, ratio: f64) -> Self {
        self.overrides.insert(c, ratio);
        self
    }
}

impl GlyphMeasure for FixedMeasure {
    fn measure(&mut self, c: char, font: &FontSpec) -> f64 {
        self.overrides.get(&c).copied().unwrap_or(self.ratio) * font.size_px
    }
}

pub struct Metrics {
    backend: Box<dyn GlyphMeasure>,
    font: Option<FontSpec>,
    cache: HashMap<char, f64>,
}

impl Metrics {
    pub fn new(backend: Box<dyn GlyphMeasure>) -> Self {
        Self {
            backend,
            font: None,
            cache: HashMap::new(),
        }
    }

    /// Switch to `font`. The cache is only dropped when the font actually changes.
    pub fn init(&mut self, font: &FontSpec) {
        if self.font.as_ref() != Some(font) {
            self.cache.clear();
            self.font = Some(font.clone());
        }
    }

    pub fn dispose(&mut self) {
        self.cache.clear();
        self.font = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.font.is_some()
    }

    /// Raw measured width; lazily initializes to `font` if needed.
    pub fn glyph_width(&mut self, c: char, font: &FontSpec) -> f64 {
        self.init(font);
        if let Some(w) = self.cache.get(&c) {
            return *w;
        }
        let w = self.backend.measure(c, font);
        let w = if w.is_finite() && w >= 0.0 { w } else { 0.0 };
        self.cache.insert(c, w);
        w
    }

    pub fn cached_glyphs(&self) -> usize {
        self.cache.len()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("font", &self.font)
            .field("cached", &self.cache.len())
            .finish()
    }
}
