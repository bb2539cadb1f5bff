//! Letter → note palettes.
//!
//! Each palette is a fixed, ordered pool of [`POOL_SIZE`] pitches. Letter `i`
//! of the alphabet (a = 0) sounds `pool[i % POOL_SIZE]`, so the mapping is a
//! pure function of the palette name. Anything that is not an ASCII letter
//! (space, newline, digits, punctuation) is silent.

use std::collections::HashMap;

use crate::error::{Result, ToyError};
use crate::pitch::{NoteName, PitchClass::*};

pub const POOL_SIZE: usize = 8;
pub const DEFAULT_PALETTE: &str = "majorC";

const fn n(class: crate::pitch::PitchClass, octave: i8) -> NoteName {
    NoteName::new(class, octave)
}

/// Named pitch pools, in the order the host menu lists them.
#[rustfmt::skip]
pub const PALETTES: &[(&str, [NoteName; POOL_SIZE])] = &[
    ("majorC", [n(C, 4), n(D, 4), n(E, 4), n(F, 4), n(G, 4), n(A, 4), n(B, 4), n(C, 5)]),
    ("minorA", [n(A, 3), n(B, 3), n(C, 4), n(D, 4), n(E, 4), n(F, 4), n(G, 4), n(A, 4)]),
    ("pentatonic", [n(C, 4), n(D, 4), n(E, 4), n(G, 4), n(A, 4), n(C, 5), n(D, 5), n(E, 5)]),
    ("dorian", [n(D, 4), n(E, 4), n(F, 4), n(G, 4), n(A, 4), n(B, 4), n(C, 5), n(D, 5)]),
    ("blues", [n(C, 4), n(DSharp, 4), n(F, 4), n(FSharp, 4), n(G, 4), n(ASharp, 4), n(C, 5), n(DSharp, 5)]),
    ("wholeTone", [n(C, 4), n(D, 4), n(E, 4), n(FSharp, 4), n(GSharp, 4), n(ASharp, 4), n(C, 5), n(D, 5)]),
    ("lydian", [n(F, 4), n(G, 4), n(A, 4), n(B, 4), n(C, 5), n(D, 5), n(E, 5), n(F, 5)]),
    ("japanese", [n(E, 4), n(F, 4), n(A, 4), n(B, 4), n(C, 5), n(E, 5), n(F, 5), n(A, 5)]),
];

/// Resolved mapping for all 26 letters.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    name: String,
    letters: [NoteName; 26],
}

impl Palette {
    pub fn build(name: &str) -> Result<Self> {
        let pool = PALETTES
            .iter()
            .find(|(pname, _)| *pname == name)
            .map(|(_, pool)| pool)
            .ok_or_else(|| ToyError::UnknownPalette(name.to_string()))?;
        let letters = std::array::from_fn(|i| pool[i % POOL_SIZE]);
        Ok(Self {
            name: name.to_string(),
            letters,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-insensitive lookup; `None` means "no sound".
    pub fn note_for(&self, c: char) -> Option<NoteName> {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let idx = (c.to_ascii_lowercase() as u8 - b'a') as usize;
        self.letters.get(idx).copied()
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        PALETTES.iter().map(|(name, _)| *name)
    }
}

impl Default for Palette {
    fn default() -> Self {
        let pool = &PALETTES[0].1;
        Self {
            name: DEFAULT_PALETTE.to_string(),
            letters: std::array::from_fn(|i| pool[i % POOL_SIZE]),
        }
    }
}

/// Builds each (theme, palette) mapping once and hands out the cached copy.
#[derive(Debug, Default)]
pub struct PaletteCache {
    built: HashMap<(String, String), Palette>,
}

impl PaletteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, theme: &str, name: &str) -> Result<Palette> {
        let key = (theme.to_string(), name.to_string());
        if let Some(p) = self.built.get(&key) {
            return Ok(p.clone());
        }
        let palette = Palette::build(name)?;
        self.built.insert(key, palette.clone());
        Ok(palette)
    }

    pub fn len(&self) -> usize {
        self.built.len()
    }

    pub fn is_empty(&self) -> bool {
        self.built.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn major_c_starts_on_middle_c() {
        let p = Palette::build("majorC").unwrap();
        assert_eq!(p.note_for('a').unwrap().to_string(), "C4");
        assert_eq!(p.note_for('b').unwrap().to_string(), "D4");
        assert_eq!(p.note_for('h').unwrap().to_string(), "C5");
        // cycles after the pool is exhausted
        assert_eq!(p.note_for('i'), p.note_for('a'));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let p = Palette::build("blues").unwrap();
        for c in 'a'..='z' {
            assert_eq!(p.note_for(c), p.note_for(c.to_ascii_uppercase()));
        }
    }

    #[test]
    fn non_letters_are_silent() {
        let p = Palette::default();
        for c in [' ', '\n', '1', '.', 'é', '\t'] {
            assert!(p.note_for(c).is_none(), "{c:?} should be silent");
        }
    }

    #[test]
    fn building_is_deterministic() {
        for name in Palette::names() {
            let a = Palette::build(name).unwrap();
            let b = Palette::build(name).unwrap();
            for c in 'a'..='z' {
                assert_eq!(a.note_for(c), b.note_for(c));
            }
        }
    }

    #[test]
    fn unknown_palette_is_an_error() {
        assert!(matches!(
            Palette::build("nope"),
            Err(ToyError::UnknownPalette(name)) if name == "nope"
        ));
    }

    #[test]
    fn default_matches_major_c() {
        assert_eq!(Palette::default(), Palette::build(DEFAULT_PALETTE).unwrap());
    }

    #[test]
    fn cache_builds_each_pair_once() {
        let mut cache = PaletteCache::new();
        cache.get("night", "majorC").unwrap();
        cache.get("night", "majorC").unwrap();
        cache.get("day", "majorC").unwrap();
        assert_eq!(cache.len(), 2);
        assert!(cache.get("day", "missing").is_err());
        assert_eq!(cache.len(), 2);
    }
}
