//! Octave-qualified note names (`C4`, `F#3`, `Bb5`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, ToyError};

/// Pitch class of the chromatic scale. Flats parse to the enharmonic sharp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Semitone within an octave (C = 0, B = 11).
    pub fn semitone(self) -> u8 {
        self as u8
    }

    fn from_semitone(semitone: i32) -> PitchClass {
        PitchClass::ALL[semitone.rem_euclid(12) as usize]
    }

    fn label(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }
}

const MIDI_MIN: i32 = 0;
const MIDI_MAX: i32 = 131;

/// A pitch with its octave. Middle C is `C4` (MIDI 60).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoteName {
    pub class: PitchClass,
    pub octave: i8,
}

impl NoteName {
    pub const fn new(class: PitchClass, octave: i8) -> Self {
        Self { class, octave }
    }

    pub fn midi(self) -> i32 {
        (self.octave as i32 + 1) * 12 + self.class.semitone() as i32
    }

    /// Equal temperament, A4 = 440 Hz.
    pub fn frequency(self) -> f64 {
        440.0 * 2.0_f64.powf((self.midi() as f64 - 69.0) / 12.0)
    }

    /// `None` outside C-1 (0) ..= B9 (131), where the octave stops being printable.
    pub fn from_midi(midi: i32) -> Option<Self> {
        if !(MIDI_MIN..=MIDI_MAX).contains(&midi) {
            return None;
        }
        Some(Self {
            class: PitchClass::from_semitone(midi),
            octave: (midi.div_euclid(12) - 1) as i8,
        })
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.class.label(), self.octave)
    }
}

impl FromStr for NoteName {
    type Err = ToyError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ToyError::InvalidNote(s.to_string());
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let letter = chars.next().ok_or_else(invalid)?;
        let base: i32 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(invalid()),
        };
        let rest = chars.as_str();
        let (shift, octave_text) = if let Some(r) = rest.strip_prefix('#') {
            (1, r)
        } else if let Some(r) = rest.strip_prefix('b') {
            (-1, r)
        } else {
            (0, rest)
        };
        let octave: i8 = octave_text.parse().map_err(|_| invalid())?;
        if !(-1..=9).contains(&octave) {
            return Err(invalid());
        }
        // Cb4 is B3 and B#3 is C4: go through MIDI so the octave carries.
        let midi = (octave as i32 + 1) * 12 + base + shift;
        NoteName::from_midi(midi).ok_or_else(invalid)
    }
}

impl Serialize for NoteName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NoteName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
