//! Error type shared by the core modules.
//!
//! Silent characters (space, newline, punctuation) are never errors: they flow
//! through the crate as `None` notes. The variants here cover the boundaries
//! where outside input enters the toy: names chosen by the host page,
//! persisted documents and configuration.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToyError {
    /// A palette name that has no pitch pool.
    #[error("Unknown palette '{0}'")]
    UnknownPalette(String),

    /// Text that does not parse as an octave-qualified note such as `C4` or `F#3`.
    #[error("Invalid note name '{0}'")]
    InvalidNote(String),

    #[error("Unknown alignment '{0}' (expected left, center, right or justify)")]
    InvalidAlignment(String),

    /// The document parsed as JSON but its shape cannot be used at all
    /// (for example the root is not an object).
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Audio export was requested for a log without any note-bearing events.
    #[error("Nothing to export: no note-bearing events")]
    EmptySchedule,
}

pub type Result<T> = std::result::Result<T, ToyError>;
