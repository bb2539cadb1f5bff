//! Persisted state and the export/import document.
//!
//! Both share one JSON shape:
//! `{ "theme", "pattern"?, "font", "palette", "align"?, "events": [...] }`.
//! Writing goes through serde. Reading is deliberately forgiving: documents
//! come from local storage written by older builds or from files users pass
//! around, so unknown or missing fields fall back to defaults and events that
//! cannot be interpreted are skipped instead of failing the whole load.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::config::ToyConfig;
use crate::error::{Result, ToyError};
use crate::events::Event;
use crate::layout::Align;
use crate::palette::Palette;
use crate::pitch::NoteName;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToyDocument {
    pub theme: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    pub font: String,
    pub palette: String,
    #[serde(default)]
    pub align: Align,
    pub events: Vec<Event>,
}

/// Result of a lenient load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    pub document: ToyDocument,
    pub skipped: usize,
}

impl ToyDocument {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses `json`, filling gaps from `defaults`. Only invalid JSON or a
    /// non-object root is an error.
    pub fn parse_lenient(json: &str, defaults: &ToyConfig) -> Result<LoadedDocument> {
        let root: Value = serde_json::from_str(json)?;
        let Some(obj) = root.as_object() else {
            return Err(ToyError::MalformedDocument(
                "expected a JSON object at the root".to_string(),
            ));
        };
        let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);

        let palette_name = text("palette").unwrap_or_else(|| defaults.palette.clone());
        let palette = match Palette::build(&palette_name) {
            Ok(p) => p,
            Err(err) => {
                warn!(%err, fallback = %defaults.palette, "palette in document not usable");
                Palette::build(&defaults.palette).unwrap_or_default()
            }
        };
        let align = match obj.get("align").and_then(Value::as_str) {
            Some(name) => name.parse().unwrap_or_else(|err| {
                warn!(%err, "alignment in document not usable");
                defaults.align
            }),
            None => defaults.align,
        };

        let mut events = Vec::new();
        let mut skipped = 0;
        match obj.get("events") {
            Some(Value::Array(items)) => {
                let mut last_time = 0.0;
                for item in items {
                    match event_from_value(item, &palette, last_time) {
                        Some(event) => {
                            last_time = event.timestamp;
                            events.push(event);
                        }
                        None => skipped += 1,
                    }
                }
            }
            Some(other) if !other.is_null() => {
                warn!("document events is not an array; starting empty");
            }
            _ => {}
        }
        if skipped > 0 {
            warn!(skipped, "skipped uninterpretable events");
        }

        Ok(LoadedDocument {
            document: ToyDocument {
                theme: text("theme").unwrap_or_else(|| defaults.theme.clone()),
                pattern: text("pattern"),
                font: text("font").unwrap_or_else(|| defaults.font.clone()),
                palette: palette.name().to_string(),
                align,
                events,
            },
            skipped,
        })
    }
}

fn event_from_value(value: &Value, palette: &Palette, last_time: f64) -> Option<Event> {
    let obj = value.as_object()?;
    let mut chars = obj.get("char")?.as_str()?.chars();
    let character = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    let number = |key: &str| obj.get(key).and_then(Value::as_f64).filter(|v| v.is_finite());
    let note = match character {
        ' ' | '\n' => None,
        _ => obj
            .get("note")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<NoteName>().ok())
            .or_else(|| palette.note_for(character)),
    };
    Some(Event {
        character,
        note,
        timestamp: number("time").unwrap_or(last_time),
        x: number("x").unwrap_or(0.0),
        y: number("y").unwrap_or(0.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(json: &str) -> LoadedDocument {
        ToyDocument::parse_lenient(json, &ToyConfig::default()).unwrap()
    }

    #[test]
    fn missing_fields_use_defaults() {
        let doc = load("{}").document;
        let defaults = ToyConfig::default();
        assert_eq!(doc.theme, defaults.theme);
        assert_eq!(doc.font, defaults.font);
        assert_eq!(doc.palette, defaults.palette);
        assert_eq!(doc.pattern, None);
        assert!(doc.events.is_empty());
    }

    #[test]
    fn non_array_events_load_empty() {
        let loaded = load(r#"{"events": "abc"}"#);
        assert!(loaded.document.events.is_empty());
        assert_eq!(loaded.skipped, 0);
    }

    #[test]
    fn bad_events_are_skipped_not_fatal() {
        let loaded = load(
            r#"{"palette":"majorC","events":[
                {"char":"a","note":"C4","time":1.0},
                {"char":"ab"},
                42,
                {"note":"D4"},
                {"char":"b","time":"soon"},
                {"char":"c","note":"not-a-note","time":2.0}
            ]}"#,
        );
        assert_eq!(loaded.skipped, 3);
        let events = &loaded.document.events;
        assert_eq!(events.len(), 3);
        // missing time inherits the previous one
        assert_eq!(events[1].timestamp, 1.0);
        // unparsable note is re-derived from the palette
        assert_eq!(events[2].note.unwrap().to_string(), "E4");
    }

    #[test]
    fn silent_characters_never_carry_notes() {
        let loaded = load(r#"{"events":[{"char":" ","note":"C4"},{"char":"\n","note":"D4"}]}"#);
        assert!(loaded.document.events.iter().all(|e| e.note.is_none()));
    }

    #[test]
    fn unknown_palette_falls_back() {
        let doc = load(r#"{"palette":"kazoo","events":[{"char":"a"}]}"#).document;
        assert_eq!(doc.palette, "majorC");
        assert_eq!(doc.events[0].note.unwrap().to_string(), "C4");
    }

    #[test]
    fn non_object_root_is_an_error() {
        let err = ToyDocument::parse_lenient("[1,2]", &ToyConfig::default()).unwrap_err();
        assert!(matches!(err, ToyError::MalformedDocument(_)));
        assert!(ToyDocument::parse_lenient("nope", &ToyConfig::default()).is_err());
    }

    #[test]
    fn pattern_is_optional_on_output() {
        let doc = ToyDocument {
            theme: "dusk".to_string(),
            pattern: None,
            font: "Fredoka".to_string(),
            palette: "majorC".to_string(),
            align: Align::Left,
            events: Vec::new(),
        };
        let json = doc.to_json().unwrap();
        assert!(!json.contains("pattern"));
        let back = load(&json).document;
        assert_eq!(back, doc);
    }
}
