//! Application state.
//!
//! One owned struct holds everything the toy mutates: the event log, the
//! active palette, the layout engine with its caret, the glyph metrics, the
//! playback session and the inactivity timer. The browser glue keeps a single
//! `AppState` and calls into it from keyboard handlers and the frame loop;
//! nothing here touches the DOM, so the whole flow runs headless in tests.
//!
//! Positions in the log are kept current at all times. With left alignment a
//! keystroke only advances the caret; every other change (alignment, font,
//! container width, delete, import) re-runs the full layout.

use tracing::{debug, info, warn};

use crate::config::ToyConfig;
use crate::debounce::InactivityTimer;
use crate::document::{LoadedDocument, ToyDocument};
use crate::error::{Result, ToyError};
use crate::events::{Event, EventLog};
use crate::layout::{Align, CaretCursor, LayoutEngine, Point};
use crate::metrics::{FontSpec, GlyphMeasure, Metrics};
use crate::palette::{Palette, PaletteCache};
use crate::pitch::NoteName;
use crate::playback::{PlaybackFrame, PlaybackSession};
use crate::schedule::{ScheduleEntry, build_schedule};
use crate::wav;

/// What a single keystroke did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyOutcome {
    pub index: usize,
    pub character: char,
    /// Note to sound right away; `None` for silent characters.
    pub note: Option<NoteName>,
    pub pos: Point,
    /// True when earlier glyphs moved too and must be repositioned.
    pub reflowed: bool,
}

#[derive(Debug)]
pub struct AppState {
    config: ToyConfig,
    log: EventLog,
    palettes: PaletteCache,
    palette: Palette,
    theme: String,
    pattern: Option<String>,
    align: Align,
    layout: LayoutEngine,
    metrics: Metrics,
    caret: CaretCursor,
    session: PlaybackSession,
    inactivity: InactivityTimer,
}

impl AppState {
    pub fn new(config: ToyConfig, measure: Box<dyn GlyphMeasure>) -> Result<Self> {
        config.validate()?;
        let mut palettes = PaletteCache::new();
        let palette = palettes.get(&config.theme, &config.palette)?;
        let font = FontSpec::named(&config.font, config.layout.font_size_px);
        let mut metrics = Metrics::new(measure);
        metrics.init(&font);
        let layout = LayoutEngine::new(font, config.layout.container_width_px, &config.layout);
        let caret = layout.cursor();
        Ok(Self {
            log: EventLog::new(),
            palettes,
            palette,
            theme: config.theme.clone(),
            pattern: None,
            align: config.align,
            layout,
            metrics,
            caret,
            session: PlaybackSession::new(&config.playback),
            inactivity: InactivityTimer::new(config.timing.inactivity_delay),
            config,
        })
    }

    pub fn config(&self) -> &ToyConfig {
        &self.config
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    pub fn align(&self) -> Align {
        self.align
    }

    pub fn font(&self) -> &FontSpec {
        self.layout.font()
    }

    pub fn line_height(&self) -> f64 {
        self.layout.line_height()
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn speed(&self) -> f64 {
        self.config.playback.speed
    }

    pub fn inactivity_pending(&self) -> bool {
        self.inactivity.is_pending()
    }

    /// Records a keystroke at `now` (seconds) and places its glyph.
    pub fn type_char(&mut self, c: char, now: f64) -> KeyOutcome {
        let note = self.palette.note_for(c);
        let index = self.log.push(Event::new(c, note, now));
        let placement = self.layout.place(&mut self.caret, c, &mut self.metrics);

        let (pos, reflowed) = if self.align == Align::Left || self.layout.container_width() <= 0.0 {
            self.log.set_position(index, placement.pos.x, placement.pos.y);
            (placement.pos, false)
        } else {
            self.reflow();
            let pos = self
                .log
                .get(index)
                .map(|e| Point::new(e.x, e.y))
                .unwrap_or(placement.pos);
            (pos, true)
        };
        self.inactivity.restart(now);
        debug!(index, char = ?c, note = ?note, x = pos.x, y = pos.y, "typed");
        KeyOutcome {
            index,
            character: c,
            note,
            pos,
            reflowed,
        }
    }

    /// Removes the newest event. Playback in flight is cancelled and the
    /// remaining glyphs are laid out again.
    pub fn delete_last(&mut self, now: f64) -> Option<Event> {
        let removed = self.log.pop()?;
        self.session.cancel();
        self.reflow();
        if self.log.is_empty() {
            self.inactivity.cancel();
        } else {
            self.inactivity.restart(now);
        }
        Some(removed)
    }

    /// Full layout of the live log under the current font, width and alignment.
    pub fn reflow(&mut self) {
        if self.session.cancel() {
            debug!("reflow cancelled playback");
        }
        let chars: Vec<char> = self.log.characters().collect();
        let positions: Vec<(f64, f64)> = self
            .layout
            .layout(chars.iter().copied(), self.align, &mut self.metrics)
            .into_iter()
            .map(Into::into)
            .collect();
        self.log.apply_positions(&positions);

        let mut caret = self.layout.cursor();
        for c in chars {
            self.layout.place(&mut caret, c, &mut self.metrics);
        }
        self.caret = caret;
    }

    pub fn set_align(&mut self, align: Align) {
        if self.align != align {
            self.align = align;
            self.reflow();
        }
    }

    pub fn set_font(&mut self, family: &str) {
        let font = FontSpec::named(family, self.config.layout.font_size_px);
        if font == *self.layout.font() {
            return;
        }
        self.metrics.init(&font);
        self.layout.set_font(font);
        self.config.font = family.to_string();
        self.reflow();
    }

    /// Ignores widths that only differ by float noise.
    pub fn set_container_width(&mut self, width: f64) {
        if (self.layout.container_width() - width).abs() < 0.5 {
            return;
        }
        self.layout.set_container_width(width);
        self.reflow();
    }

    /// New keystrokes use the palette; events already in the log keep their notes.
    pub fn set_palette(&mut self, name: &str) -> Result<()> {
        self.palette = self.palettes.get(&self.theme, name)?;
        self.config.palette = name.to_string();
        Ok(())
    }

    pub fn set_theme(&mut self, theme: &str) -> Result<()> {
        self.palette = self.palettes.get(theme, self.palette.name())?;
        self.theme = theme.to_string();
        Ok(())
    }

    pub fn set_pattern(&mut self, pattern: Option<String>) {
        self.pattern = pattern;
    }

    pub fn set_speed(&mut self, speed: f64) -> Result<()> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(ToyError::Config(format!("playback speed must be positive, got {speed}")));
        }
        self.config.playback.speed = speed;
        Ok(())
    }

    pub fn set_show_marker(&mut self, show: bool) {
        self.session.set_show_marker(show);
    }

    pub fn schedule(&self) -> Vec<ScheduleEntry> {
        build_schedule(&self.log, &self.config.timing)
    }

    /// Starts (or restarts) playback of the live log. `None` when nothing can sound.
    pub fn play(&mut self, now: f64) -> Option<u64> {
        self.inactivity.cancel();
        let points: Vec<Point> = self
            .log
            .note_bearing()
            .map(|e| Point::new(e.x, e.y))
            .collect();
        let schedule = self.schedule();
        self.session
            .start(&points, &schedule, &self.config.playback, now)
    }

    /// Starts playback once the typist has gone quiet.
    pub fn poll_inactivity(&mut self, now: f64) -> Option<u64> {
        if self.inactivity.poll(now) {
            self.play(now)
        } else {
            None
        }
    }

    /// One animation frame: the inactivity check, then the playhead.
    pub fn tick(&mut self, now: f64, particle_scale: f64) -> PlaybackFrame {
        self.poll_inactivity(now);
        self.session.tick(now, particle_scale)
    }

    pub fn clear(&mut self) {
        self.session.cancel();
        self.inactivity.cancel();
        self.log.clear();
        self.caret = self.layout.cursor();
        info!("cleared");
    }

    pub fn document(&self) -> ToyDocument {
        ToyDocument {
            theme: self.theme.clone(),
            pattern: self.pattern.clone(),
            font: self.layout.font().family.clone(),
            palette: self.palette.name().to_string(),
            align: self.align,
            events: self.log.as_slice().to_vec(),
        }
    }

    pub fn export_document(&self) -> Result<String> {
        let json = self.document().to_json_pretty()?;
        info!(events = self.log.len(), bytes = json.len(), "exported document");
        Ok(json)
    }

    /// Replaces the current state with `json`. Silent: no note is produced.
    /// Returns how many events had to be skipped.
    pub fn import_document(&mut self, json: &str) -> Result<usize> {
        let loaded = ToyDocument::parse_lenient(json, &self.config)?;
        let skipped = loaded.skipped;
        self.load(loaded);
        info!(events = self.log.len(), skipped, "imported document");
        Ok(skipped)
    }

    /// Installs an already parsed document.
    pub fn load(&mut self, loaded: LoadedDocument) {
        let doc = loaded.document;
        self.clear();
        self.theme = doc.theme;
        self.pattern = doc.pattern;
        self.palette = match self.palettes.get(&self.theme, &doc.palette) {
            Ok(palette) => palette,
            Err(err) => {
                warn!(%err, "keeping current palette");
                self.palette.clone()
            }
        };
        self.config.palette = self.palette.name().to_string();
        self.align = doc.align;

        let font = FontSpec::named(&doc.font, self.config.layout.font_size_px);
        self.metrics.init(&font);
        self.layout.set_font(font);
        self.config.font = doc.font;

        for event in doc.events {
            self.log.push(event);
        }
        self.reflow();
    }

    /// 16-bit mono WAV of the smoothed schedule.
    pub fn export_wav(&self) -> Result<Vec<u8>> {
        wav::encode_wav(&self.schedule(), &self.config.export)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::FixedMeasure;
    use crate::playback::PlaybackPhase;

    fn state(width: f64) -> AppState {
        let mut cfg = ToyConfig::default();
        cfg.layout.font_size_px = 10.0;
        cfg.layout.container_width_px = width;
        cfg.font = "Space Mono".to_string();
        AppState::new(cfg, Box::new(FixedMeasure::new(1.0))).unwrap()
    }

    fn type_str(s: &mut AppState, text: &str, start: f64) {
        for (i, c) in text.chars().enumerate() {
            s.type_char(c, start + i as f64 * 0.2);
        }
    }

    fn positions(s: &AppState) -> Vec<(f64, f64)> {
        s.log().iter().map(|e| (e.x, e.y)).collect()
    }

    #[test]
    fn unknown_palette_in_config_is_an_error() {
        let cfg = ToyConfig {
            palette: "kazoo".to_string(),
            ..ToyConfig::default()
        };
        let err = AppState::new(cfg, Box::new(FixedMeasure::new(0.5))).unwrap_err();
        assert!(matches!(err, ToyError::UnknownPalette(_)));
    }

    #[test]
    fn incremental_typing_matches_a_full_reflow() {
        let mut s = state(45.0);
        type_str(&mut s, "hello world\nab", 0.0);
        let incremental = positions(&s);
        s.reflow();
        assert_eq!(positions(&s), incremental);
    }

    #[test]
    fn centered_typing_reflows_earlier_glyphs() {
        let mut s = state(100.0);
        s.set_align(Align::Center);
        let first = s.type_char('a', 0.0);
        assert!(first.reflowed);
        assert_eq!(first.pos.x, 45.0);
        s.type_char('b', 0.2);
        assert_eq!(s.log().get(0).map(|e| e.x), Some(40.0));
    }

    #[test]
    fn delete_cancels_playback_and_relays() {
        let mut s = state(100.0);
        type_str(&mut s, "abc", 0.0);
        assert!(s.play(1.0).is_some());
        let removed = s.delete_last(1.1);
        assert_eq!(removed.map(|e| e.character), Some('c'));
        assert_eq!(s.session().phase(), PlaybackPhase::Idle);
        assert_eq!(s.log().len(), 2);
        // the caret follows the shorter log
        let next = s.type_char('z', 2.0);
        assert_eq!(next.pos, Point::new(20.0, 0.0));
    }

    #[test]
    fn delete_retires_notes_queued_for_audio() {
        use crate::audio_gate::{AudioGate, NoteIntent};

        let mut s = state(100.0);
        type_str(&mut s, "abc", 0.0);
        let mut gate = AudioGate::new();
        gate.begin_init();
        s.play(5.0).unwrap();
        for trigger in s.tick(5.0, 1.0).notes {
            gate.submit(NoteIntent {
                note: trigger.note,
                velocity: 0.8,
                run: Some(trigger.run),
            });
        }
        assert_eq!(gate.queued(), 1);

        s.delete_last(5.1);
        gate.drop_stale(s.session().run_id());
        assert!(gate.mark_ready().is_empty());
    }

    #[test]
    fn clear_and_reflow_retire_the_run_too() {
        let mut s = state(100.0);
        type_str(&mut s, "abc", 0.0);
        let run = s.play(5.0).unwrap();
        s.reflow();
        assert_ne!(s.session().run_id(), run);
        let run = s.play(6.0).unwrap();
        s.clear();
        assert_ne!(s.session().run_id(), run);
    }

    #[test]
    fn delete_on_empty_log_is_a_no_op() {
        let mut s = state(100.0);
        assert!(s.delete_last(0.0).is_none());
        assert!(!s.inactivity_pending());
    }

    #[test]
    fn inactivity_starts_playback_once() {
        let mut s = state(100.0);
        type_str(&mut s, "ab", 0.0);
        assert!(s.poll_inactivity(1.0).is_none());
        assert_eq!(s.poll_inactivity(1.8), Some(1));
        assert!(s.poll_inactivity(5.0).is_none());
    }

    #[test]
    fn playback_fires_every_note_in_order() {
        let mut s = state(100.0);
        type_str(&mut s, "a b", 0.0);
        s.play(10.0);
        let mut fired = Vec::new();
        let mut t = 10.0;
        while s.session().is_running() && t < 20.0 {
            fired.extend(s.tick(t, 1.0).notes.into_iter().map(|n| n.note.to_string()));
            t += 1.0 / 60.0;
        }
        assert_eq!(fired, vec!["C4", "D4"]);
    }

    #[test]
    fn palette_switch_keeps_recorded_notes() {
        let mut s = state(100.0);
        s.type_char('a', 0.0);
        s.set_palette("minorA").unwrap();
        s.type_char('a', 0.5);
        let notes: Vec<String> = s
            .log()
            .iter()
            .filter_map(|e| e.note.map(|n| n.to_string()))
            .collect();
        assert_eq!(notes, vec!["C4", "A3"]);
        assert!(s.set_palette("kazoo").is_err());
        assert_eq!(s.palette().name(), "minorA");
    }

    #[test]
    fn speed_must_be_positive() {
        let mut s = state(100.0);
        assert!(s.set_speed(0.0).is_err());
        assert!(s.set_speed(f64::NAN).is_err());
        s.set_speed(2.0).unwrap();
        assert_eq!(s.speed(), 2.0);
    }

    #[test]
    fn import_replaces_everything() {
        let mut s = state(100.0);
        type_str(&mut s, "xyz", 0.0);
        let skipped = s
            .import_document(
                r#"{"theme":"dawn","pattern":"dots","font":"Caveat","palette":"blues",
                    "events":[{"char":"a","time":1.0},{"char":"??"}]}"#,
            )
            .unwrap();
        assert_eq!(skipped, 1);
        assert_eq!(s.log().len(), 1);
        assert_eq!(s.theme(), "dawn");
        assert_eq!(s.pattern(), Some("dots"));
        assert_eq!(s.font().family, "Caveat");
        assert_eq!(s.palette().name(), "blues");
        assert!(!s.inactivity_pending());
    }

    #[test]
    fn clear_empties_the_log_and_resets_the_caret() {
        let mut s = state(100.0);
        type_str(&mut s, "ab\nc", 0.0);
        s.clear();
        assert!(s.log().is_empty());
        assert_eq!(s.type_char('q', 3.0).pos, Point::new(0.0, 0.0));
    }
}
