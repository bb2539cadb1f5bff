//! Caret/layout engine: greedy wrapping of the typed characters into lines and
//! per-line alignment.
//!
//! Positions are the top-left corner of each glyph box relative to the
//! container's content box. Layout is a pure function of its inputs, so a
//! reflow after a font change, alignment change or delete always lands on the
//! same positions as typing the same text fresh.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LayoutConfig;
use crate::error::{Result, ToyError};
use crate::metrics::{FontSpec, Metrics};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Align {
    pub fn as_str(self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Center => "center",
            Align::Right => "right",
            Align::Justify => "justify",
        }
    }
}

impl fmt::Display for Align {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Align {
    type Err = ToyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Align::Left),
            "center" | "centre" => Ok(Align::Center),
            "right" => Ok(Align::Right),
            "justify" => Ok(Align::Justify),
            _ => Err(ToyError::InvalidAlignment(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn lerp(self, other: Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

impl From<Point> for (f64, f64) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// Running position while laying out a sequence left to right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaretCursor {
    pub x: f64,
    pub y: f64,
    pub line_height: f64,
    pub line: usize,
    line_empty: bool,
}

impl CaretCursor {
    pub fn new(line_height: f64) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            line_height,
            line: 0,
            line_empty: true,
        }
    }

    fn break_line(&mut self) {
        self.x = 0.0;
        self.y += self.line_height;
        self.line += 1;
        self.line_empty = true;
    }
}

/// Where one character landed during the greedy pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub pos: Point,
    pub advance: f64,
    pub line: usize,
    pub is_break: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutEngine {
    font: FontSpec,
    container_width: f64,
    line_height_ratio: f64,
    space_ratio: f64,
    reference_glyph: char,
}

impl LayoutEngine {
    pub fn new(font: FontSpec, container_width: f64, config: &LayoutConfig) -> Self {
        Self {
            font,
            container_width,
            line_height_ratio: config.line_height_ratio,
            space_ratio: config.space_ratio,
            reference_glyph: config.reference_glyph,
        }
    }

    pub fn font(&self) -> &FontSpec {
        &self.font
    }

    pub fn set_font(&mut self, font: FontSpec) {
        self.font = font;
    }

    pub fn container_width(&self) -> f64 {
        self.container_width
    }

    pub fn set_container_width(&mut self, width: f64) {
        self.container_width = width;
    }

    pub fn line_height(&self) -> f64 {
        self.font.size_px * self.line_height_ratio
    }

    /// `None` when the container has no usable width: wrapping is disabled.
    fn wrap_width(&self) -> Option<f64> {
        (self.container_width.is_finite() && self.container_width > 0.0)
            .then_some(self.container_width)
    }

    pub fn cursor(&self) -> CaretCursor {
        CaretCursor::new(self.line_height())
    }

    /// Horizontal advance of `c`. Newlines advance nothing.
    pub fn advance_of(&self, c: char, metrics: &mut Metrics) -> f64 {
        match c {
            '\n' => 0.0,
            ' ' => self.space_ratio * metrics.glyph_width(self.reference_glyph, &self.font),
            _ => metrics.glyph_width(c, &self.font) + self.font.letter_spacing_px,
        }
    }

    /// Greedy step: place `c` at the cursor, wrapping first if it would not fit.
    pub fn place(&self, cursor: &mut CaretCursor, c: char, metrics: &mut Metrics) -> Placement {
        if c == '\n' {
            let placement = Placement {
                pos: Point::new(cursor.x, cursor.y),
                advance: 0.0,
                line: cursor.line,
                is_break: true,
            };
            cursor.break_line();
            return placement;
        }
        let advance = self.advance_of(c, metrics);
        if let Some(limit) = self.wrap_width() {
            // a glyph wider than the container still gets its own line at x = 0
            if !cursor.line_empty && cursor.x + advance > limit {
                cursor.break_line();
            }
        }
        let placement = Placement {
            pos: Point::new(cursor.x, cursor.y),
            advance,
            line: cursor.line,
            is_break: false,
        };
        cursor.x += advance;
        cursor.line_empty = false;
        placement
    }

    /// Full layout of `chars` under `align`. The result is index-aligned with the input.
    pub fn layout<I>(&self, chars: I, align: Align, metrics: &mut Metrics) -> Vec<Point>
    where
        I: IntoIterator<Item = char>,
    {
        let mut cursor = self.cursor();
        let placements: Vec<Placement> = chars
            .into_iter()
            .map(|c| self.place(&mut cursor, c, metrics))
            .collect();

        let limit = match (align, self.wrap_width()) {
            (Align::Left, _) | (_, None) => {
                return placements.iter().map(|p| p.pos).collect();
            }
            (_, Some(limit)) => limit,
        };

        let mut out: Vec<Point> = placements.iter().map(|p| p.pos).collect();
        let last_line = placements.last().map(|p| p.line).unwrap_or(0);
        let mut start = 0;
        while start < placements.len() {
            let line = placements[start].line;
            let end = placements[start..]
                .iter()
                .position(|p| p.line != line)
                .map(|off| start + off)
                .unwrap_or(placements.len());
            let members = &placements[start..end];
            let glyphs = members.iter().filter(|p| !p.is_break).count();
            let line_width: f64 = members.iter().map(|p| p.advance).sum();
            let slack = (limit - line_width).max(0.0);

            let (offset, gap) = match align {
                Align::Left => (0.0, 0.0),
                Align::Center => (slack / 2.0, 0.0),
                Align::Right => (slack, 0.0),
                Align::Justify if line != last_line && glyphs > 1 => {
                    (0.0, slack / (glyphs - 1) as f64)
                }
                Align::Justify => (0.0, 0.0),
            };

            let mut glyphs_before = 0usize;
            for (k, p) in members.iter().enumerate() {
                let gaps = glyphs_before.min(glyphs.saturating_sub(1));
                out[start + k] = Point::new(offset + p.pos.x + gaps as f64 * gap, p.pos.y);
                if !p.is_break {
                    glyphs_before += 1;
                }
            }
            start = end;
        }
        debug!(
            chars = out.len(),
            lines = last_line + 1,
            align = %align,
            "layout pass"
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::FixedMeasure;

    const SIZE: f64 = 10.0;

    fn engine(width: f64) -> LayoutEngine {
        let font = FontSpec {
            family: "Test".to_string(),
            size_px: SIZE,
            letter_spacing_px: 0.0,
        };
        LayoutEngine::new(font, width, &LayoutConfig::default())
    }

    // every glyph 10px wide, 'n' too, so a space is 6px
    fn metrics() -> Metrics {
        Metrics::new(Box::new(FixedMeasure::new(1.0)))
    }

    #[test]
    fn newline_resets_x_and_advances_y() {
        let e = engine(500.0);
        let pos = e.layout("a\nb".chars(), Align::Left, &mut metrics());
        assert_eq!(pos[0], Point::new(0.0, 0.0));
        assert_eq!(pos[1], Point::new(10.0, 0.0));
        assert_eq!(pos[2], Point::new(0.0, e.line_height()));
        assert!((e.line_height() - 14.0).abs() < 1e-12);
    }

    #[test]
    fn space_uses_reference_glyph_ratio() {
        let e = engine(500.0);
        let mut m = Metrics::new(Box::new(FixedMeasure::new(1.0).with('n', 0.5)));
        assert!((e.advance_of(' ', &mut m) - 3.0).abs() < 1e-12);
        assert_eq!(e.advance_of('\n', &mut m), 0.0);
    }

    #[test]
    fn letter_spacing_applies_to_non_space_glyphs() {
        let font = FontSpec {
            family: "Test".to_string(),
            size_px: SIZE,
            letter_spacing_px: 2.0,
        };
        let e = LayoutEngine::new(font, 100.0, &LayoutConfig::default());
        let mut m = metrics();
        assert_eq!(e.advance_of('a', &mut m), 12.0);
        assert!((e.advance_of(' ', &mut m) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn wraps_when_the_next_glyph_would_overflow() {
        let e = engine(35.0);
        let pos = e.layout("abcd".chars(), Align::Left, &mut metrics());
        assert_eq!(pos[2], Point::new(20.0, 0.0));
        assert_eq!(pos[3], Point::new(0.0, e.line_height()));
    }

    #[test]
    fn oversized_glyph_sits_alone_at_zero() {
        let e = engine(5.0);
        let pos = e.layout("ab".chars(), Align::Left, &mut metrics());
        assert_eq!(pos[0], Point::new(0.0, 0.0));
        assert_eq!(pos[1], Point::new(0.0, e.line_height()));
    }

    #[test]
    fn zero_width_container_disables_wrapping() {
        for width in [0.0, -3.0, f64::NAN] {
            let e = engine(width);
            for align in [Align::Left, Align::Center, Align::Justify] {
                let pos = e.layout("abcdefgh".chars(), align, &mut metrics());
                assert!(pos.iter().all(|p| p.y == 0.0));
                assert_eq!(pos[7].x, 70.0);
            }
        }
    }

    #[test]
    fn center_and_right_offset_each_line() {
        let e = engine(100.0);
        let center = e.layout("ab".chars(), Align::Center, &mut metrics());
        assert_eq!(center[0].x, 40.0);
        assert_eq!(center[1].x, 50.0);
        let right = e.layout("ab\nc".chars(), Align::Right, &mut metrics());
        assert_eq!(right[0].x, 80.0);
        assert_eq!(right[3].x, 90.0);
    }

    #[test]
    fn justify_spreads_all_but_the_last_line() {
        let e = engine(35.0);
        // line 0 = "abc" (30px), line 1 = "de"
        let pos = e.layout("abcde".chars(), Align::Justify, &mut metrics());
        assert_eq!(pos[0].x, 0.0);
        assert!((pos[1].x - 12.5).abs() < 1e-9);
        assert!((pos[2].x - 25.0).abs() < 1e-9);
        assert!((pos[2].x + 10.0 - 35.0).abs() < 1e-9);
        assert_eq!(pos[3].x, 0.0);
        assert_eq!(pos[4].x, 10.0);
    }

    #[test]
    fn justify_leaves_single_glyph_lines_alone() {
        let e = engine(100.0);
        let pos = e.layout("a\nbc".chars(), Align::Justify, &mut metrics());
        assert_eq!(pos[0].x, 0.0);
    }

    #[test]
    fn switching_back_to_left_restores_positions() {
        let e = engine(45.0);
        let text = "hello world\nhi";
        let mut m = metrics();
        let left = e.layout(text.chars(), Align::Left, &mut m);
        for align in [Align::Center, Align::Right, Align::Justify] {
            let _ = e.layout(text.chars(), align, &mut m);
        }
        assert_eq!(e.layout(text.chars(), Align::Left, &mut m), left);
    }

    #[test]
    fn incremental_cursor_matches_full_layout() {
        let e = engine(42.0);
        let text = "ab cd\nefghij k";
        let mut m = metrics();
        let full = e.layout(text.chars(), Align::Left, &mut m);
        let mut cursor = e.cursor();
        for (i, c) in text.chars().enumerate() {
            assert_eq!(e.place(&mut cursor, c, &mut m).pos, full[i]);
        }
    }

    #[test]
    fn align_parses_case_insensitively() {
        assert_eq!("Justify".parse::<Align>().unwrap(), Align::Justify);
        assert_eq!(Align::Center.to_string(), "center");
        assert!("middle".parse::<Align>().is_err());
    }
}
