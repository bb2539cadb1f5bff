//! DOM side of the toy: canvas text measurement and the glyph stage.
//!
//! Glyphs are absolutely positioned spans inside one container, index-aligned
//! with the event log. The stage never decides where a glyph goes; it only
//! mirrors the positions `AppState` keeps in the log and lets the glyph
//! animator interpolate towards them.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, Document, Element, HtmlCanvasElement};

use crate::animator::GlyphAnimator;
use crate::events::EventLog;
use crate::layout::Point;
use crate::metrics::{FontSpec, GlyphMeasure};
use crate::trail::Trail;

/// Measures glyphs with an offscreen 2d canvas.
pub struct CanvasMeasure {
    ctx: CanvasRenderingContext2d,
    font_css: String,
}

impl CanvasMeasure {
    pub fn new(doc: &Document) -> Result<Self, JsValue> {
        let canvas: HtmlCanvasElement = doc.create_element("canvas")?.dyn_into()?;
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("no 2d context"))?
            .dyn_into()?;
        Ok(Self {
            ctx,
            font_css: String::new(),
        })
    }
}

impl GlyphMeasure for CanvasMeasure {
    fn measure(&mut self, c: char, font: &FontSpec) -> f64 {
        let css = font.css();
        if css != self.font_css {
            self.ctx.set_font(&css);
            self.font_css = css;
        }
        self.ctx
            .measure_text(c.encode_utf8(&mut [0; 4]))
            .map(|m| m.width())
            .unwrap_or(0.0)
    }
}

struct GlyphSprite {
    el: Element,
    target: Point,
    /// `None` for glyphs rebuilt silently (import, restore): they appear in place.
    spawned_at: Option<f64>,
    settled: bool,
    dirty: bool,
}

pub struct Stage {
    doc: Document,
    root: Element,
    glyphs: Vec<GlyphSprite>,
    marker: Element,
    trail_nodes: Vec<Element>,
}

const ROOT_STYLE: &str = "position:relative; min-height:60vh; overflow:hidden;";
const MARKER_STYLE: &str = "position:absolute; left:0; top:0; width:14px; height:14px; margin:-7px 0 0 -7px; border-radius:50%; background:#ffd166; pointer-events:none; display:none;";

impl Stage {
    /// Reuses the element with `container_id` or appends a fresh one to `<body>`.
    pub fn mount(doc: &Document, container_id: &str, font: &FontSpec) -> Result<Self, JsValue> {
        let root = match doc.get_element_by_id(container_id) {
            Some(el) => el,
            None => {
                let el = doc.create_element("div")?;
                el.set_id(container_id);
                el.set_attribute("style", ROOT_STYLE)?;
                doc.body()
                    .ok_or_else(|| JsValue::from_str("no body"))?
                    .append_child(&el)?;
                el
            }
        };
        root.set_inner_html("");
        let marker = doc.create_element("div")?;
        marker.set_attribute("class", "lf-marker")?;
        marker.set_attribute("style", MARKER_STYLE)?;
        root.append_child(&marker)?;
        let stage = Self {
            doc: doc.clone(),
            root,
            glyphs: Vec::new(),
            marker,
            trail_nodes: Vec::new(),
        };
        stage.set_font(font)?;
        Ok(stage)
    }

    pub fn width(&self) -> f64 {
        self.root.client_width() as f64
    }

    pub fn set_font(&self, font: &FontSpec) -> Result<(), JsValue> {
        self.root.set_attribute(
            "style",
            &format!("{ROOT_STYLE} font: {};", font.css()),
        )
    }

    /// Adds the sprite for a freshly typed character; it animates in from `now`.
    pub fn push_glyph(&mut self, c: char, now: f64) -> Result<(), JsValue> {
        let sprite = self.make_sprite(c, Some(now))?;
        self.glyphs.push(sprite);
        Ok(())
    }

    fn make_sprite(&self, c: char, spawned_at: Option<f64>) -> Result<GlyphSprite, JsValue> {
        let el = self.doc.create_element("span")?;
        el.set_attribute("class", "lf-glyph")?;
        el.set_attribute(
            "style",
            "position:absolute; left:0; top:0; white-space:pre; will-change:transform;",
        )?;
        if c != '\n' {
            el.set_text_content(Some(c.encode_utf8(&mut [0; 4])));
        }
        self.root.append_child(&el)?;
        Ok(GlyphSprite {
            el,
            target: Point::default(),
            spawned_at,
            settled: spawned_at.is_none(),
            dirty: true,
        })
    }

    /// Brings the sprites in line with the log: missing ones appear in place,
    /// surplus ones are removed and moved targets are marked for repaint.
    pub fn sync(&mut self, log: &EventLog) -> Result<(), JsValue> {
        while self.glyphs.len() > log.len() {
            if let Some(sprite) = self.glyphs.pop() {
                sprite.el.remove();
            }
        }
        for (i, event) in log.iter().enumerate() {
            if i == self.glyphs.len() {
                let sprite = self.make_sprite(event.character, None)?;
                self.glyphs.push(sprite);
            }
            let target = Point::new(event.x, event.y);
            let sprite = &mut self.glyphs[i];
            if sprite.target != target {
                sprite.target = target;
                sprite.dirty = true;
            }
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        for sprite in self.glyphs.drain(..) {
            sprite.el.remove();
        }
        for node in self.trail_nodes.drain(..) {
            node.remove();
        }
    }

    /// Repaints glyphs that are still moving or whose target changed.
    pub fn animate(&mut self, animator: &dyn GlyphAnimator, now: f64) {
        for sprite in &mut self.glyphs {
            if sprite.settled && !sprite.dirty {
                continue;
            }
            let pos = match sprite.spawned_at {
                Some(t) if !sprite.settled => {
                    let pose = animator.pose(sprite.target, t, now);
                    sprite.settled = pose.settled;
                    pose.pos
                }
                _ => sprite.target,
            };
            sprite.dirty = false;
            let _ = sprite.el.set_attribute(
                "style",
                &format!(
                    "position:absolute; left:0; top:0; white-space:pre; transform:translate({:.2}px, {:.2}px);",
                    pos.x, pos.y
                ),
            );
        }
    }

    pub fn render_marker(&self, marker: Option<Point>, visible: bool) {
        let style = match marker {
            Some(p) if visible => format!(
                "{MARKER_STYLE} display:block; transform:translate({:.2}px, {:.2}px);",
                p.x, p.y
            ),
            _ => MARKER_STYLE.to_string(),
        };
        let _ = self.marker.set_attribute("style", &style);
    }

    /// Mirrors the trail onto a pool of dot elements, hiding the unused ones.
    pub fn render_trail(&mut self, trail: &Trail, now: f64) -> Result<(), JsValue> {
        while self.trail_nodes.len() < trail.len() {
            let node = self.doc.create_element("div")?;
            node.set_attribute("class", "lf-trail")?;
            self.root.append_child(&node)?;
            self.trail_nodes.push(node);
        }
        let mut particles = trail.iter();
        for node in &self.trail_nodes {
            let style = match particles.next() {
                Some(p) => format!(
                    "position:absolute; left:0; top:0; width:6px; height:6px; margin:-3px 0 0 -3px; border-radius:50%; background:#ffd166; pointer-events:none; opacity:{:.3}; transform:translate({:.2}px, {:.2}px) scale({:.2});",
                    trail.alpha(p, now),
                    p.pos.x,
                    p.pos.y,
                    p.scale
                ),
                None => "display:none;".to_string(),
            };
            node.set_attribute("style", &style)?;
        }
        Ok(())
    }
}
