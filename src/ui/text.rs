use glam::DVec2;
use tracing::{trace, warn};

use crate::model::server::WindowId;
use crate::sys::geometry::Rect;
use crate::sys::host::{Host, TextTexture};
use crate::ui::element::{DrawCx, Element, UpdateCx};
use crate::ui::scene::ElementBase;

const MIN_BUDGET: usize = 5;
const ELLIPSIS: &str = "...";

/// Shortens `text` to at most `max(max_len, 5)` characters by cutting out the
/// middle. Counts characters, so multi-byte text is never split mid-codepoint.
pub fn middle_truncate(text: &str, max_len: usize) -> String {
    let budget = max_len.max(MIN_BUDGET);
    let len = text.chars().count();
    if len <= budget {
        return text.to_string();
    }
    let side = (budget - ELLIPSIS.len()) / 2;
    let head: String = text.chars().take(side).collect();
    let tail: String = text.chars().skip(len - side).collect();
    format!("{head}{ELLIPSIS}{tail}")
}

/// How many characters fit in `width` pixels at `font_size`.
pub fn budget_for_width(width: f64, font_size: u32) -> usize {
    let glyph = (f64::from(font_size) * 0.6).max(1.0);
    (width / glyph).max(0.0).floor() as usize
}

/// Window title strip above a snapshot.
#[derive(Debug, Clone)]
pub struct TextBox {
    window: WindowId,
    /// Title the current `text` was derived from.
    last_title: Option<String>,
    text: String,
    texture: Option<TextTexture>,
}

impl TextBox {
    pub fn new(window: WindowId) -> Self {
        Self {
            window,
            last_title: None,
            text: String::new(),
            texture: None,
        }
    }

    pub fn text(&self) -> &str { &self.text }

    pub fn texture(&self) -> Option<TextTexture> { self.texture }

    fn refresh_text(&mut self, width: f64, cx: &mut UpdateCx<'_>) {
        let Some(window) = cx.host.window(self.window) else {
            return;
        };
        if self.last_title.as_deref() == Some(window.title.as_str()) {
            return;
        }
        let text = middle_truncate(&window.title, budget_for_width(width, cx.style.font_size));
        self.last_title = Some(window.title);
        if text == self.text && self.texture.is_some() {
            return;
        }
        self.text = text;
        self.release_texture(cx.host);
        self.texture = cx.host.render_text(&self.text, cx.style.title_color, cx.style.font_size);
        trace!(window = %self.window, text = %self.text, "title rasterized");
    }

    fn release_texture(&mut self, host: &mut dyn Host) {
        if let Some(texture) = self.texture.take() {
            host.release_texture(texture.id);
        }
    }
}

impl Element for TextBox {
    fn update(&mut self, base: &mut ElementBase, cx: &mut UpdateCx<'_>) {
        base.tick(cx.delta, cx.speed);
        if base.size.x <= 1.0 || base.size.y <= 1.0 {
            return;
        }
        self.refresh_text(base.size.x, cx);
    }

    fn draw(&self, base: &ElementBase, offset: DVec2, alpha: f64, cx: &mut DrawCx<'_>) {
        if base.size.x <= 1.0 || base.size.y <= 1.0 {
            warn!(size = ?base.size, "text box has invalid size");
            return;
        }
        let origin = base.pos + offset;
        let background = cx.style.header_background;
        cx.host.render_rect(Rect::new(origin, base.size), background.fade(alpha as f32), 0);
        let Some(texture) = self.texture else {
            trace!(window = %self.window, "no title texture");
            return;
        };
        if texture.size.y <= 0.0 {
            return;
        }
        let scale = base.size.y / texture.size.y;
        let width = texture.size.x * scale;
        let center = ((base.size.x - width) / 2.0).max(0.0);
        let rect = Rect::from_xywh(origin.x + center, origin.y, width, base.size.y);
        cx.host.render_texture(texture.id, rect, alpha as f32);
    }

    fn release(&mut self, host: &mut dyn Host) { self.release_texture(host) }

    fn describe(&self) -> String { format!("Title {} {:?}", self.window, self.text) }
}
