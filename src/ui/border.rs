use glam::DVec2;
use tracing::{trace, warn};

use crate::model::server::WindowId;
use crate::sys::geometry::Rect;
use crate::ui::element::{ClickResponse, DrawCx, Element};
use crate::ui::scene::ElementBase;

/// Outline around a window proxy; the active one uses the active gradient.
#[derive(Debug, Clone)]
pub struct BorderBox {
    window: WindowId,
    pub is_active: bool,
}

impl BorderBox {
    pub fn new(window: WindowId) -> Self { Self { window, is_active: false } }
}

impl Element for BorderBox {
    fn draw(&self, base: &ElementBase, offset: DVec2, alpha: f64, cx: &mut DrawCx<'_>) {
        trace!(window = %self.window, "draw border");
        if base.size.x <= 1.0 || base.size.y <= 1.0 {
            warn!(size = ?base.size, "border has invalid size");
            return;
        }
        let rect = Rect::new(base.pos, base.size).translate(offset).round();
        cx.host.render_border(rect, cx.style.border(self.is_active), alpha as f32);
    }

    fn on_click(&mut self) -> ClickResponse { ClickResponse::Ignored }

    fn describe(&self) -> String {
        format!("Border {}{}", self.window, if self.is_active { " (active)" } else { "" })
    }
}
