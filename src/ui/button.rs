use glam::DVec2;
use tracing::{trace, warn};

use crate::common::color::Color;
use crate::sys::geometry::Rect;
use crate::ui::element::{ClickResponse, DrawCx, Element, ElementAction};
use crate::ui::scene::ElementBase;

const HOVER_SCALE: f64 = 1.1;
const IDLE_ALPHA: f64 = 0.8;

#[derive(Debug, Clone)]
pub struct Button {
    color: Color,
    action: Option<ElementAction>,
}

impl Button {
    pub fn new(color: Color, action: Option<ElementAction>) -> Self { Self { color, action } }

    pub fn idle_alpha() -> f64 { IDLE_ALPHA }
}

impl Element for Button {
    fn draw(&self, base: &ElementBase, offset: DVec2, alpha: f64, cx: &mut DrawCx<'_>) {
        trace!("draw button");
        if base.size.x <= 1.0 || base.size.y <= 1.0 {
            warn!(size = ?base.size, "button has invalid size");
            return;
        }
        let rect = Rect::new(base.pos + offset, base.size * base.scale.current());
        cx.host.render_rect(rect, self.color.fade(alpha as f32), 2);
    }

    fn on_hover_changed(&mut self, base: &mut ElementBase) {
        if base.hovered {
            base.scale.set(HOVER_SCALE, false);
            base.alpha.set(1.0, false);
        } else {
            base.scale.set(1.0, false);
            base.alpha.set(IDLE_ALPHA, false);
        }
    }

    fn on_click(&mut self) -> ClickResponse {
        match self.action {
            Some(action) => ClickResponse::Action(action),
            None => ClickResponse::Ignored,
        }
    }

    fn describe(&self) -> String {
        match self.action {
            Some(action) => format!("Button {action:?}"),
            None => "Button".to_string(),
        }
    }
}
