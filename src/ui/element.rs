use enum_dispatch::enum_dispatch;
use glam::DVec2;
use tracing::trace;

use crate::model::server::WindowId;
use crate::sys::host::Host;
use crate::ui::border::BorderBox;
use crate::ui::button::Button;
use crate::ui::scene::ElementBase;
use crate::ui::snapshot::WindowSnapshot;
use crate::ui::style::Style;
use crate::ui::text::TextBox;

pub struct UpdateCx<'a> {
    /// Seconds since the previous frame.
    pub delta: f64,
    /// Seconds for one full ease.
    pub speed: f64,
    pub host: &'a mut dyn Host,
    pub style: &'a Style,
}

pub struct DrawCx<'a> {
    pub host: &'a mut dyn Host,
    pub style: &'a Style,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementAction {
    CloseWindow(WindowId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickResponse {
    /// The point is inside but the element does not take clicks.
    Ignored,
    Hit,
    Action(ElementAction),
}

#[enum_dispatch]
pub trait Element {
    fn update(&mut self, base: &mut ElementBase, cx: &mut UpdateCx<'_>) { base.tick(cx.delta, cx.speed) }

    /// Draws at `base.pos + offset` with the absolute opacity `alpha`.
    fn draw(&self, base: &ElementBase, offset: DVec2, alpha: f64, cx: &mut DrawCx<'_>);

    fn on_hover_changed(&mut self, base: &mut ElementBase) {
        trace!(hovered = base.hovered, "hover changed");
    }

    fn on_click(&mut self) -> ClickResponse { ClickResponse::Hit }

    /// Frees host resources before the element is erased.
    fn release(&mut self, _host: &mut dyn Host) {}

    fn is_container(&self) -> bool { false }

    fn describe(&self) -> String;
}

#[enum_dispatch(Element)]
#[derive(Debug)]
pub enum ElementKind {
    Container,
    WindowSnapshot,
    TextBox,
    BorderBox,
    Button,
}

impl ElementKind {
    pub fn as_snapshot(&self) -> Option<&WindowSnapshot> {
        match self {
            ElementKind::WindowSnapshot(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_snapshot_mut(&mut self) -> Option<&mut WindowSnapshot> {
        match self {
            ElementKind::WindowSnapshot(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_text_box(&self) -> Option<&TextBox> {
        match self {
            ElementKind::TextBox(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_border(&self) -> Option<&BorderBox> {
        match self {
            ElementKind::BorderBox(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_border_mut(&mut self) -> Option<&mut BorderBox> {
        match self {
            ElementKind::BorderBox(b) => Some(b),
            _ => None,
        }
    }
}

/// Groups children; draws nothing itself.
#[derive(Debug, Clone)]
pub struct Container {
    label: String,
    /// Snap the draw offset to whole pixels before forwarding it.
    round_offset: bool,
}

impl Container {
    pub fn new(label: impl Into<String>) -> Self { Self { label: label.into(), round_offset: false } }

    pub fn rounded(label: impl Into<String>) -> Self { Self { label: label.into(), round_offset: true } }

    pub fn child_offset(&self, base: &ElementBase, offset: DVec2) -> DVec2 {
        let offset = if self.round_offset { offset.round() } else { offset };
        offset + base.pos
    }
}

impl Element for Container {
    fn draw(&self, _base: &ElementBase, _offset: DVec2, _alpha: f64, _cx: &mut DrawCx<'_>) {}

    fn is_container(&self) -> bool { true }

    fn describe(&self) -> String { self.label.clone() }
}
