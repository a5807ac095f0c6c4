//! The per-window proxy shown in the carousel.
//!
//! A proxy is a rounded [`Container`] node with a title strip on top, the
//! snapshot below it and a border over the whole box. The children are laid
//! out from the container's current size, so they follow it while it
//! animates.

use std::time::Instant;

use glam::DVec2;
use tracing::trace;

use crate::model::server::WindowId;
use crate::sys::geometry::Rect;
use crate::sys::host::{CaptureError, Host};
use crate::sys::screen::MonitorData;
use crate::ui::border::BorderBox;
use crate::ui::button::Button;
use crate::ui::element::{Container, DrawCx, ElementAction, UpdateCx};
use crate::ui::scene::{ClickHit, NodeId, Scene};
use crate::ui::snapshot::WindowSnapshot;
use crate::ui::style::Style;
use crate::ui::text::TextBox;

#[derive(Debug, Clone)]
pub struct WindowContainer {
    window: WindowId,
    node: NodeId,
    header: NodeId,
    snapshot: NodeId,
    border: NodeId,
    close_button: Option<NodeId>,
    /// Size the children were last laid out for.
    laid_out_size: Option<DVec2>,
    /// Last known goal-size aspect ratio of the window.
    aspect: f64,
}

impl WindowContainer {
    pub fn new(scene: &mut Scene, window: WindowId, style: &Style, show_close_button: bool) -> Self {
        let node = scene.insert(None, Container::rounded(format!("Proxy {window}")));
        let header = scene.insert(Some(node), TextBox::new(window));
        let snapshot = scene.insert(Some(node), WindowSnapshot::new(window));
        let border = scene.insert(Some(node), BorderBox::new(window));
        let close_button = show_close_button.then(|| {
            let button = scene.insert(
                Some(node),
                Button::new(style.close_button, Some(ElementAction::CloseWindow(window))),
            );
            if let Some(base) = scene.base_mut(button) {
                base.alpha.snap(Button::idle_alpha());
            }
            button
        });
        let mut proxy = Self {
            window,
            node,
            header,
            snapshot,
            border,
            close_button,
            laid_out_size: None,
            aspect: 1.0,
        };
        proxy.layout_children(scene, style.font_size);
        proxy
    }

    pub fn window(&self) -> WindowId { self.window }

    pub fn node(&self) -> NodeId { self.node }

    pub fn aspect(&self) -> f64 { self.aspect }

    pub fn set_aspect(&mut self, aspect: f64) { self.aspect = aspect; }

    pub fn set_target_layout(&self, scene: &mut Scene, pos: DVec2, size: DVec2, snap: bool) {
        if let Some(base) = scene.base_mut(self.node) {
            base.anim_pos.set(pos, snap);
            base.anim_size.set(size, snap);
            if snap {
                base.pos = pos;
                base.size = size;
            }
        }
    }

    pub fn set_alpha(&self, scene: &mut Scene, alpha: f64, snap: bool) {
        if let Some(base) = scene.base_mut(self.node) {
            base.alpha.set(alpha, snap);
        }
    }

    pub fn set_active(&self, scene: &mut Scene, active: bool) {
        if let Some(border) = scene.kind_mut(self.border).and_then(|k| k.as_border_mut()) {
            border.is_active = active;
        }
    }

    pub fn is_active(&self, scene: &Scene) -> bool {
        scene.kind(self.border).and_then(|k| k.as_border()).is_some_and(|b| b.is_active)
    }

    /// Current box in overlay coordinates.
    pub fn bounds(&self, scene: &Scene) -> Rect { scene.base(self.node).map(|b| b.bounds()).unwrap_or_default() }

    pub fn is_moving(&self, scene: &Scene) -> bool {
        scene.base(self.node).is_some_and(|b| b.anim_pos.is_animating() || b.anim_size.is_animating())
    }

    /// Box the proxy is animating towards.
    pub fn target_bounds(&self, scene: &Scene) -> Rect {
        scene
            .base(self.node)
            .map(|b| Rect::new(b.anim_pos.target(), b.anim_size.target()))
            .unwrap_or_default()
    }

    pub fn target_alpha(&self, scene: &Scene) -> f64 { scene.base(self.node).map_or(0.0, |b| b.alpha.target()) }

    pub fn title(&self, scene: &Scene) -> Option<String> {
        scene.kind(self.header).and_then(|k| k.as_text_box()).map(|t| t.text().to_string())
    }

    pub fn last_captured(&self, scene: &Scene) -> Option<Instant> {
        scene.kind(self.snapshot).and_then(|k| k.as_snapshot()).and_then(|s| s.last_captured())
    }

    pub fn is_ready(&self, scene: &Scene) -> bool {
        scene.kind(self.snapshot).and_then(|k| k.as_snapshot()).is_some_and(|s| s.is_ready())
    }

    pub fn mark_for_removal(&self, scene: &mut Scene) { scene.mark_for_removal(self.node) }

    pub fn should_be_removed(&self, scene: &Scene) -> bool { scene.should_be_removed(self.node) }

    /// Ticks the proxy, re-lays out the children if its size moved, then
    /// updates the children.
    pub fn update(&mut self, scene: &mut Scene, cx: &mut UpdateCx<'_>) {
        scene.tick_node(self.node, cx);
        let size = scene.base(self.node).map(|b| b.size);
        if size.is_some() && size != self.laid_out_size {
            self.layout_children(scene, cx.style.font_size);
        }
        scene.update_children(self.node, cx);
    }

    fn layout_children(&mut self, scene: &mut Scene, font_size: u32) {
        let Some(size) = scene.base(self.node).map(|b| b.size) else {
            return;
        };
        let font = f64::from(font_size);
        let (w, h) = (size.x, size.y);
        let mut place = |id: NodeId, pos: DVec2, size: DVec2| {
            if let Some(base) = scene.base_mut(id) {
                base.place(pos, size);
            }
        };
        place(self.header, DVec2::ZERO, DVec2::new(w, font));
        place(self.snapshot, DVec2::new(0.0, font), DVec2::new(w, (h - font).max(0.0)));
        place(self.border, DVec2::ZERO, size);
        if let Some(button) = self.close_button {
            place(button, DVec2::new((w - font).max(0.0), 0.0), DVec2::splat(font));
        }
        self.laid_out_size = Some(size);
        trace!(window = %self.window, w, h, "laid out proxy children");
    }

    pub fn capture(
        &self,
        scene: &mut Scene,
        monitor: Option<&MonitorData>,
        host: &mut dyn Host,
        now: Instant,
    ) -> Result<(), CaptureError> {
        let size = scene.base(self.snapshot).map(|b| b.size).unwrap_or_default();
        match scene.kind_mut(self.snapshot).and_then(|k| k.as_snapshot_mut()) {
            Some(snapshot) => snapshot.capture(size, monitor, host, now),
            None => Err(CaptureError::MissingSurface(self.window)),
        }
    }

    pub fn draw(&self, scene: &Scene, cx: &mut DrawCx<'_>) { scene.draw(self.node, DVec2::ZERO, cx) }

    pub fn on_mouse_move(&self, scene: &mut Scene, point: DVec2) -> bool { scene.on_mouse_move(self.node, point) }

    pub fn on_mouse_click(&self, scene: &mut Scene, point: DVec2) -> Option<ClickHit> {
        scene.on_mouse_click(self.node, point)
    }

    /// Erases the proxy and frees its image and text texture.
    pub fn destroy(self, scene: &mut Scene, host: &mut dyn Host) { scene.remove_subtree(self.node, host) }

    pub fn debug_tree(&self, scene: &Scene) -> String { scene.render_tree(self.node) }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::common::config::CarouselSettings;
    use crate::model::server::WindowData;
    use crate::sys::headless::{HeadlessHost, HostCall};
    use crate::sys::screen::{MonitorId, PixelFormat};

    fn style() -> Style {
        Style::from_settings(&CarouselSettings { font_size: 20, ..Default::default() })
    }

    fn monitor() -> MonitorData {
        MonitorData {
            id: MonitorId::new(0),
            name: "DP-1".into(),
            position: DVec2::ZERO,
            size: DVec2::new(1920.0, 1080.0),
            scale: 1.0,
            format: PixelFormat::XRGB8888,
            enabled: true,
        }
    }

    fn host() -> HeadlessHost {
        HeadlessHost::new().with_monitor(monitor()).with_window(WindowData {
            id: WindowId::new(1),
            title: "editor".into(),
            position: DVec2::ZERO,
            size: DVec2::new(1600.0, 900.0),
            workspace: None,
            monitor: Some(MonitorId::new(0)),
            is_mapped: true,
        })
    }

    fn tick(proxy: &mut WindowContainer, scene: &mut Scene, host: &mut HeadlessHost, style: &Style, delta: f64) {
        let mut cx = UpdateCx { delta, speed: 1.0, host, style };
        proxy.update(scene, &mut cx);
    }

    fn child_box(scene: &Scene, id: NodeId) -> Rect { scene.base(id).unwrap().bounds() }

    #[test]
    fn children_follow_the_proxy_size() {
        let style = style();
        let mut host = host();
        let mut scene = Scene::new();
        let mut proxy = WindowContainer::new(&mut scene, WindowId::new(1), &style, true);

        proxy.set_target_layout(&mut scene, DVec2::new(100.0, 50.0), DVec2::new(400.0, 300.0), true);
        tick(&mut proxy, &mut scene, &mut host, &style, 0.016);

        assert_eq!(child_box(&scene, proxy.header), Rect::from_xywh(0.0, 0.0, 400.0, 20.0));
        assert_eq!(child_box(&scene, proxy.snapshot), Rect::from_xywh(0.0, 20.0, 400.0, 280.0));
        assert_eq!(child_box(&scene, proxy.border), Rect::from_xywh(0.0, 0.0, 400.0, 300.0));
        assert_eq!(child_box(&scene, proxy.close_button.unwrap()), Rect::from_xywh(380.0, 0.0, 20.0, 20.0));

        proxy.set_target_layout(&mut scene, DVec2::new(100.0, 50.0), DVec2::new(200.0, 100.0), false);
        tick(&mut proxy, &mut scene, &mut host, &style, 0.5);
        let size = proxy.bounds(&scene).size;
        assert!(size.x < 400.0 && size.x > 200.0);
        assert_eq!(child_box(&scene, proxy.border).size, size);
        assert_eq!(child_box(&scene, proxy.snapshot).size.y, size.y - 20.0);
    }

    #[test]
    fn header_picks_up_the_title() {
        let style = style();
        let mut host = host();
        let mut scene = Scene::new();
        let mut proxy = WindowContainer::new(&mut scene, WindowId::new(1), &style, false);
        proxy.set_target_layout(&mut scene, DVec2::ZERO, DVec2::new(400.0, 300.0), true);
        tick(&mut proxy, &mut scene, &mut host, &style, 0.016);
        assert_eq!(proxy.title(&scene).as_deref(), Some("editor"));
        assert!(proxy.close_button.is_none());
    }

    #[test]
    fn capture_uses_the_snapshot_box() {
        let style = style();
        let mut host = host();
        let mut scene = Scene::new();
        let mut proxy = WindowContainer::new(&mut scene, WindowId::new(1), &style, false);
        proxy.set_target_layout(&mut scene, DVec2::ZERO, DVec2::new(400.0, 300.0), true);
        tick(&mut proxy, &mut scene, &mut host, &style, 0.016);

        let now = Instant::now();
        proxy.capture(&mut scene, Some(&monitor()), &mut host, now).unwrap();
        assert!(proxy.is_ready(&scene));
        assert_eq!(proxy.last_captured(&scene), Some(now));
        assert!(host.calls().iter().any(|c| matches!(c, HostCall::AllocateImage { width: 400, height: 280, .. })));
    }

    #[test]
    fn close_button_yields_its_action() {
        let style = style();
        let mut host = host();
        let mut scene = Scene::new();
        let mut proxy = WindowContainer::new(&mut scene, WindowId::new(1), &style, true);
        proxy.set_target_layout(&mut scene, DVec2::new(100.0, 100.0), DVec2::new(400.0, 300.0), true);
        tick(&mut proxy, &mut scene, &mut host, &style, 0.016);

        let hit = proxy.on_mouse_click(&mut scene, DVec2::new(490.0, 110.0)).unwrap();
        assert_eq!(hit.action, Some(ElementAction::CloseWindow(WindowId::new(1))));
        // The snapshot takes the click but carries no action.
        let hit = proxy.on_mouse_click(&mut scene, DVec2::new(200.0, 250.0)).unwrap();
        assert_eq!(hit.node, proxy.snapshot);
        assert_eq!(hit.action, None);
    }

    #[test]
    fn destroy_releases_host_resources() {
        let style = style();
        let mut host = host();
        let mut scene = Scene::new();
        let mut proxy = WindowContainer::new(&mut scene, WindowId::new(1), &style, true);
        proxy.set_target_layout(&mut scene, DVec2::ZERO, DVec2::new(400.0, 300.0), true);
        tick(&mut proxy, &mut scene, &mut host, &style, 0.016);
        proxy.capture(&mut scene, Some(&monitor()), &mut host, Instant::now()).unwrap();
        assert_eq!(host.live_images(), 1);

        proxy.destroy(&mut scene, &mut host);
        assert!(scene.is_empty());
        assert_eq!(host.live_images(), 0);
        assert!(host.calls().iter().any(|c| matches!(c, HostCall::ReleaseTexture(_))));
    }

    #[test]
    fn border_tracks_active_state() {
        let style = style();
        let mut scene = Scene::new();
        let proxy = WindowContainer::new(&mut scene, WindowId::new(1), &style, false);
        assert!(!proxy.is_active(&scene));
        proxy.set_active(&mut scene, true);
        assert!(proxy.is_active(&scene));
        let tree = proxy.debug_tree(&scene);
        assert!(tree.contains("Proxy window-1"));
    }
}
