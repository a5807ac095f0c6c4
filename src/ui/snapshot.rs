use std::time::Instant;

use glam::DVec2;
use tracing::{debug, trace};

use crate::common::collections::VecDeque;
use crate::common::color::Color;
use crate::model::server::WindowId;
use crate::sys::geometry::Rect;
use crate::sys::host::{CaptureError, Host, ImageId};
use crate::sys::screen::MonitorData;
use crate::ui::animation::AnimatedValue;
use crate::ui::element::{DrawCx, Element, UpdateCx};
use crate::ui::scene::ElementBase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Image {
    id: ImageId,
    width: u32,
    height: u32,
}

/// Offscreen copy of a window's surface tree.
#[derive(Debug, Clone)]
pub struct WindowSnapshot {
    window: WindowId,
    image: Option<Image>,
    ready: bool,
    last_captured: Option<Instant>,
    /// Fades the texture in after the first successful capture.
    texture_alpha: AnimatedValue<f64>,
}

impl WindowSnapshot {
    pub fn new(window: WindowId) -> Self {
        Self {
            window,
            image: None,
            ready: false,
            last_captured: None,
            texture_alpha: AnimatedValue::new(0.0),
        }
    }

    pub fn window(&self) -> WindowId { self.window }

    pub fn is_ready(&self) -> bool { self.ready }

    pub fn last_captured(&self) -> Option<Instant> { self.last_captured }

    pub fn image(&self) -> Option<ImageId> { self.image.map(|i| i.id) }

    pub fn texture_alpha(&self) -> f64 { self.texture_alpha.current() }

    /// Renders the window's surface tree, scaled to fit `size`, into the
    /// snapshot's image. The image is only reallocated when the rounded size
    /// changes.
    pub fn capture(
        &mut self,
        size: DVec2,
        monitor: Option<&MonitorData>,
        host: &mut dyn Host,
        now: Instant,
    ) -> Result<(), CaptureError> {
        if host.window(self.window).is_none() {
            return Err(CaptureError::MissingWindow(self.window));
        }
        let monitor = monitor.ok_or(CaptureError::MissingMonitor)?;
        let root = host.visible_surface(self.window).ok_or(CaptureError::MissingSurface(self.window))?;
        let surface_size = host.surface(root).ok_or(CaptureError::MissingSurface(self.window))?.size;
        if surface_size.x < 1.0 || surface_size.y < 1.0 {
            return Err(CaptureError::DegenerateSurface(surface_size));
        }
        if size.x <= 1.0 || size.y <= 1.0 {
            return Err(CaptureError::DegenerateTarget(size));
        }
        let rounded = size.round();
        let (width, height) = (rounded.x as u32, rounded.y as u32);

        let image = match self.image {
            Some(image) if image.width == width && image.height == height => image.id,
            stale => {
                if let Some(stale) = stale {
                    host.free_image(stale.id);
                    self.image = None;
                }
                let id = host.allocate_image(width, height, monitor.format)?;
                debug!(window = %self.window, width, height, "allocated snapshot image");
                self.image = Some(Image { id, width, height });
                id
            }
        };

        host.begin_offscreen(monitor.id, image)?;
        host.clear(Color::BLACK);

        let scale = (size.x / surface_size.x).min(size.y / surface_size.y);
        let mut queue = VecDeque::from([(root, DVec2::ZERO)]);
        while let Some((id, offset)) = queue.pop_front() {
            let Some(surface) = host.surface(id) else { continue };
            if let Some(texture) = surface.texture {
                let dst = surface.extents.scale(scale).translate(offset * scale);
                host.composite(texture, dst);
            }
            queue.extend(surface.children.iter().map(|(child, at)| (*child, offset + *at)));
        }

        host.end_offscreen();

        self.last_captured = Some(now);
        if !self.ready {
            self.ready = true;
            self.texture_alpha.set(1.0, false);
        }
        trace!(window = %self.window, "captured");
        Ok(())
    }

    fn free(&mut self, host: &mut dyn Host) {
        if let Some(image) = self.image.take() {
            host.free_image(image.id);
        }
    }
}

impl Element for WindowSnapshot {
    fn update(&mut self, base: &mut ElementBase, cx: &mut UpdateCx<'_>) {
        base.tick(cx.delta, cx.speed);
        self.texture_alpha.tick(cx.delta, cx.speed);
    }

    fn draw(&self, base: &ElementBase, offset: DVec2, alpha: f64, cx: &mut DrawCx<'_>) {
        let rect = Rect::new(base.pos + offset, base.size);
        let texture = self.image.filter(|_| self.ready).and_then(|i| cx.host.image_texture(i.id));
        match texture {
            Some(texture) => {
                cx.host.render_texture(texture, rect, (alpha * self.texture_alpha.current()) as f32)
            }
            None => {
                trace!(window = %self.window, "no snapshot texture, drawing placeholder");
                let placeholder = cx.style.placeholder;
                cx.host.render_rect(rect, placeholder.fade(alpha as f32), 0);
            }
        }
    }

    fn release(&mut self, host: &mut dyn Host) { self.free(host) }

    fn describe(&self) -> String {
        format!("Snapshot {}{}", self.window, if self.ready { "" } else { " (pending)" })
    }
}
