//! In-memory [`Host`](crate::sys::host::Host) used by tests and the `carousel`
//! harness. It keeps a flat list of windows and monitors, hands out opaque
//! handles, and records every call the engine makes so behavior can be
//! asserted on.

use glam::DVec2;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::common::collections::{HashMap, HashSet};
use crate::common::color::Color;
use crate::model::server::{WindowData, WindowId};
use crate::sys::geometry::Rect;
use crate::sys::host::{
    BorderStyle, CaptureError, CaptureSink, FocusAuthority, FrameScheduler, HookError, HookPoint,
    HookRegistry, ImageId, KEY_EVENT_HOOK, Renderer, SurfaceData, SurfaceId, TextRasterizer, TextTexture,
    TextureId, WindowSource,
};
use crate::sys::screen::{MonitorData, MonitorId, PixelFormat};

#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    AllocateImage { image: ImageId, width: u32, height: u32, format: PixelFormat },
    FreeImage(ImageId),
    BeginOffscreen { monitor: MonitorId, image: ImageId },
    Clear(Color),
    Composite { texture: TextureId, dst: Rect },
    EndOffscreen,
    RenderText { text: String, font_size: u32 },
    ReleaseTexture(TextureId),
    FocusWindow(WindowId),
    WarpCursor(WindowId),
    SimulatePointer(WindowId),
    FocusMonitor(MonitorId),
    CloseWindow(WindowId),
    CursorHidden(bool),
    Rect { rect: Rect, color: Color },
    Texture { texture: TextureId, rect: Rect, alpha: f32 },
    Border { rect: Rect, color: Color, alpha: f32 },
    Backdrop { rect: Rect, color: Color, blur: bool },
    BeginPass { name: &'static str, monitor: MonitorId },
    EndPass,
    RemovePasses(&'static str),
    ScheduleFrame(MonitorId),
    Damage(MonitorId),
    InstallHook(String),
}

/// Serializable description of a desktop, loaded by the harness.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadlessScene {
    pub monitors: Vec<MonitorData>,
    pub windows: Vec<WindowData>,
    pub focused_window: Option<WindowId>,
    pub focused_monitor: Option<MonitorId>,
}

#[derive(Debug, Default)]
pub struct HeadlessHost {
    windows: Vec<WindowData>,
    monitors: Vec<MonitorData>,
    surfaces: HashMap<SurfaceId, SurfaceData>,
    window_surfaces: HashMap<WindowId, SurfaceId>,
    images: HashMap<ImageId, (u32, u32)>,
    textures: HashSet<TextureId>,
    hook_points: Vec<HookPoint>,
    focused_window: Option<WindowId>,
    focused_monitor: Option<MonitorId>,
    cursor_hidden: bool,
    refuse_hooks: bool,
    fail_offscreen: bool,
    next_handle: u64,
    calls: Vec<HostCall>,
}

impl HeadlessHost {
    pub fn new() -> Self { Self::default() }

    pub fn from_scene(scene: HeadlessScene) -> Self {
        let mut host = HeadlessHost::new().with_hook_point(KEY_EVENT_HOOK);
        for monitor in scene.monitors {
            host.add_monitor(monitor);
        }
        for window in scene.windows {
            host.add_window(window);
        }
        if scene.focused_monitor.is_some() {
            host.focused_monitor = scene.focused_monitor;
        }
        host.focused_window = scene.focused_window;
        host
    }

    pub fn with_monitor(mut self, monitor: MonitorData) -> Self {
        self.add_monitor(monitor);
        self
    }

    pub fn with_window(mut self, window: WindowData) -> Self {
        self.add_window(window);
        self
    }

    pub fn with_hook_point(mut self, name: &str) -> Self {
        let address = 0x1000 * (self.hook_points.len() + 1);
        self.hook_points.push(HookPoint {
            name: name.to_string(),
            address,
            signature: format!("{name}(void*, std::any, SP<IKeyboard>)"),
        });
        self
    }

    pub fn refusing_hooks(mut self) -> Self {
        self.refuse_hooks = true;
        self
    }

    pub fn set_offscreen_failure(&mut self, fail: bool) { self.fail_offscreen = fail; }

    /// The first monitor added becomes the focused one.
    pub fn add_monitor(&mut self, monitor: MonitorData) {
        if self.focused_monitor.is_none() {
            self.focused_monitor = Some(monitor.id);
        }
        self.monitors.retain(|m| m.id != monitor.id);
        self.monitors.push(monitor);
    }

    /// Adds a window with a single textured root surface matching its size.
    pub fn add_window(&mut self, window: WindowData) {
        let texture = TextureId::new(self.next_handle());
        self.textures.insert(texture);
        let surface = SurfaceId::new(self.next_handle());
        self.surfaces.insert(surface, SurfaceData {
            size: window.size,
            extents: Rect::new(DVec2::ZERO, window.size),
            texture: Some(texture),
            children: Vec::new(),
        });
        self.window_surfaces.insert(window.id, surface);
        self.windows.retain(|w| w.id != window.id);
        self.windows.push(window);
    }

    /// Attaches a subsurface below `window`'s root at `offset`.
    pub fn add_subsurface(&mut self, window: WindowId, offset: DVec2, size: DVec2, textured: bool) -> Option<SurfaceId> {
        let root = *self.window_surfaces.get(&window)?;
        let texture = textured.then(|| {
            let texture = TextureId::new(self.next_handle());
            self.textures.insert(texture);
            texture
        });
        let child = SurfaceId::new(self.next_handle());
        self.surfaces.insert(child, SurfaceData {
            size,
            extents: Rect::new(DVec2::ZERO, size),
            texture,
            children: Vec::new(),
        });
        self.surfaces.get_mut(&root)?.children.push((child, offset));
        Some(child)
    }

    pub fn remove_window(&mut self, id: WindowId) -> Option<WindowData> {
        let index = self.windows.iter().position(|w| w.id == id)?;
        if let Some(surface) = self.window_surfaces.remove(&id) {
            self.surfaces.remove(&surface);
        }
        if self.focused_window == Some(id) {
            self.focused_window = None;
        }
        Some(self.windows.remove(index))
    }

    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut WindowData> {
        self.windows.iter_mut().find(|w| w.id == id)
    }

    /// Drops the visible surface of `id`, as happens while a window unmaps.
    pub fn detach_surface(&mut self, id: WindowId) { self.window_surfaces.remove(&id); }

    pub fn set_focused_window(&mut self, id: Option<WindowId>) { self.focused_window = id; }

    pub fn set_focused_monitor(&mut self, id: Option<MonitorId>) { self.focused_monitor = id; }

    pub fn cursor_hidden(&self) -> bool { self.cursor_hidden }

    pub fn calls(&self) -> &[HostCall] { &self.calls }

    pub fn take_calls(&mut self) -> Vec<HostCall> { std::mem::take(&mut self.calls) }

    pub fn live_images(&self) -> usize { self.images.len() }

    pub fn image_size(&self, image: ImageId) -> Option<(u32, u32)> { self.images.get(&image).copied() }

    fn next_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn record(&mut self, call: HostCall) {
        trace!(?call, "host");
        self.calls.push(call);
    }
}

impl WindowSource for HeadlessHost {
    fn windows(&self) -> Vec<WindowData> { self.windows.clone() }

    fn window(&self, id: WindowId) -> Option<WindowData> {
        self.windows.iter().find(|w| w.id == id).cloned()
    }

    fn visible_surface(&self, id: WindowId) -> Option<SurfaceId> { self.window_surfaces.get(&id).copied() }

    fn monitors(&self) -> Vec<MonitorData> { self.monitors.clone() }

    fn monitor(&self, id: MonitorId) -> Option<MonitorData> {
        self.monitors.iter().find(|m| m.id == id).cloned()
    }
}

impl CaptureSink for HeadlessHost {
    fn allocate_image(&mut self, width: u32, height: u32, format: PixelFormat) -> Result<ImageId, CaptureError> {
        if width == 0 || height == 0 {
            return Err(CaptureError::Allocation(width, height));
        }
        let image = ImageId::new(self.next_handle());
        self.images.insert(image, (width, height));
        self.record(HostCall::AllocateImage { image, width, height, format });
        Ok(image)
    }

    fn free_image(&mut self, image: ImageId) {
        self.images.remove(&image);
        self.record(HostCall::FreeImage(image));
    }

    fn image_texture(&self, image: ImageId) -> Option<TextureId> {
        // Images double as their own sampling texture.
        self.images.contains_key(&image).then(|| TextureId::new(image.get()))
    }

    fn begin_offscreen(&mut self, monitor: MonitorId, image: ImageId) -> Result<(), CaptureError> {
        if self.fail_offscreen || !self.images.contains_key(&image) {
            return Err(CaptureError::BeginPass(monitor));
        }
        self.record(HostCall::BeginOffscreen { monitor, image });
        Ok(())
    }

    fn clear(&mut self, color: Color) { self.record(HostCall::Clear(color)); }

    fn composite(&mut self, texture: TextureId, dst: Rect) { self.record(HostCall::Composite { texture, dst }); }

    fn end_offscreen(&mut self) { self.record(HostCall::EndOffscreen); }

    fn surface(&self, id: SurfaceId) -> Option<SurfaceData> { self.surfaces.get(&id).cloned() }
}

impl TextRasterizer for HeadlessHost {
    fn render_text(&mut self, text: &str, _color: Color, font_size: u32) -> Option<TextTexture> {
        if text.is_empty() {
            return None;
        }
        let id = TextureId::new(self.next_handle());
        self.textures.insert(id);
        self.record(HostCall::RenderText { text: text.to_string(), font_size });
        let glyph = f64::from(font_size) * 0.6;
        Some(TextTexture {
            id,
            size: DVec2::new(glyph * text.chars().count() as f64, f64::from(font_size)),
        })
    }

    fn release_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
        self.record(HostCall::ReleaseTexture(texture));
    }
}

impl FocusAuthority for HeadlessHost {
    fn focused_window(&self) -> Option<WindowId> { self.focused_window }

    fn focused_monitor(&self) -> Option<MonitorId> { self.focused_monitor }

    fn focus_window(&mut self, window: WindowId) {
        self.focused_window = Some(window);
        if let Some(monitor) = self.window(window).and_then(|w| w.monitor) {
            self.focused_monitor = Some(monitor);
        }
        self.record(HostCall::FocusWindow(window));
    }

    fn warp_cursor_to(&mut self, window: WindowId) { self.record(HostCall::WarpCursor(window)); }

    fn simulate_pointer_motion(&mut self, forced: WindowId) { self.record(HostCall::SimulatePointer(forced)); }

    fn focus_monitor(&mut self, monitor: MonitorId) {
        self.focused_monitor = Some(monitor);
        self.record(HostCall::FocusMonitor(monitor));
    }

    fn close_window(&mut self, window: WindowId) { self.record(HostCall::CloseWindow(window)); }

    fn set_cursor_hidden(&mut self, hidden: bool) {
        self.cursor_hidden = hidden;
        self.record(HostCall::CursorHidden(hidden));
    }
}

impl Renderer for HeadlessHost {
    fn render_rect(&mut self, rect: Rect, color: Color, _rounding: u32) { self.record(HostCall::Rect { rect, color }); }

    fn render_texture(&mut self, texture: TextureId, rect: Rect, alpha: f32) {
        self.record(HostCall::Texture { texture, rect, alpha });
    }

    fn render_border(&mut self, rect: Rect, style: &BorderStyle, alpha: f32) {
        let color = style.gradient.primary();
        self.record(HostCall::Border { rect, color, alpha });
    }

    fn render_backdrop(&mut self, rect: Rect, color: Color, blur: bool) {
        self.record(HostCall::Backdrop { rect, color, blur });
    }

    fn begin_pass(&mut self, name: &'static str, monitor: MonitorId) {
        self.record(HostCall::BeginPass { name, monitor });
    }

    fn end_pass(&mut self) { self.record(HostCall::EndPass); }

    fn remove_passes(&mut self, name: &'static str) { self.record(HostCall::RemovePasses(name)); }
}

impl FrameScheduler for HeadlessHost {
    fn schedule_frame(&mut self, monitor: MonitorId) { self.record(HostCall::ScheduleFrame(monitor)); }

    fn damage_monitor(&mut self, monitor: MonitorId) { self.record(HostCall::Damage(monitor)); }
}

impl HookRegistry for HeadlessHost {
    fn find_hook_points(&self, name: &str) -> Vec<HookPoint> {
        self.hook_points.iter().filter(|p| p.name == name).cloned().collect()
    }

    fn install_hook(&mut self, point: &HookPoint) -> Result<(), HookError> {
        if self.refuse_hooks {
            return Err(HookError::Refused {
                name: point.name.clone(),
                address: point.address,
            });
        }
        self.record(HostCall::InstallHook(point.name.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sys::host::Host;

    fn monitor(id: u32, enabled: bool) -> MonitorData {
        MonitorData {
            id: MonitorId::new(id),
            name: format!("HDMI-{id}"),
            position: DVec2::ZERO,
            size: DVec2::new(1920.0, 1080.0),
            scale: 1.0,
            format: PixelFormat::default(),
            enabled,
        }
    }

    #[test]
    fn first_monitor_is_focused() {
        let host = HeadlessHost::new().with_monitor(monitor(3, true)).with_monitor(monitor(1, true));
        assert_eq!(host.focused_monitor(), Some(MonitorId::new(3)));
    }

    #[test]
    fn damage_all_skips_disabled_monitors() {
        let mut host = HeadlessHost::new().with_monitor(monitor(1, true)).with_monitor(monitor(2, false));
        host.damage_all_monitors();
        assert_eq!(host.calls(), &[HostCall::Damage(MonitorId::new(1))]);
    }

    #[test]
    fn images_are_tracked_until_freed() {
        let mut host = HeadlessHost::new();
        let image = host.allocate_image(10, 20, PixelFormat::XRGB8888).unwrap();
        assert_eq!(host.image_size(image), Some((10, 20)));
        assert!(host.image_texture(image).is_some());
        host.free_image(image);
        assert_eq!(host.live_images(), 0);
        assert!(host.allocate_image(0, 20, PixelFormat::XRGB8888).is_err());
    }
}
