//! Compositor collaborators.
//!
//! The carousel never talks to a compositor directly. Everything it needs
//! (window enumeration, offscreen capture, text rasterization, focus, drawing
//! and frame scheduling) goes through these traits, which a compositor plugin
//! implements over its own APIs and [`crate::sys::headless::HeadlessHost`]
//! implements in memory.

use std::fmt;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::common::color::{Color, Gradient};
use crate::model::server::{WindowData, WindowId};
use crate::sys::geometry::Rect;
use crate::sys::screen::{MonitorData, MonitorId, PixelFormat};

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub fn new(raw: u64) -> Self { Self(raw) }

            pub fn get(&self) -> u64 { self.0 }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}#{}", stringify!($name), self.0) }
        }
    };
}

handle!(
    /// An offscreen framebuffer owned by the capture sink.
    ImageId
);
handle!(TextureId);
handle!(
    /// A node in a window's surface tree.
    SurfaceId
);

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceData {
    /// Viewporter-corrected size of the surface.
    pub size: DVec2,
    /// Region the surface covers, relative to its own origin.
    pub extents: Rect,
    pub texture: Option<TextureId>,
    /// Child surfaces with their offsets relative to this surface.
    pub children: Vec<(SurfaceId, DVec2)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextTexture {
    pub id: TextureId,
    pub size: DVec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BorderStyle {
    pub gradient: Gradient,
    pub size: u32,
    pub rounding: u32,
    pub rounding_power: f64,
}

/// Function the carousel hooks to see keys before clients do.
pub const KEY_EVENT_HOOK: &str = "onKeyEvent";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookPoint {
    pub name: String,
    pub address: usize,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CaptureError {
    #[error("window {0} is gone")]
    MissingWindow(WindowId),
    #[error("no monitor to capture against")]
    MissingMonitor,
    #[error("window {0} has no visible surface")]
    MissingSurface(WindowId),
    #[error("surface size {0} is degenerate")]
    DegenerateSurface(DVec2),
    #[error("target size {0} is degenerate")]
    DegenerateTarget(DVec2),
    #[error("failed to allocate a {0}x{1} image")]
    Allocation(u32, u32),
    #[error("offscreen pass against {0} could not begin")]
    BeginPass(MonitorId),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookError {
    #[error("hook point {name} at {address:#x} refused installation")]
    Refused { name: String, address: usize },
}

pub trait WindowSource {
    /// Every window the compositor knows about, mapped or not, in stacking
    /// order.
    fn windows(&self) -> Vec<WindowData>;

    fn window(&self, id: WindowId) -> Option<WindowData>;

    fn visible_surface(&self, id: WindowId) -> Option<SurfaceId>;

    fn monitors(&self) -> Vec<MonitorData>;

    fn monitor(&self, id: MonitorId) -> Option<MonitorData>;
}

pub trait CaptureSink {
    fn allocate_image(&mut self, width: u32, height: u32, format: PixelFormat) -> Result<ImageId, CaptureError>;

    fn free_image(&mut self, image: ImageId);

    fn image_texture(&self, image: ImageId) -> Option<TextureId>;

    fn begin_offscreen(&mut self, monitor: MonitorId, image: ImageId) -> Result<(), CaptureError>;

    fn clear(&mut self, color: Color);

    /// Draws `texture` into the current offscreen target.
    fn composite(&mut self, texture: TextureId, dst: Rect);

    fn end_offscreen(&mut self);

    fn surface(&self, id: SurfaceId) -> Option<SurfaceData>;
}

pub trait TextRasterizer {
    fn render_text(&mut self, text: &str, color: Color, font_size: u32) -> Option<TextTexture>;

    fn release_texture(&mut self, texture: TextureId);
}

pub trait FocusAuthority {
    fn focused_window(&self) -> Option<WindowId>;

    fn focused_monitor(&self) -> Option<MonitorId>;

    /// Full focus transfer: keyboard focus, raise, workspace switch.
    fn focus_window(&mut self, window: WindowId);

    fn warp_cursor_to(&mut self, window: WindowId);

    /// Re-run pointer focus as though the pointer moved, with `forced` taking
    /// precedence over whatever is under the cursor.
    fn simulate_pointer_motion(&mut self, forced: WindowId);

    /// Moves monitor focus without touching window focus.
    fn focus_monitor(&mut self, monitor: MonitorId);

    fn close_window(&mut self, window: WindowId);

    fn set_cursor_hidden(&mut self, hidden: bool);
}

pub trait Renderer {
    fn render_rect(&mut self, rect: Rect, color: Color, rounding: u32);

    fn render_texture(&mut self, texture: TextureId, rect: Rect, alpha: f32);

    fn render_border(&mut self, rect: Rect, style: &BorderStyle, alpha: f32);

    /// Dims (and optionally blurs) everything below the overlay.
    fn render_backdrop(&mut self, rect: Rect, color: Color, blur: bool);

    fn begin_pass(&mut self, name: &'static str, monitor: MonitorId);

    fn end_pass(&mut self);

    fn remove_passes(&mut self, name: &'static str);
}

pub trait FrameScheduler {
    fn schedule_frame(&mut self, monitor: MonitorId);

    fn damage_monitor(&mut self, monitor: MonitorId);
}

/// Everything the carousel needs from the compositor during a frame.
pub trait Host: WindowSource + CaptureSink + TextRasterizer + FocusAuthority + Renderer + FrameScheduler {
    fn damage_all_monitors(&mut self) {
        for monitor in self.monitors() {
            if monitor.enabled {
                self.damage_monitor(monitor.id);
            }
        }
    }
}

impl<T> Host for T where T: WindowSource + CaptureSink + TextRasterizer + FocusAuthority + Renderer + FrameScheduler {}

/// Function hooking, only needed while wiring the carousel into the
/// compositor's key handler.
pub trait HookRegistry {
    fn find_hook_points(&self, name: &str) -> Vec<HookPoint>;

    fn install_hook(&mut self, point: &HookPoint) -> Result<(), HookError>;
}
