use std::fmt;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::sys::geometry::Rect;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct MonitorId(u32);

impl MonitorId {
    pub fn new(id: u32) -> MonitorId { MonitorId(id) }

    pub fn get(&self) -> u32 { self.0 }
}

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "monitor-{}", self.0) }
}

/// DRM fourcc code of a monitor's output buffers. Offscreen images are
/// allocated in the same format so they can be sampled without conversion.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PixelFormat(pub u32);

impl PixelFormat {
    pub const XRGB8888: PixelFormat = PixelFormat(fourcc(b"XR24"));
    pub const ARGB8888: PixelFormat = PixelFormat(fourcc(b"AR24"));
}

impl Default for PixelFormat {
    fn default() -> Self { PixelFormat::XRGB8888 }
}

const fn fourcc(code: &[u8; 4]) -> u32 {
    (code[0] as u32) | (code[1] as u32) << 8 | (code[2] as u32) << 16 | (code[3] as u32) << 24
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorData {
    pub id: MonitorId,
    #[serde(default)]
    pub name: String,
    /// Layout position in logical coordinates.
    #[serde(default)]
    pub position: DVec2,
    /// Logical size; multiply by `scale` for pixels.
    pub size: DVec2,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub format: PixelFormat,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_scale() -> f64 { 1.0 }

fn default_enabled() -> bool { true }

impl MonitorData {
    /// Output size in physical pixels.
    pub fn pixel_size(&self) -> DVec2 { (self.size * self.scale).round() }

    /// The region the overlay draws into. The carousel pass renders in
    /// monitor-local pixels, so the origin is always zero.
    pub fn overlay_bounds(&self) -> Rect { Rect::new(DVec2::ZERO, self.pixel_size()) }

    /// Position and size in the global pixel space.
    pub fn global_bounds(&self) -> Rect { Rect::new(self.position, self.size).scale(self.scale) }
}
