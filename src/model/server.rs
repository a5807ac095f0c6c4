use std::fmt;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::sys::screen::MonitorId;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(u64);

impl WindowId {
    pub fn new(id: u64) -> WindowId { WindowId(id) }

    pub fn get(&self) -> u64 { self.0 }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "window-{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceData {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_special: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowData {
    pub id: WindowId,
    #[serde(default)]
    pub title: String,
    /// Layout position in logical coordinates.
    #[serde(default)]
    pub position: DVec2,
    /// Goal size, i.e. where the window's own size animation will end up.
    pub size: DVec2,
    #[serde(default)]
    pub workspace: Option<WorkspaceData>,
    #[serde(default)]
    pub monitor: Option<MonitorId>,
    #[serde(default = "default_mapped")]
    pub is_mapped: bool,
}

fn default_mapped() -> bool { true }

impl WindowData {
    /// Width over height, bounded so extreme windows still get a usable tile.
    pub fn aspect_ratio(&self) -> f64 { (self.size.x / self.size.y.max(1.0)).clamp(0.1, 5.0) }

    pub fn is_special(&self) -> bool { self.workspace.as_ref().is_some_and(|w| w.is_special) }
}
