use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned box in compositor pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: DVec2,
    pub size: DVec2,
}

impl Rect {
    pub const ZERO: Rect = Rect { origin: DVec2::ZERO, size: DVec2::ZERO };

    pub fn new(origin: DVec2, size: DVec2) -> Self { Self { origin, size } }

    pub fn from_xywh(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self::new(DVec2::new(x, y), DVec2::new(w, h))
    }

    pub fn max(&self) -> DVec2 { self.origin + self.size }

    pub fn mid(&self) -> DVec2 { self.origin + self.size / 2.0 }

    pub fn width(&self) -> f64 { self.size.x }

    pub fn height(&self) -> f64 { self.size.y }

    pub fn contains_point(&self, point: DVec2) -> bool {
        point.x >= self.origin.x
            && point.x < self.origin.x + self.size.x
            && point.y >= self.origin.y
            && point.y < self.origin.y + self.size.y
    }

    /// Overlapping region of both boxes, or a zero-sized box at the origin when
    /// they do not overlap.
    pub fn intersection(&self, other: &Rect) -> Rect {
        let min = self.origin.max(other.origin);
        let max = self.max().min(other.max());
        if max.x <= min.x || max.y <= min.y {
            return Rect::ZERO;
        }
        Rect::new(min, max - min)
    }

    pub fn intersects(&self, other: &Rect) -> bool { self.intersection(other).width() > 0.0 }

    pub fn translate(&self, offset: DVec2) -> Rect { Rect::new(self.origin + offset, self.size) }

    /// Scales both the origin and the size, matching how the compositor maps
    /// logical boxes into pixel space.
    pub fn scale(&self, factor: f64) -> Rect { Rect::new(self.origin * factor, self.size * factor) }

    pub fn round(&self) -> Rect { Rect::new(self.origin.round(), self.size.round()) }

    /// True when either axis is too small to hold a single pixel.
    pub fn is_degenerate(&self) -> bool { self.size.x <= 1.0 || self.size.y <= 1.0 }
}
