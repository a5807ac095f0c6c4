use std::ops::{Add, Mul, Sub};

/// Values that can be interpolated component-wise.
pub trait Animatable: Copy + PartialEq + Add<Output = Self> + Sub<Output = Self> + Mul<f64, Output = Self> {}

impl<T> Animatable for T where T: Copy + PartialEq + Add<Output = T> + Sub<Output = T> + Mul<f64, Output = T> {}

/// Eases `current` from `start` towards `target` as `progress` runs from 0 to
/// 1. Retargeting mid-flight restarts from wherever the value currently is, so
/// motion stays continuous.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimatedValue<T> {
    current: T,
    start: T,
    target: T,
    progress: f64,
}

impl<T: Animatable> AnimatedValue<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: value,
            start: value,
            target: value,
            progress: 1.0,
        }
    }

    pub fn set(&mut self, value: T, snap: bool) {
        if snap {
            self.snap(value);
        } else if value != self.target {
            self.start = self.current;
            self.target = value;
            self.progress = 0.0;
        }
    }

    pub fn snap(&mut self, value: T) {
        self.current = value;
        self.start = value;
        self.target = value;
        self.progress = 1.0;
    }

    /// Advances by `delta` seconds where a full ease takes `duration` seconds.
    pub fn tick(&mut self, delta: f64, duration: f64) {
        if self.progress >= 1.0 {
            self.current = self.target;
            return;
        }
        if duration <= 0.0 || duration.is_nan() {
            self.progress = 1.0;
            self.current = self.target;
            return;
        }
        self.progress = (self.progress + delta.max(0.0) / duration).min(1.0);
        self.current = blend(self.start, self.target, ease(self.progress));
    }

    /// Stops where the value currently is.
    pub fn freeze(&mut self) { self.snap(self.current) }

    pub fn current(&self) -> T { self.current }

    pub fn start(&self) -> T { self.start }

    pub fn target(&self) -> T { self.target }

    pub fn progress(&self) -> f64 { self.progress }

    pub fn is_animating(&self) -> bool { self.progress < 1.0 }
}

impl<T: Animatable + Default> Default for AnimatedValue<T> {
    fn default() -> Self { Self::new(T::default()) }
}

// Quadratic ease-out.
pub fn ease(t: f64) -> f64 { t * (2.0 - t) }

pub fn blend<T: Animatable>(a: T, b: T, s: f64) -> T { a + (b - a) * s }
