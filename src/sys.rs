pub mod event;
pub mod geometry;
pub mod headless;
pub mod host;
pub mod hotkey;
pub mod screen;
