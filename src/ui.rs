pub mod animation;
pub mod border;
pub mod button;
pub mod capture;
pub mod element;
pub mod scene;
pub mod snapshot;
pub mod style;
pub mod text;
pub mod window_container;
