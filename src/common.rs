pub mod collections;
pub mod color;
pub mod config;
pub mod log;
