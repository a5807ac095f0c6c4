//! Animated alt-tab window carousel.
//!
//! The crate is driven from a compositor's frame loop: the host forwards
//! render, input and window lifecycle notifications to
//! [`actor::carousel::CarouselActor`], which owns the layout/selection engine
//! in [`layout_engine::CarouselManager`]. Everything the engine needs
//! from the compositor goes through the traits in [`sys::host`].

pub mod actor;
pub mod common;
pub mod layout_engine;
pub mod model;
pub mod sys;
pub mod ui;
