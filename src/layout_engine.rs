mod carousel;
mod command;
mod graph;
mod render_list;

pub use carousel::{CarouselManager, FrameContext, ProxyLayout};
pub use command::{CarouselCommand, command_for_key};
pub use graph::{Direction, Orientation};
pub use render_list::{BACKDROP_PASS, CAROUSEL_PASS, render_order};
