//! Actors own a piece of state and are driven by events. Each event travels
//! with the span it was sent from so handler logs nest under the sender.

use tracing::Span;

pub mod carousel;

pub type Sender<E> = crossbeam_channel::Sender<(Span, E)>;
pub type Receiver<E> = crossbeam_channel::Receiver<(Span, E)>;

pub fn channel<E>() -> (Sender<E>, Receiver<E>) { crossbeam_channel::unbounded() }

/// Returns false if the receiving actor is gone.
pub fn send<E>(tx: &Sender<E>, event: E) -> bool { tx.send((Span::current(), event)).is_ok() }
