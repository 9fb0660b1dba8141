pub mod backoff;
pub mod event;

pub use backoff::{Backoff, ReconnectPolicy};
pub use event::Event;
