//! Live log tail of one instance over server-sent events.

pub mod buffer;
pub mod stream;

pub use buffer::{LogBuffer, LogLevel};
pub use stream::{LogTail, SseEvent, SseParser, TailStatus};
