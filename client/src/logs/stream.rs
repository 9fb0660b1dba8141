use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use futures::StreamExt;
use log::{debug, info, warn};
use tokio::select;
use tokio::sync::Notify;

use super::buffer::LogBuffer;
use crate::utils::backoff::{Backoff, ReconnectPolicy};
use crate::utils::Event;

/// One parsed server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Incremental parser over an SSE byte stream fed in arbitrary chunks.
///
/// Events are terminated by a blank line; `data:` lines accumulate and join
/// with newlines; an absent `event:` field means the default "message"
/// type. Comment lines (leading colon) and unknown fields are skipped.
#[derive(Debug, Default)]
pub struct SseParser {
    pending: String,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every event it completed.
    pub fn feed(&mut self, chunk: &str) -> Vec<SseEvent> {
        self.pending.push_str(chunk);
        let mut events = Vec::new();

        // Only consume up to the last complete line; a partial line stays
        // pending until the next chunk.
        while let Some(newline) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=newline).collect();
            let line = line.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                if let Some(event) = self.flush() {
                    events.push(event);
                }
            } else {
                self.field(line);
            }
        }
        events
    }

    fn field(&mut self, line: &str) {
        if line.starts_with(':') {
            return;
        }
        let (name, value) = match line.split_once(':') {
            Some((name, value)) => (name, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match name {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
    }

    fn flush(&mut self) -> Option<SseEvent> {
        if self.event.is_none() && self.data.is_empty() {
            return None;
        }
        let event = self.event.take().unwrap_or_else(|| "message".to_string());
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent { event, data })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailStatus {
    Connected,
    Disconnected,
    GaveUp,
}

/// Follows one instance's log endpoint, keeping the bounded buffer current
/// and fanning each line out to listeners.
///
/// Detaching is advisory: an in-flight request is not aborted, the loop
/// simply stops consuming and later chunks are dropped with the stream.
pub struct LogTail {
    http: reqwest::Client,
    url: String,
    policy: ReconnectPolicy,
    pub buffer: Mutex<LogBuffer>,
    shutdown: Notify,
    stopping: AtomicBool,
    pub lines: Event<String>,
    pub status: Event<TailStatus>,
}

impl LogTail {
    pub fn new(http: reqwest::Client, url: impl Into<String>, policy: ReconnectPolicy) -> Self {
        Self {
            http,
            url: url.into(),
            policy,
            buffer: Mutex::new(LogBuffer::default()),
            shutdown: Notify::new(),
            stopping: AtomicBool::new(false),
            lines: Event::new(),
            status: Event::new(),
        }
    }

    pub fn detach(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.shutdown.notify_waiters();
    }

    /// Consume/reconnect loop, same shape as the push channel: bounded
    /// backoff between attempts, terminal give-up once the budget is spent.
    pub async fn run(&self) {
        let mut backoff = Backoff::new(self.policy.clone());
        loop {
            if self.stopping.load(Ordering::SeqCst) {
                return;
            }
            match self.consume(&mut backoff).await {
                Ok(()) => return,
                Err(e) => warn!("log stream lost: {}", e),
            }
            self.status.emit(TailStatus::Disconnected);

            let delay = match backoff.next_delay() {
                Some(delay) => delay,
                None => {
                    warn!("log stream gave up after {} attempts", backoff.attempt());
                    self.status.emit(TailStatus::GaveUp);
                    return;
                }
            };
            debug!("log stream reconnect in {:?}", delay);
            select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.shutdown.notified() => return,
            }
        }
    }

    async fn consume(&self, backoff: &mut Backoff) -> anyhow::Result<()> {
        let resp = self.http.get(&self.url).send().await?.error_for_status()?;
        info!("log stream connected to {}", self.url);
        self.status.emit(TailStatus::Connected);
        backoff.reset();

        let mut parser = SseParser::new();
        let mut chunks = resp.bytes_stream();
        loop {
            select! {
                chunk = chunks.next() => {
                    let chunk = match chunk {
                        Some(chunk) => chunk?,
                        None => return Err(anyhow::anyhow!("log stream ended")),
                    };
                    for event in parser.feed(&String::from_utf8_lossy(&chunk)) {
                        self.handle(event);
                    }
                }
                _ = self.shutdown.notified() => return Ok(()),
            }
        }
    }

    fn handle(&self, event: SseEvent) {
        if event.event != "log" {
            debug!("ignoring sse event type {:?}", event.event);
            return;
        }
        self.buffer.lock().unwrap().push(event.data.clone());
        self.lines.emit(event.data);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn events_split_across_chunks_reassemble() {
        let mut parser = SseParser::new();
        assert!(parser.feed("event: log\ndata: [INFO]: Serv").is_empty());
        let events = parser.feed("er started\n\n");
        assert_eq!(
            events,
            vec![SseEvent {
                event: "log".into(),
                data: "[INFO]: Server started".into(),
            }]
        );
    }

    #[test]
    fn one_chunk_may_complete_several_events() {
        let mut parser = SseParser::new();
        let events = parser.feed("event: log\ndata: a\n\nevent: log\ndata: b\n\n");
        let data: Vec<&str> = events.iter().map(|e| e.data.as_str()).collect();
        assert_eq!(data, vec!["a", "b"]);
    }

    #[test]
    fn untyped_events_default_to_message() {
        let mut parser = SseParser::new();
        let events = parser.feed("data: keepalive\n\n");
        assert_eq!(events[0].event, "message");
    }

    #[test]
    fn comments_and_blank_keepalives_produce_nothing() {
        let mut parser = SseParser::new();
        assert!(parser.feed(": ping\n\n\n").is_empty());
    }

    #[test]
    fn multi_line_data_joins_with_newlines() {
        let mut parser = SseParser::new();
        let events = parser.feed("event: log\ndata: first\ndata: second\n\n");
        assert_eq!(events[0].data, "first\nsecond");
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let mut parser = SseParser::new();
        let events = parser.feed("event: log\r\ndata: line\r\n\r\n");
        assert_eq!(
            events,
            vec![SseEvent {
                event: "log".into(),
                data: "line".into(),
            }]
        );
    }
}
