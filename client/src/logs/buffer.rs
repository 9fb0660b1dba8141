use std::collections::VecDeque;

/// Coarse severity classes recognized in raw server log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
}

impl LogLevel {
    /// Classifies by the marker substrings Minecraft servers actually
    /// print. Anything unrecognized counts as info.
    pub fn classify(line: &str) -> Self {
        if line.contains("ERROR") || line.contains("SEVERE") {
            LogLevel::Error
        } else if line.contains("WARN") || line.contains("WARNING") {
            LogLevel::Warn
        } else {
            LogLevel::Info
        }
    }
}

/// Bounded window over the tail of a log stream. Oldest lines fall off
/// first once the cap is reached.
pub struct LogBuffer {
    lines: VecDeque<String>,
    cap: usize,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(500)
    }
}

impl LogBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(cap),
            cap,
        }
    }

    pub fn push(&mut self, line: String) {
        if self.lines.len() == self.cap {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// View with the detail pane's filters applied: an optional severity
    /// cutoff by exact class and an optional case-insensitive text match.
    pub fn filtered(&self, level: Option<LogLevel>, search: Option<&str>) -> Vec<&str> {
        let needle = search.map(str::to_lowercase);
        self.lines
            .iter()
            .filter(|line| match level {
                Some(level) => LogLevel::classify(line) == level,
                None => true,
            })
            .filter(|line| match &needle {
                Some(needle) => line.to_lowercase().contains(needle),
                None => true,
            })
            .map(String::as_str)
            .collect()
    }
}
