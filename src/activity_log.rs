use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use time::{OffsetDateTime, UtcOffset};

const LOG_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn label(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

/// Recent events in memory, mirrored line by line to a log file.
#[derive(Debug)]
pub struct ActivityLog {
    entries: Vec<LogEntry>,
    path: Option<PathBuf>,
    pub scroll: usize,
}

impl ActivityLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            entries: Vec::new(),
            path: Some(path),
            scroll: 0,
        }
    }

    /// Keeps entries in memory only.
    #[cfg(test)]
    pub fn detached() -> Self {
        Self {
            entries: Vec::new(),
            path: None,
            scroll: 0,
        }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn info(&mut self, message: String) {
        self.push(LogLevel::Info, message);
    }

    pub fn warn(&mut self, message: String) {
        self.push(LogLevel::Warn, message);
    }

    pub fn error(&mut self, message: String) {
        self.push(LogLevel::Error, message);
    }

    pub fn push(&mut self, level: LogLevel, message: String) {
        if self.scroll > 0 {
            self.scroll = self.scroll.saturating_add(1);
        }

        if let Some(path) = &self.path {
            let _ = append_log_file(path, level, &message);
        }
        self.entries.push(LogEntry { level, message });

        if self.entries.len() > LOG_CAPACITY {
            let overflow = self.entries.len() - LOG_CAPACITY;
            self.entries.drain(0..overflow);
            self.scroll = self.scroll.saturating_sub(overflow);
        }
    }

    pub fn scroll_up(&mut self, lines: usize) {
        let max = self.entries.len().saturating_sub(1);
        self.scroll = self.scroll.saturating_add(lines).min(max);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    /// The entries visible in a panel `height` rows tall, oldest first.
    /// A scroll past the oldest entry pins the window to the top.
    pub fn window(&self, height: usize) -> &[LogEntry] {
        let total = self.entries.len();
        let height = height.min(total);
        let end = total - self.scroll.min(total - height);
        &self.entries[end - height..end]
    }
}

fn append_log_file(path: &Path, level: LogLevel, message: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "[{}] [{}] {message}", log_timestamp(), level.label())
}

fn log_timestamp() -> String {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetDateTime::now_utc()
        .to_offset(offset)
        .format(time::macros::format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .unwrap_or_default()
}
