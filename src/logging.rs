use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

const MAX_LOG_ENTRIES: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub component: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl LogEntry {
    pub fn new(level: LogLevel, component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            component: component.into(),
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, ctx: serde_json::Value) -> Self {
        self.context = Some(ctx);
        self
    }
}

/// Ring-buffer logger that persists to JSONL.
pub struct Logger {
    entries: VecDeque<LogEntry>,
    writer: BufWriter<File>,
}

impl Logger {
    pub fn new(file_path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file_path = file_path.as_ref();

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut entries = VecDeque::with_capacity(MAX_LOG_ENTRIES);

        if file_path.exists() {
            let reader = BufReader::new(File::open(file_path)?);
            for line in reader.lines().map_while(std::result::Result::ok) {
                if let Ok(entry) = serde_json::from_str::<LogEntry>(&line) {
                    if entries.len() >= MAX_LOG_ENTRIES {
                        entries.pop_front();
                    }
                    entries.push_back(entry);
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;

        Ok(Self {
            entries,
            writer: BufWriter::new(file),
        })
    }

    pub fn log(&mut self, entry: LogEntry) {
        if let Ok(json) = serde_json::to_string(&entry) {
            let _ = writeln!(self.writer, "{}", json);
            let _ = self.writer.flush();
        }
        if self.entries.len() >= MAX_LOG_ENTRIES {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }
}

/// Cloneable handle to the request log. Debug entries are dropped unless
/// debug logging was enabled at construction.
#[derive(Clone)]
pub struct SharedLogger {
    inner: Arc<Mutex<Logger>>,
    debug_enabled: bool,
}

impl SharedLogger {
    pub fn new(file_path: impl AsRef<Path>, debug_enabled: bool) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(Mutex::new(Logger::new(file_path)?)),
            debug_enabled,
        })
    }

    pub fn log(&self, entry: LogEntry) {
        if entry.level == LogLevel::Debug && !self.debug_enabled {
            return;
        }
        if let Ok(mut logger) = self.inner.lock() {
            logger.log(entry);
        }
    }

    pub fn info(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Info, component, message));
    }

    pub fn warn(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Warn, component, message));
    }

    pub fn error(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Error, component, message));
    }

    pub fn debug(&self, component: impl Into<String>, message: impl Into<String>) {
        self.log(LogEntry::new(LogLevel::Debug, component, message));
    }

    pub fn log_with_context(
        &self,
        level: LogLevel,
        component: impl Into<String>,
        message: impl Into<String>,
        context: serde_json::Value,
    ) {
        self.log(LogEntry::new(level, component, message).with_context(context));
    }

    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        self.inner.lock().map(|l| l.recent(limit)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_entries_gated() {
        let dir = tempfile::tempdir().unwrap();

        let quiet = SharedLogger::new(dir.path().join("quiet.log"), false).unwrap();
        quiet.debug("stream", "hidden");
        quiet.info("stream", "shown");
        let entries = quiet.recent(10);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "shown");

        let verbose = SharedLogger::new(dir.path().join("verbose.log"), true).unwrap();
        verbose.debug("stream", "visible");
        assert_eq!(verbose.recent(10)[0].level, LogLevel::Debug);
    }

    #[test]
    fn test_entries_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("proxy.log");

        {
            let logger = SharedLogger::new(&path, false).unwrap();
            logger.warn("server", "first");
            logger.log_with_context(
                LogLevel::Info,
                "server",
                "second",
                serde_json::json!({"model": "glm-4.5"}),
            );
        }

        let reopened = SharedLogger::new(&path, false).unwrap();
        let recent = reopened.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "second");
        assert_eq!(recent[0].context.as_ref().unwrap()["model"], "glm-4.5");
        assert_eq!(recent[1].level, LogLevel::Warn);
    }
}
