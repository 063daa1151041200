//! Conversation logging hook
//!
//! The orchestration loop reports questions, responses and capability calls
//! through [`ConversationLogger`] without knowing where they end up.

use std::sync::Mutex;

use tracing::info;

/// Observer of the flow between an agent, its delegates and its capabilities.
///
/// Implementations must return quickly and never affect control flow.
pub trait ConversationLogger: Send + Sync {
    /// Something was asked of `source`
    fn log_question(&self, source: &str, text: &str);
    /// `source` produced something
    fn log_response(&self, source: &str, text: &str);
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl ConversationLogger for NullLogger {
    fn log_question(&self, _source: &str, _text: &str) {}
    fn log_response(&self, _source: &str, _text: &str) {}
}

/// Forwards the conversation to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl ConversationLogger for TracingLogger {
    fn log_question(&self, source: &str, text: &str) {
        info!(target: "b3::conversation", source, "> {}", text);
    }

    fn log_response(&self, source: &str, text: &str) {
        info!(target: "b3::conversation", source, ": {}", text);
    }
}

/// Kind of a recorded log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Question,
    Response,
}

/// A recorded log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub kind: LogKind,
    pub source: String,
    pub text: String,
}

/// Keeps every line in memory, in order
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded lines
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Recorded texts only, handy for assertions
    pub fn texts(&self) -> Vec<String> {
        self.entries().into_iter().map(|e| e.text).collect()
    }

    fn push(&self, kind: LogKind, source: &str, text: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(LogEntry {
                kind,
                source: source.to_string(),
                text: text.to_string(),
            });
    }
}

impl ConversationLogger for MemoryLogger {
    fn log_question(&self, source: &str, text: &str) {
        self.push(LogKind::Question, source, text);
    }

    fn log_response(&self, source: &str, text: &str) {
        self.push(LogKind::Response, source, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_logger_keeps_order() {
        let logger = MemoryLogger::new();
        logger.log_question("B3", "list my files");
        logger.log_response("B3", "Calling ListFiles");

        let entries = logger.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, LogKind::Question);
        assert_eq!(entries[1].source, "B3");
        assert_eq!(logger.texts()[1], "Calling ListFiles");
    }
}
