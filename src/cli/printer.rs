//! Terminal rendering of the conversation
//!
//! Every line is prefixed with the speaker's name right-aligned in a
//! 20-column gutter, then `>` for questions or `:` for responses.

use std::io::{self, Write};
use std::sync::Mutex;

use unicode_width::UnicodeWidthStr;

use crate::agent::ConversationLogger;

const WRAP_WIDTH: usize = 80;
const NAME_WIDTH: usize = 20;
const MIN_TEXT_WIDTH: usize = 20;

/// [`ConversationLogger`] printing to stdout
#[derive(Debug, Default)]
pub struct TerminalLogger {
    /// Keeps the lines of one entry together
    lock: Mutex<()>,
}

impl TerminalLogger {
    pub fn new() -> Self {
        Self::default()
    }

    fn print(&self, source: &str, marker: char, text: &str) {
        let lines = format_entry(source, marker, text);
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut stdout = io::stdout().lock();
        for line in lines {
            let _ = writeln!(stdout, "{}", line);
        }
        let _ = stdout.flush();
    }
}

impl ConversationLogger for TerminalLogger {
    fn log_question(&self, source: &str, text: &str) {
        self.print(source, '>', text);
    }

    fn log_response(&self, source: &str, text: &str) {
        self.print(source, ':', text);
    }
}

/// Lay out one log entry: the first line carries the name, the rest is indented
pub fn format_entry(source: &str, marker: char, text: &str) -> Vec<String> {
    let padding = " ".repeat(NAME_WIDTH.saturating_sub(source.width()));
    let first_prefix = format!("{}{}{} ", padding, source, marker);
    let indent = " ".repeat(NAME_WIDTH + 2);
    let text_width = WRAP_WIDTH
        .saturating_sub(first_prefix.width())
        .max(MIN_TEXT_WIDTH);

    wrap(text, text_width)
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                format!("{}{}", first_prefix, line)
            } else {
                format!("{}{}", indent, line)
            }
        })
        .collect()
}

/// Break text at spaces so no line exceeds `width` terminal columns.
///
/// Existing line breaks are kept; a word longer than `width` gets a line of
/// its own.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut line = String::new();
        let mut line_len = 0;

        for word in paragraph.split_whitespace() {
            let word_len = word.width();
            if line_len > 0 && line_len + 1 + word_len > width {
                lines.push(std::mem::take(&mut line));
                line_len = 0;
            }
            if line_len > 0 {
                line.push(' ');
                line_len += 1;
            }
            line.push_str(word);
            line_len += word_len;
        }
        lines.push(line);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_breaks_at_spaces() {
        let lines = wrap("one two three four", 9);
        assert_eq!(lines, vec!["one two", "three", "four"]);
    }

    #[test]
    fn test_wrap_keeps_newlines_and_long_words() {
        let lines = wrap("a\nsupercalifragilistic b", 5);
        assert_eq!(lines, vec!["a", "supercalifragilistic", "b"]);
        assert_eq!(wrap("", 10), vec![""]);
    }

    #[test]
    fn test_wrap_counts_wide_glyphs_as_two_columns() {
        assert_eq!(wrap("日本 語文 書類", 9), vec!["日本 語文", "書類"]);

        let lines = format_entry("B3", ':', &"パスポート ".repeat(20));
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.width() <= WRAP_WIDTH));
    }

    #[test]
    fn test_format_entry_gutter() {
        let lines = format_entry("B3", ':', "Calling ListFiles");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], format!("{}B3: Calling ListFiles", " ".repeat(18)));

        let long = "word ".repeat(30);
        let lines = format_entry("AdminExpert", '>', &long);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.width() <= WRAP_WIDTH));
        assert!(lines[1].starts_with(&" ".repeat(NAME_WIDTH + 2)));
    }
}
