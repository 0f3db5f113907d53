//! UI-agnostic conversation log
//!
//! This module holds the ordered chat log (messages and report links) and the
//! welcome placeholder shown before anything has happened. Front ends render
//! from these types and never keep their own copy of the chat.

use serde::{Deserialize, Serialize};

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    User,
    Bot,
}

/// A single chat message. Never edited or removed once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
    pub markup_allowed: bool,
}

/// A run of text inside one display line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub bold: bool,
}

impl Segment {
    fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), bold: false }
    }

    fn bold(text: impl Into<String>) -> Self {
        Self { text: text.into(), bold: true }
    }
}

pub type DisplayLine = Vec<Segment>;

impl Message {
    pub fn new(text: impl Into<String>, sender: Sender, markup_allowed: bool) -> Self {
        Self {
            text: text.into(),
            sender,
            markup_allowed,
        }
    }

    /// Split the message into display lines.
    ///
    /// Every `\n` is a line break. Without markup the text is taken literally;
    /// with markup, `**bold**` runs are recognised.
    pub fn display_lines(&self) -> Vec<DisplayLine> {
        self.text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .map(|line| {
                if self.markup_allowed {
                    parse_markup_line(line)
                } else if line.is_empty() {
                    Vec::new()
                } else {
                    vec![Segment::plain(line)]
                }
            })
            .collect()
    }
}

/// Convert **bold** markers in a line to bold segments. Unclosed markers stay literal.
fn parse_markup_line(text: &str) -> DisplayLine {
    let mut segments = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                segments.push(Segment::plain(std::mem::take(&mut current_text)));
            }

            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                segments.push(Segment::bold(bold_text));
            } else {
                current_text.push_str("**");
                current_text.push_str(&bold_text);
                if found_close {
                    current_text.push_str("**");
                }
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        segments.push(Segment::plain(current_text));
    }

    segments
}

/// Link to the backend-generated report for a resolved location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLink {
    pub location: String,
}

impl ReportLink {
    pub fn label(&self) -> String {
        format!("Download Excel Report for {}", self.location)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    Message(Message),
    Report(ReportLink),
}

#[derive(Debug, Clone)]
pub struct Conversation {
    entries: Vec<LogEntry>,
    welcome: Option<String>,
    scroll_requested: bool,
}

impl Conversation {
    pub fn new(welcome: impl Into<String>) -> Self {
        Self {
            entries: Vec::new(),
            welcome: Some(welcome.into()),
            scroll_requested: false,
        }
    }

    /// Append a message to the end of the log and ask the view to follow it.
    pub fn add_message(&mut self, text: impl Into<String>, sender: Sender, markup_allowed: bool) {
        self.remove_welcome();
        self.entries
            .push(LogEntry::Message(Message::new(text, sender, markup_allowed)));
        self.scroll_requested = true;
    }

    pub fn add_bot_message(&mut self, text: impl Into<String>) {
        self.add_message(text, Sender::Bot, false);
    }

    pub fn add_user_message(&mut self, text: impl Into<String>) {
        self.add_message(text, Sender::User, false);
    }

    pub fn add_report_link(&mut self, location: impl Into<String>) {
        self.remove_welcome();
        self.entries.push(LogEntry::Report(ReportLink {
            location: location.into(),
        }));
        self.scroll_requested = true;
    }

    pub fn remove_welcome(&mut self) {
        self.welcome = None;
    }

    pub fn welcome(&self) -> Option<&str> {
        self.welcome.as_deref()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().filter_map(|entry| match entry {
            LogEntry::Message(msg) => Some(msg),
            LogEntry::Report(_) => None,
        })
    }

    /// Report links in log order
    pub fn report_links(&self) -> Vec<&ReportLink> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                LogEntry::Report(link) => Some(link),
                LogEntry::Message(_) => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true once after any append, so the view can scroll to the newest entry.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(lines: &[DisplayLine]) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.iter().map(|s| s.text.as_str()).collect())
            .collect()
    }

    #[test]
    fn test_first_message_removes_welcome() {
        let mut conv = Conversation::new("Welcome!");
        assert_eq!(conv.welcome(), Some("Welcome!"));

        conv.add_user_message("hello");
        assert_eq!(conv.welcome(), None);
        assert_eq!(conv.len(), 1);
    }

    #[test]
    fn test_append_keeps_insertion_order() {
        let mut conv = Conversation::new("Welcome!");
        conv.add_user_message("first");
        conv.add_bot_message("second");
        conv.add_report_link("Salem");
        conv.add_bot_message("third");

        let texts: Vec<&str> = conv.messages().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert!(matches!(conv.entries()[2], LogEntry::Report(_)));
    }

    #[test]
    fn test_same_message_twice_gives_two_entries() {
        let mut conv = Conversation::new("Welcome!");
        conv.add_message("same", Sender::Bot, false);
        conv.add_message("same", Sender::Bot, false);

        assert_eq!(conv.len(), 2);
        assert_eq!(conv.entries()[0], conv.entries()[1]);
    }

    #[test]
    fn test_scroll_request_is_taken_once() {
        let mut conv = Conversation::new("Welcome!");
        assert!(!conv.take_scroll_request());

        conv.add_bot_message("hi");
        assert!(conv.take_scroll_request());
        assert!(!conv.take_scroll_request());
    }

    #[test]
    fn test_plain_text_breaks_on_newlines_only() {
        let msg = Message::new("Level: **12 m**\n<b>pH</b>: 7\n\nend", Sender::Bot, false);
        let lines = msg.display_lines();

        assert_eq!(
            texts(&lines),
            vec!["Level: **12 m**", "<b>pH</b>: 7", "", "end"]
        );
        assert!(lines.iter().flatten().all(|s| !s.bold));
    }

    #[test]
    fn test_markup_recognises_bold() {
        let msg = Message::new("Reply **Yes** or **No**", Sender::Bot, true);
        let lines = msg.display_lines();

        assert_eq!(lines.len(), 1);
        let bold: Vec<&str> = lines[0]
            .iter()
            .filter(|s| s.bold)
            .map(|s| s.text.as_str())
            .collect();
        assert_eq!(bold, vec!["Yes", "No"]);
    }

    #[test]
    fn test_markup_unclosed_bold_is_literal() {
        let msg = Message::new("a **b", Sender::Bot, true);
        assert_eq!(texts(&msg.display_lines()), vec!["a **b"]);
    }

    #[test]
    fn test_report_link_label() {
        let link = ReportLink {
            location: "Pune".to_string(),
        };
        assert_eq!(link.label(), "Download Excel Report for Pune");
    }
}
