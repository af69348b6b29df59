//! Styling of status lines, search headers and batch reports.
//!
//! Status lines start with a bracketed tag such as `[ok]` or `[warn]`.
//! Colors are decided once, when the [`Style`] is built.

use owo_colors::OwoColorize;

use super::color::ColorMode;

/// Tag shown in front of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Ok,
    Err,
    Warn,
    Info,
    Hint,
    /// Nothing to do.
    Skip,
}

impl MessageType {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Ok => "[ok]",
            Self::Err => "[err]",
            Self::Warn => "[warn]",
            Self::Info => "[info]",
            Self::Hint => "[hint]",
            Self::Skip => "[skip]",
        }
    }
}

/// Renders CLI text with or without ANSI colors.
#[derive(Debug, Clone, Copy)]
pub struct Style {
    mode: ColorMode,
    colored: bool,
}

impl Style {
    pub fn new(mode: ColorMode) -> Self {
        Self {
            mode,
            colored: mode.is_enabled(),
        }
    }

    pub fn color_mode(&self) -> ColorMode {
        self.mode
    }

    fn paint(&self, text: &str, colorize: impl FnOnce(&str) -> String) -> String {
        if self.colored {
            colorize(text)
        } else {
            text.to_string()
        }
    }

    /// `[tag] text`.
    pub fn message(&self, kind: MessageType, text: &str) -> String {
        let tag = self.paint(kind.tag(), |t| match kind {
            MessageType::Ok => t.green().to_string(),
            MessageType::Err => t.red().to_string(),
            MessageType::Warn => t.yellow().to_string(),
            MessageType::Info => t.blue().to_string(),
            MessageType::Hint => t.cyan().to_string(),
            MessageType::Skip => t.dimmed().to_string(),
        });
        format!("{} {}", tag, text)
    }

    /// An `[err]` line followed by indented cause and hint lines.
    pub fn error_with_context(&self, msg: &str, cause: Option<&str>, hint: Option<&str>) -> String {
        let mut lines = vec![self.message(MessageType::Err, msg)];
        lines.extend(cause.map(|c| format!("      Cause: {}", c)));
        lines.extend(hint.map(|h| format!("      Hint: {}", h)));
        lines.join("\n")
    }

    pub fn section(&self, title: &str) -> String {
        self.paint(title, |t| t.bold().to_string())
    }

    /// `key: value` with the key dimmed.
    pub fn key_value(&self, key: &str, value: &str) -> String {
        format!("{}: {}", self.paint(key, |k| k.dimmed().to_string()), value)
    }

    pub fn work_id(&self, id: &str) -> String {
        self.paint(id, |i| i.cyan().to_string())
    }

    /// A work id listed under a batch report as failed.
    pub fn failed_work(&self, id: &str) -> String {
        format!("  {} {}", self.paint("-", |d| d.red().to_string()), self.work_id(id))
    }

    /// Similarity to three decimals: green from 0.9, yellow from 0.8.
    pub fn score(&self, value: f32) -> String {
        let text = format!("{:.3}", value);
        match value {
            v if v >= 0.9 => self.paint(&text, |s| s.green().to_string()),
            v if v >= 0.8 => self.paint(&text, |s| s.yellow().to_string()),
            _ => text,
        }
    }
}
