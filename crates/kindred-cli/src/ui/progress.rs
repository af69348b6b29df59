//! Progress for `reindex-batch`, `backfill` and `sync-index`.
//!
//! Bars are drawn only on an interactive, colored terminal and never with
//! `--quiet` or `--json`; otherwise a hidden bar absorbs the updates.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use super::color::ColorMode;

/// Whether a command should draw progress.
pub fn progress_visible(quiet: bool, json: bool, color_mode: ColorMode) -> bool {
    !quiet && !json && color_mode != ColorMode::Never && std::io::stdout().is_terminal()
}

/// Thin wrapper over an indicatif bar that may be hidden.
pub struct Progress(ProgressBar);

impl Progress {
    /// Spinner for work of unknown size.
    pub fn spinner(message: &str, visible: bool) -> Self {
        if !visible {
            return Self(ProgressBar::hidden());
        }
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})") {
            bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        Self(bar)
    }

    /// Bar over `total` works; the message shows the current work id.
    pub fn bar(total: u64, message: &str, visible: bool) -> Self {
        if !visible {
            return Self(ProgressBar::hidden());
        }
        let bar = ProgressBar::new(total);
        if let Ok(style) =
            ProgressStyle::with_template("[{bar:20.cyan/dim}] {pos}/{len} {msg} ({elapsed})")
        {
            bar.set_style(style.progress_chars("█░"));
        }
        bar.set_message(message.to_string());
        Self(bar)
    }

    /// Set the total once it is known.
    pub fn set_length(&self, total: u64) {
        self.0.set_length(total);
    }

    pub fn set_message(&self, message: &str) {
        self.0.set_message(message.to_string());
    }

    pub fn inc(&self, delta: u64) {
        self.0.inc(delta);
    }

    pub fn finish_clear(&self) {
        self.0.finish_and_clear();
    }
}
