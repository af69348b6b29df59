//! Whether output gets ANSI colors.
//!
//! `auto` honours `NO_COLOR` (https://no-color.org/) and colors only a TTY.

use std::io::IsTerminal;

use clap::ValueEnum;

/// Value of the global `--color` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorMode {
    Always,
    Never,
    #[default]
    Auto,
}

impl ColorMode {
    /// Resolve the mode against the environment.
    pub fn is_enabled(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal(),
        }
    }
}

/// Columns available for the results table; 80 when stdout is not a terminal.
pub fn terminal_width() -> usize {
    match terminal_size::terminal_size() {
        Some((width, _)) => usize::from(width.0),
        None => 80,
    }
}
