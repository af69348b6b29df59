//! Terminal output for the `kindred` commands.
//!
//! Human output goes through [`Style`] and the results table; `--json`
//! output bypasses this module entirely.

pub mod color;
pub mod format;
pub mod progress;
pub mod style;
pub mod table;

pub use color::ColorMode;
pub use progress::{progress_visible, Progress};
pub use style::{MessageType, Style};
