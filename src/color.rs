//! ANSI color handling
//!
//! Colors are only used for log level labels. `auto` enables them when
//! stderr is a terminal and `TERM` is not `dumb`.

use std::io::IsTerminal;

use serde::{Deserialize, Serialize};

pub const COLOR_NORMAL: &str = "\x1b[m";
pub const COLOR_RED_BG: &str = "\x1b[41m";
pub const COLOR_GREEN_BG: &str = "\x1b[42m";
pub const COLOR_YELLOW_BG: &str = "\x1b[43m";
pub const COLOR_CYAN_BG: &str = "\x1b[46m";

/// When to colorize output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    /// Decides whether colors should be emitted for this process
    pub fn use_color(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => {
                std::io::stderr().is_terminal()
                    && terminal_allows_color(std::env::var("TERM").ok().as_deref())
            }
        }
    }
}

/// Returns false for terminals that cannot render escape sequences
pub fn terminal_allows_color(term: Option<&str>) -> bool {
    term != Some("dumb")
}

/// Wraps `text` in `color` when `enabled`
pub fn format_color(text: &str, color: &str, enabled: bool) -> String {
    if enabled {
        format!("{}{}{}", color, text, COLOR_NORMAL)
    } else {
        text.to_string()
    }
}
