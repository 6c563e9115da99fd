//! Terminal capability detection and utilities

use owo_colors::{colors::css, OwoColorize};
use quartermaster::{Classification, StockStatus};

/// Detects whether colored output should be enabled
pub fn supports_color() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

/// Detects terminal width, returning None if not available
pub fn terminal_width() -> Option<u16> {
    terminal_size::terminal_size().map(|(w, _)| w.0)
}

/// Check if terminal is narrow (< 80 columns)
pub fn is_narrow() -> bool {
    terminal_width().is_some_and(|w| w < 80)
}

/// Extension trait for colorizing output
pub trait Colorize {
    /// Color as success (green)
    fn success(&self) -> String;
    /// Color as warning (amber)
    fn warning(&self) -> String;
    /// Color as danger (red, bold)
    fn danger(&self) -> String;
    /// Color as info (blue)
    fn info(&self) -> String;
    /// Dim the text
    fn dim(&self) -> String;
}

impl Colorize for str {
    fn success(&self) -> String {
        if supports_color() {
            self.fg::<css::Green>().to_string()
        } else {
            self.to_string()
        }
    }

    fn warning(&self) -> String {
        if supports_color() {
            self.fg::<css::Orange>().to_string()
        } else {
            self.to_string()
        }
    }

    fn danger(&self) -> String {
        if supports_color() {
            self.fg::<css::Red>().bold().to_string()
        } else {
            self.to_string()
        }
    }

    fn info(&self) -> String {
        if supports_color() {
            self.fg::<css::LightBlue>().to_string()
        } else {
            self.to_string()
        }
    }

    fn dim(&self) -> String {
        if supports_color() {
            self.dimmed().to_string()
        } else {
            self.to_string()
        }
    }
}

impl Colorize for String {
    fn success(&self) -> String {
        self.as_str().success()
    }

    fn warning(&self) -> String {
        self.as_str().warning()
    }

    fn danger(&self) -> String {
        self.as_str().danger()
    }

    fn info(&self) -> String {
        self.as_str().info()
    }

    fn dim(&self) -> String {
        self.as_str().dim()
    }
}

/// Colors text by stock urgency.
pub fn paint_status(text: &str, status: StockStatus) -> String {
    match status {
        StockStatus::Ok => text.success(),
        StockStatus::Watch => text.warning(),
        StockStatus::Low => text.danger(),
    }
}

/// A full-width sensitivity banner, e.g. `*** SECRET ***`.
pub fn classification_banner(classification: Classification) -> String {
    let width = usize::from(terminal_width().unwrap_or(80)).min(80);
    let label = format!("*** {classification} ***");
    let banner = format!("{label:^width$}");
    match classification {
        Classification::Unclassified => banner.success(),
        Classification::Restricted => banner.info(),
        Classification::Confidential => banner.warning(),
        Classification::Secret => banner.danger(),
    }
}
