//! The terminal widget seam.
//!
//! The bridge never renders text itself. It talks to a [`Terminal`]
//! implementation for output and receives [`TerminalEvent`]s from the widget
//! on a channel handed over at construction time.

pub mod colors;
pub mod grid;
pub mod headless;
pub mod parser;

use serde::Serialize;

pub use colors::{ColorLayer, TerminalColor};
pub use grid::{Cell, CellAttributes, TextGrid};
pub use headless::HeadlessTerminal;
pub use parser::TerminalParser;

/// Viewport size in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalSize {
    pub cols: u16,
    pub rows: u16,
}

/// Zero-based cursor cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPosition {
    pub col: u16,
    pub row: u16,
}

/// Events the widget emits toward the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    /// Locally typed or pasted text, exactly as the widget received it.
    Input(String),
    Resized(TerminalSize),
}

/// Output side of a terminal widget.
pub trait Terminal: Send {
    /// Write raw text, escape sequences included.
    fn write(&mut self, text: &str);

    /// Write text followed by a line break.
    fn write_line(&mut self, text: &str) {
        self.write(text);
        self.write("\r\n");
    }

    /// Clear the viewport and scrollback, homing the cursor.
    fn clear(&mut self);

    /// Re-fit the viewport to its container after a layout change.
    fn fit(&mut self) {}

    fn size(&self) -> TerminalSize;

    fn cursor(&self) -> CursorPosition;
}

/// Host menu for the "terminal metrics" query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalMetric {
    Size,
    Cursor,
}

impl TerminalMetric {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "size" => Some(TerminalMetric::Size),
            "cursor" => Some(TerminalMetric::Cursor),
            _ => None,
        }
    }
}

/// `{x, y}` pair reported to host scripts: columns/rows for size,
/// column/row for the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricPoint {
    pub x: u16,
    pub y: u16,
}

pub fn measure(terminal: &dyn Terminal, metric: TerminalMetric) -> MetricPoint {
    match metric {
        TerminalMetric::Size => {
            let size = terminal.size();
            MetricPoint { x: size.cols, y: size.rows }
        }
        TerminalMetric::Cursor => {
            let cursor = terminal.cursor();
            MetricPoint { x: cursor.col, y: cursor.row }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_parse() {
        assert_eq!(TerminalMetric::parse("Size"), Some(TerminalMetric::Size));
        assert_eq!(TerminalMetric::parse("cursor"), Some(TerminalMetric::Cursor));
        assert_eq!(TerminalMetric::parse("colour"), None);
    }

    #[test]
    fn test_measure_headless() {
        let (mut terminal, _events) = HeadlessTerminal::new(12, 80);
        terminal.write("ab\r\ncd");

        assert_eq!(measure(&terminal, TerminalMetric::Size), MetricPoint { x: 80, y: 12 });
        assert_eq!(measure(&terminal, TerminalMetric::Cursor), MetricPoint { x: 2, y: 1 });
    }
}
