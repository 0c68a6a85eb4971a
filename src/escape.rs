//! Control sequence formatting.
//!
//! Everything here is pure: functions take typed parameters and return the
//! bytes the terminal widget should see. Host-facing parsers (`EraseTarget::parse`,
//! [`move_cursor_to`]) coerce loose scripting values at the boundary.

use crate::terminal::{ColorLayer, TerminalColor};

pub const ESC: &str = "\x1b";
pub const RESET: &str = "\x1b[0m";

/// Region cleared by an erase-in-display sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseTarget {
    /// Cursor to end of screen.
    After,
    /// Start of screen to cursor.
    Before,
    Screen,
    Scrollback,
}

impl EraseTarget {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "after" => Some(EraseTarget::After),
            "before" => Some(EraseTarget::Before),
            "screen" => Some(EraseTarget::Screen),
            "scrollback" => Some(EraseTarget::Scrollback),
            _ => None,
        }
    }

    fn mode(self) -> u8 {
        match self {
            EraseTarget::After => 0,
            EraseTarget::Before => 1,
            EraseTarget::Screen => 2,
            EraseTarget::Scrollback => 3,
        }
    }
}

/// Select Graphic Rendition attributes used for banners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sgr {
    Reset,
    Bold,
    Fg(TerminalColor),
    Bg(TerminalColor),
}

impl Sgr {
    fn params(self) -> String {
        match self {
            Sgr::Reset => "0".to_string(),
            Sgr::Bold => "1".to_string(),
            Sgr::Fg(color) => color.sgr_params(ColorLayer::Foreground),
            Sgr::Bg(color) => color.sgr_params(ColorLayer::Background),
        }
    }
}

/// Cursor position (CUP). `x` and `y` are zero-based; the sequence is one-based.
pub fn cursor_to(x: u32, y: u32) -> String {
    format!("{}[{};{}H", ESC, u64::from(y) + 1, u64::from(x) + 1)
}

/// Host entry point for cursor moves: coordinates arrive as script numbers
/// and anything that is not a non-negative integer yields no sequence.
pub fn move_cursor_to(x: f64, y: f64) -> Option<String> {
    let valid = |v: f64| v.is_finite() && v.fract() == 0.0 && v >= 0.0 && v <= f64::from(u32::MAX);
    if valid(x) && valid(y) {
        Some(cursor_to(x as u32, y as u32))
    } else {
        None
    }
}

/// Erase in display (ED).
pub fn erase(target: EraseTarget) -> String {
    format!("{}[{}J", ESC, target.mode())
}

/// Wrap `text` in the given SGR attributes followed by a reset.
pub fn styled(text: &str, attrs: &[Sgr]) -> String {
    if attrs.is_empty() {
        return text.to_string();
    }
    let params: Vec<String> = attrs.iter().map(|a| a.params()).collect();
    format!("{}[{}m{}{}", ESC, params.join(";"), text, RESET)
}

/// Wrap `text` in a color sequence for one layer followed by a reset.
pub fn colored_text(text: &str, color: TerminalColor, layer: ColorLayer) -> String {
    format!("{}[{}m{}{}", ESC, color.sgr_params(layer), text, RESET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_is_one_based() {
        assert_eq!(cursor_to(0, 0), "\x1b[1;1H");
        assert_eq!(move_cursor_to(3.0, 5.0).as_deref(), Some("\x1b[6;4H"));
    }

    #[test]
    fn test_invalid_cursor_coordinates_are_ignored() {
        assert_eq!(move_cursor_to(-1.0, 0.0), None);
        assert_eq!(move_cursor_to(1.5, 2.0), None);
        assert_eq!(move_cursor_to(f64::NAN, 2.0), None);
        assert_eq!(move_cursor_to(0.0, f64::INFINITY), None);
    }

    #[test]
    fn test_erase_targets() {
        assert_eq!(erase(EraseTarget::After), "\x1b[0J");
        assert_eq!(erase(EraseTarget::Before), "\x1b[1J");
        assert_eq!(erase(EraseTarget::Screen), "\x1b[2J");
        assert_eq!(erase(EraseTarget::Scrollback), "\x1b[3J");
        assert_eq!(EraseTarget::parse("SCREEN"), Some(EraseTarget::Screen));
        assert_eq!(EraseTarget::parse("everything"), None);
    }

    #[test]
    fn test_colored_text() {
        let red = TerminalColor::Rgb { r: 255, g: 0, b: 0 };
        assert_eq!(
            colored_text("hi", red, ColorLayer::Foreground),
            "\x1b[38;2;255;0;0mhi\x1b[0m"
        );
        assert_eq!(
            colored_text("hi", red, ColorLayer::Background),
            "\x1b[48;2;255;0;0mhi\x1b[0m"
        );
    }

    #[test]
    fn test_styled() {
        assert_eq!(
            styled("ok", &[Sgr::Bold, Sgr::Fg(TerminalColor::Green)]),
            "\x1b[1;32mok\x1b[0m"
        );
        assert_eq!(styled("plain", &[]), "plain");
    }
}
