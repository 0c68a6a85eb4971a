// VT100/ANSI parsing for the headless terminal.
// Covers what the bridge and typical serial consoles emit: text, C0 controls,
// cursor movement, erase and SGR (including 256-color and true color).

use vte::{Parser, Perform};
use crate::terminal::{CellAttributes, TerminalColor, TextGrid};

// Separate performer to avoid borrowing issues with the parser
struct ParserPerformer<'a> {
    grid: &'a mut TextGrid,
    current_attrs: &'a mut CellAttributes,
    current_fg: &'a mut TerminalColor,
    current_bg: &'a mut TerminalColor,
}

pub struct TerminalParser {
    parser: Parser,
    grid: TextGrid,
    current_attrs: CellAttributes,
    current_fg: TerminalColor,
    current_bg: TerminalColor,
}

impl TerminalParser {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            parser: Parser::new(),
            grid: TextGrid::new(rows, cols),
            current_attrs: CellAttributes::default(),
            current_fg: TerminalColor::DefaultFg,
            current_bg: TerminalColor::DefaultBg,
        }
    }

    pub fn parse(&mut self, data: &[u8]) {
        let mut performer = ParserPerformer {
            grid: &mut self.grid,
            current_attrs: &mut self.current_attrs,
            current_fg: &mut self.current_fg,
            current_bg: &mut self.current_bg,
        };
        for &byte in data {
            self.parser.advance(&mut performer, byte);
        }
    }

    pub fn grid(&self) -> &TextGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut TextGrid {
        &mut self.grid
    }

    pub fn resize(&mut self, rows: u16, cols: u16) {
        self.grid.resize(rows, cols);
    }
}

fn first(params: &vte::Params, default: u16) -> u16 {
    params
        .iter()
        .next()
        .map(|p| p[0])
        .filter(|&v| v != 0)
        .unwrap_or(default)
}

impl<'a> Perform for ParserPerformer<'a> {
    fn print(&mut self, c: char) {
        self.grid.set_attrs(self.current_attrs.clone());
        self.grid.set_fg_color(*self.current_fg);
        self.grid.set_bg_color(*self.current_bg);

        self.grid.write_char(c);
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            b'\n' | b'\x0b' | b'\x0c' => self.grid.line_feed(),
            b'\r' => self.grid.carriage_return(),
            b'\t' => self.grid.tab(),
            b'\x08' => self.grid.backspace(),
            _ => {}
        }
    }

    fn csi_dispatch(&mut self, params: &vte::Params, _intermediates: &[u8], _ignore: bool, c: char) {
        match c {
            'A' => self.grid.cursor_up(first(params, 1)),
            'B' => self.grid.cursor_down(first(params, 1)),
            'C' => self.grid.cursor_right(first(params, 1)),
            'D' => self.grid.cursor_left(first(params, 1)),
            'H' | 'f' => {
                let mut iter = params.iter();
                let row = iter.next().map_or(1, |p| p[0].max(1)) - 1;
                let col = iter.next().map_or(1, |p| p[0].max(1)) - 1;
                self.grid.set_cursor(row, col);
            }

            'J' => match params.iter().next().map_or(0, |p| p[0]) {
                0 => self.grid.clear_below(),
                1 => self.grid.clear_above(),
                2 => self.grid.clear_screen(),
                3 => self.grid.clear_scrollback(),
                _ => {}
            },
            'K' => match params.iter().next().map_or(0, |p| p[0]) {
                0 => self.grid.clear_line_from_cursor(),
                1 => self.grid.clear_line_to_cursor(),
                2 => self.grid.clear_line(),
                _ => {}
            },

            'S' => self.grid.scroll_up(first(params, 1)),
            'T' => self.grid.scroll_down(first(params, 1)),

            'm' => self.handle_sgr(params),

            'h' | 'l' => {
                if params.iter().next().is_some_and(|p| p[0] == 25) {
                    self.grid.set_cursor_visible(c == 'h');
                }
            }

            _ => {}
        }
    }
}

impl<'a> ParserPerformer<'a> {
    fn reset_attrs(&mut self) {
        *self.current_attrs = CellAttributes::default();
        *self.current_fg = TerminalColor::DefaultFg;
        *self.current_bg = TerminalColor::DefaultBg;
    }

    fn handle_sgr(&mut self, params: &vte::Params) {
        let params: Vec<&[u16]> = params.iter().collect();
        if params.is_empty() {
            self.reset_attrs();
            return;
        }

        let mut i = 0;
        while i < params.len() {
            let param = params[i];
            match param[0] {
                0 => self.reset_attrs(),

                1 => self.current_attrs.bold = true,
                3 => self.current_attrs.italic = true,
                4 => self.current_attrs.underline = true,
                5 => self.current_attrs.blink = true,
                7 => self.current_attrs.reverse = true,
                9 => self.current_attrs.strikethrough = true,

                22 => self.current_attrs.bold = false,
                23 => self.current_attrs.italic = false,
                24 => self.current_attrs.underline = false,
                25 => self.current_attrs.blink = false,
                27 => self.current_attrs.reverse = false,
                29 => self.current_attrs.strikethrough = false,

                30..=37 | 90..=97 => {
                    *self.current_fg = TerminalColor::from_ansi_code(param[0] as u8);
                }
                39 => *self.current_fg = TerminalColor::DefaultFg,

                40..=47 | 100..=107 => {
                    *self.current_bg = TerminalColor::from_ansi_code(param[0] as u8 - 10);
                }
                49 => *self.current_bg = TerminalColor::DefaultBg,

                38 | 48 => {
                    let (color, consumed) = extended_color(param, &params[i + 1..]);
                    if let Some(color) = color {
                        if param[0] == 38 {
                            *self.current_fg = color;
                        } else {
                            *self.current_bg = color;
                        }
                    }
                    i += consumed;
                }

                _ => {}
            }
            i += 1;
        }
    }
}

/// Decode `38`/`48` extended colors in either colon (`38:2::r:g:b`) or
/// semicolon (`38;2;r;g;b`) form. Returns the color and how many following
/// parameters were consumed.
fn extended_color(param: &[u16], rest: &[&[u16]]) -> (Option<TerminalColor>, usize) {
    let channel = |v: u16| v.min(255) as u8;

    if param.len() > 1 {
        let color = match param[1] {
            5 if param.len() >= 3 => Some(TerminalColor::Indexed(channel(param[2]))),
            2 if param.len() >= 6 => Some(TerminalColor::Rgb {
                r: channel(param[3]),
                g: channel(param[4]),
                b: channel(param[5]),
            }),
            2 if param.len() == 5 => Some(TerminalColor::Rgb {
                r: channel(param[2]),
                g: channel(param[3]),
                b: channel(param[4]),
            }),
            _ => None,
        };
        return (color, 0);
    }

    match rest.first().map(|p| p[0]) {
        Some(5) if rest.len() >= 2 => (Some(TerminalColor::Indexed(channel(rest[1][0]))), 2),
        Some(2) if rest.len() >= 4 => (
            Some(TerminalColor::Rgb {
                r: channel(rest[1][0]),
                g: channel(rest[2][0]),
                b: channel(rest[3][0]),
            }),
            4,
        ),
        _ => (None, rest.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_creation() {
        let parser = TerminalParser::new(24, 80);
        assert_eq!(parser.grid().rows, 24);
        assert_eq!(parser.grid().cols, 80);
    }

    #[test]
    fn test_simple_text() {
        let mut parser = TerminalParser::new(24, 80);
        parser.parse(b"Hello");

        assert_eq!(parser.grid().cell_at(0, 0).unwrap().ch, 'H');
        assert_eq!(parser.grid().cell_at(0, 4).unwrap().ch, 'o');
    }

    #[test]
    fn test_crlf() {
        let mut parser = TerminalParser::new(24, 80);
        parser.parse(b"Line1\r\nLine2");

        assert_eq!(parser.grid().row_text(0).unwrap(), "Line1");
        assert_eq!(parser.grid().row_text(1).unwrap(), "Line2");
    }

    #[test]
    fn test_cursor_position_sequence() {
        let mut parser = TerminalParser::new(24, 80);
        parser.parse(b"\x1b[6;4H*");

        assert_eq!(parser.grid().cell_at(5, 3).unwrap().ch, '*');
    }

    #[test]
    fn test_erase_display() {
        let mut parser = TerminalParser::new(4, 10);
        parser.parse(b"one\r\ntwo\r\nthree");
        parser.parse(b"\x1b[2;1H\x1b[0J");
        assert_eq!(parser.grid().screen_text(), "one");

        parser.parse(b"\x1b[2J");
        assert_eq!(parser.grid().screen_text(), "");
    }

    #[test]
    fn test_true_color_sgr() {
        let mut parser = TerminalParser::new(2, 10);
        parser.parse(b"\x1b[38;2;255;0;0mR\x1b[48;5;17mB\x1b[0mN");

        let grid = parser.grid();
        assert_eq!(grid.cell_at(0, 0).unwrap().fg_color, TerminalColor::Rgb { r: 255, g: 0, b: 0 });
        assert_eq!(grid.cell_at(0, 1).unwrap().bg_color, TerminalColor::Indexed(17));
        assert_eq!(grid.cell_at(0, 2).unwrap().fg_color, TerminalColor::DefaultFg);
    }

    #[test]
    fn test_bold_named_color() {
        let mut parser = TerminalParser::new(2, 10);
        parser.parse(b"\x1b[1;32mok");

        let cell = parser.grid().cell_at(0, 0).unwrap();
        assert!(cell.attrs.bold);
        assert_eq!(cell.fg_color, TerminalColor::Green);
    }

    #[test]
    fn test_cursor_visibility_mode() {
        let mut parser = TerminalParser::new(2, 10);
        parser.parse(b"\x1b[?25l");
        assert!(!parser.grid().cursor_visible());
        parser.parse(b"\x1b[?25h");
        assert!(parser.grid().cursor_visible());
    }
}
