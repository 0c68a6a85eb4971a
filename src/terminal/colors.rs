#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalColor {
    // Standard 16 colors
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,

    // 256-color mode
    Indexed(u8),

    // True color (RGB)
    Rgb { r: u8, g: u8, b: u8 },

    // Default terminal colors
    DefaultFg,
    DefaultBg,
}

impl Default for TerminalColor {
    fn default() -> Self {
        TerminalColor::DefaultFg
    }
}

/// Which half of a cell a color applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorLayer {
    Foreground,
    Background,
}

impl ColorLayer {
    /// Host menu value. Only "background" selects the background; anything
    /// else paints the text itself.
    pub fn parse(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("background") {
            ColorLayer::Background
        } else {
            ColorLayer::Foreground
        }
    }
}

impl TerminalColor {
    /// Convert ANSI foreground color code to TerminalColor
    pub fn from_ansi_code(code: u8) -> Self {
        match code {
            30 => TerminalColor::Black,
            31 => TerminalColor::Red,
            32 => TerminalColor::Green,
            33 => TerminalColor::Yellow,
            34 => TerminalColor::Blue,
            35 => TerminalColor::Magenta,
            36 => TerminalColor::Cyan,
            37 => TerminalColor::White,
            90 => TerminalColor::BrightBlack,
            91 => TerminalColor::BrightRed,
            92 => TerminalColor::BrightGreen,
            93 => TerminalColor::BrightYellow,
            94 => TerminalColor::BrightBlue,
            95 => TerminalColor::BrightMagenta,
            96 => TerminalColor::BrightCyan,
            97 => TerminalColor::BrightWhite,
            39 => TerminalColor::DefaultFg,
            49 => TerminalColor::DefaultBg,
            _ => TerminalColor::DefaultFg,
        }
    }

    /// SGR parameter string selecting this color on the given layer,
    /// e.g. `31`, `48;5;200` or `38;2;255;0;0`.
    pub fn sgr_params(self, layer: ColorLayer) -> String {
        let (extended, default, offset) = match layer {
            ColorLayer::Foreground => (38, 39, 0),
            ColorLayer::Background => (48, 49, 10),
        };

        match self {
            TerminalColor::Indexed(idx) => format!("{};5;{}", extended, idx),
            TerminalColor::Rgb { r, g, b } => format!("{};2;{};{};{}", extended, r, g, b),
            TerminalColor::DefaultFg | TerminalColor::DefaultBg => default.to_string(),
            named => (named.base_code() + offset).to_string(),
        }
    }

    fn base_code(self) -> u8 {
        match self {
            TerminalColor::Black => 30,
            TerminalColor::Red => 31,
            TerminalColor::Green => 32,
            TerminalColor::Yellow => 33,
            TerminalColor::Blue => 34,
            TerminalColor::Magenta => 35,
            TerminalColor::Cyan => 36,
            TerminalColor::White => 37,
            TerminalColor::BrightBlack => 90,
            TerminalColor::BrightRed => 91,
            TerminalColor::BrightGreen => 92,
            TerminalColor::BrightYellow => 93,
            TerminalColor::BrightBlue => 94,
            TerminalColor::BrightMagenta => 95,
            TerminalColor::BrightCyan => 96,
            TerminalColor::BrightWhite => 97,
            _ => 39,
        }
    }

    /// Coerce a host color value into an RGB color.
    ///
    /// Accepts `#rrggbb`, `#rgb` and decimal integers packed as `0xRRGGBB`.
    /// Anything unparseable becomes black rather than an error.
    pub fn parse_rgb(value: &str) -> Self {
        let value = value.trim();
        let packed = if let Some(hex) = value.strip_prefix('#') {
            match hex.len() {
                6 => u32::from_str_radix(hex, 16).ok(),
                3 => u32::from_str_radix(hex, 16).ok().map(|short| {
                    let r = (short >> 8) & 0xF;
                    let g = (short >> 4) & 0xF;
                    let b = short & 0xF;
                    (r * 0x11) << 16 | (g * 0x11) << 8 | (b * 0x11)
                }),
                _ => None,
            }
        } else {
            value.parse::<u32>().ok()
        };

        let packed = packed.unwrap_or(0) & 0xFF_FFFF;
        TerminalColor::Rgb {
            r: (packed >> 16) as u8,
            g: (packed >> 8) as u8,
            b: packed as u8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ansi_color_conversion() {
        assert_eq!(TerminalColor::from_ansi_code(31), TerminalColor::Red);
        assert_eq!(TerminalColor::from_ansi_code(32), TerminalColor::Green);
        assert_eq!(TerminalColor::from_ansi_code(94), TerminalColor::BrightBlue);
    }

    #[test]
    fn test_sgr_params() {
        assert_eq!(TerminalColor::Red.sgr_params(ColorLayer::Foreground), "31");
        assert_eq!(TerminalColor::Red.sgr_params(ColorLayer::Background), "41");
        assert_eq!(TerminalColor::BrightWhite.sgr_params(ColorLayer::Foreground), "97");
        assert_eq!(TerminalColor::Indexed(200).sgr_params(ColorLayer::Background), "48;5;200");
        assert_eq!(
            TerminalColor::Rgb { r: 255, g: 0, b: 0 }.sgr_params(ColorLayer::Foreground),
            "38;2;255;0;0"
        );
    }

    #[test]
    fn test_parse_rgb() {
        assert_eq!(TerminalColor::parse_rgb("#ff8000"), TerminalColor::Rgb { r: 255, g: 128, b: 0 });
        assert_eq!(TerminalColor::parse_rgb("#0f0"), TerminalColor::Rgb { r: 0, g: 255, b: 0 });
        assert_eq!(TerminalColor::parse_rgb("255"), TerminalColor::Rgb { r: 0, g: 0, b: 255 });
        assert_eq!(TerminalColor::parse_rgb("not a color"), TerminalColor::Rgb { r: 0, g: 0, b: 0 });
    }

    #[test]
    fn test_color_layer_parse() {
        assert_eq!(ColorLayer::parse("Background"), ColorLayer::Background);
        assert_eq!(ColorLayer::parse("foreground"), ColorLayer::Foreground);
        assert_eq!(ColorLayer::parse("sideways"), ColorLayer::Foreground);
    }
}
