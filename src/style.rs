// src/style.rs

//! ANSI styling helpers.
//!
//! [`Styled`] is a small immutable value: every builder call returns a new
//! `Styled` with one more SGR code appended, and `Display` renders the codes
//! around the text followed by a reset.
//!
//! ```
//! use cmdrun::style::{Color, Styled};
//!
//! let s = Styled::new("ok").fg(Color::Green).bold();
//! assert_eq!(s.to_string(), "\x1b[32;1mok\x1b[0m");
//! ```

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

pub const ANSI_RESET: &str = "\x1b[0m";

/// The eight base ANSI colours, plus their bright variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
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
}

impl Color {
    /// Foreground SGR code (30-37, 90-97). Background is this plus 10.
    pub fn code(self) -> u8 {
        match self {
            Color::Black => 30,
            Color::Red => 31,
            Color::Green => 32,
            Color::Yellow => 33,
            Color::Blue => 34,
            Color::Magenta => 35,
            Color::Cyan => 36,
            Color::White => 37,
            Color::BrightBlack => 90,
            Color::BrightRed => 91,
            Color::BrightGreen => 92,
            Color::BrightYellow => 93,
            Color::BrightBlue => 94,
            Color::BrightMagenta => 95,
            Color::BrightCyan => 96,
            Color::BrightWhite => 97,
        }
    }
}

/// Text attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Reset,
    Bold,
    Dim,
    Italic,
    Underline,
    Blink,
    Inverse,
    Hidden,
    Strikethrough,
    DoubleUnderline,
    NormalColor,
    NoItalicOrFraktur,
    NoUnderline,
    NoBlink,
    NoInverse,
    NoHidden,
    NoStrikethrough,
}

impl Style {
    pub fn code(self) -> u8 {
        match self {
            Style::Reset => 0,
            Style::Bold => 1,
            Style::Dim => 2,
            Style::Italic => 3,
            Style::Underline => 4,
            Style::Blink => 5,
            Style::Inverse => 7,
            Style::Hidden => 8,
            Style::Strikethrough => 9,
            Style::DoubleUnderline => 21,
            Style::NormalColor => 22,
            Style::NoItalicOrFraktur => 23,
            Style::NoUnderline => 24,
            Style::NoBlink => 25,
            Style::NoInverse => 27,
            Style::NoHidden => 28,
            Style::NoStrikethrough => 29,
        }
    }
}

/// Text plus the SGR codes to render it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Styled {
    text: String,
    codes: Vec<String>,
}

impl Styled {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            codes: Vec::new(),
        }
    }

    fn with(&self, code: String) -> Self {
        let mut codes = self.codes.clone();
        codes.push(code);
        Self {
            text: self.text.clone(),
            codes,
        }
    }

    pub fn fg(&self, color: Color) -> Self {
        self.with(color.code().to_string())
    }

    pub fn bg(&self, color: Color) -> Self {
        self.with((color.code() + 10).to_string())
    }

    pub fn style(&self, style: Style) -> Self {
        self.with(style.code().to_string())
    }

    pub fn color256(&self, n: u8) -> Self {
        self.with(format!("38;5;{n}"))
    }

    pub fn bg_color256(&self, n: u8) -> Self {
        self.with(format!("48;5;{n}"))
    }

    pub fn rgb(&self, r: u8, g: u8, b: u8) -> Self {
        self.with(format!("38;2;{r};{g};{b}"))
    }

    pub fn bg_rgb(&self, r: u8, g: u8, b: u8) -> Self {
        self.with(format!("48;2;{r};{g};{b}"))
    }

    /// Append an arbitrary SGR parameter string (e.g. `"1;4"`).
    pub fn raw(&self, code: impl Into<String>) -> Self {
        self.with(code.into())
    }

    /// Drop all styling, keeping the plain text.
    pub fn clear(&self) -> Self {
        Self::new(strip_ansi(&self.text))
    }

    pub fn red(&self) -> Self {
        self.fg(Color::Red)
    }

    pub fn green(&self) -> Self {
        self.fg(Color::Green)
    }

    pub fn yellow(&self) -> Self {
        self.fg(Color::Yellow)
    }

    pub fn bold(&self) -> Self {
        self.style(Style::Bold)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }
}

impl fmt::Display for Styled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.codes.is_empty() {
            return f.write_str(&self.text);
        }
        write!(f, "\x1b[{}m{}{}", self.codes.join(";"), self.text, ANSI_RESET)
    }
}

/// Shorthand for `Styled::new(text)`.
pub fn paint(text: impl fmt::Display) -> Styled {
    Styled::new(text.to_string())
}

fn ansi_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\x1b\[[0-9;]*m").expect("static ANSI regex is valid")
    })
}

/// Remove SGR escape sequences from `text`.
pub fn strip_ansi(text: &str) -> String {
    ansi_regex().replace_all(text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_has_no_escape() {
        assert_eq!(Styled::new("x").to_string(), "x");
    }

    #[test]
    fn builders_do_not_mutate_the_original() {
        let base = Styled::new("x");
        let red = base.red();
        assert!(base.codes().is_empty());
        assert_eq!(red.codes(), ["31"]);
    }

    #[test]
    fn background_and_extended_codes() {
        let s = Styled::new("x")
            .bg(Color::BrightBlue)
            .color256(200)
            .bg_rgb(1, 2, 3);
        assert_eq!(s.codes(), ["104", "38;5;200", "48;2;1;2;3"]);
    }

    #[test]
    fn strip_and_clear() {
        let rendered = Styled::new("hello").green().bold().to_string();
        assert_eq!(strip_ansi(&rendered), "hello");
        assert_eq!(Styled::new(rendered).clear().to_string(), "hello");
    }

    #[test]
    fn style_codes_match_sgr_table() {
        assert_eq!(Style::Inverse.code(), 7);
        assert_eq!(Style::NoStrikethrough.code(), 29);
    }
}
