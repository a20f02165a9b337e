//! Pixel range and color expressions
//!
//! Ranges are 1-based and inclusive on the wire:
//!
//! | Expression | Pixels |
//! |------------|--------|
//! | `all`      | whole strip |
//! | `7`        | pixel 7 |
//! | `2-4`      | pixels 2, 3 and 4 |
//!
//! Colors are 6 or 8 hex digits, `RRGGBB` or `RRGGBBWW`, optionally
//! prefixed by `#` or `0x`. Six digits leave white at zero.

use core::fmt::{self, Write};

use heapless::String;

/// Expression parse errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExprError {
    /// Malformed range, index below 1 or past the end of the strip
    InvalidRange,
    /// Malformed color
    InvalidColor,
}

/// Half-open, 0-based span of pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PixelRange {
    pub start: u16,
    pub end: u16,
}

impl PixelRange {
    /// Every pixel of a strip of `count` pixels
    pub const fn all(count: u16) -> Self {
        Self { start: 0, end: count }
    }

    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn iter(&self) -> core::ops::Range<usize> {
        self.start as usize..self.end as usize
    }
}

fn parse_index(s: &str) -> Result<u16, ExprError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ExprError::InvalidRange);
    }
    s.parse().map_err(|_| ExprError::InvalidRange)
}

/// Parse a range expression for a strip of `count` pixels
pub fn parse_range(expr: &str, count: u16) -> Result<PixelRange, ExprError> {
    let expr = expr.trim();
    if expr.eq_ignore_ascii_case("all") {
        return Ok(PixelRange::all(count));
    }

    let (first, last) = match expr.split_once('-') {
        Some((a, b)) => (parse_index(a)?, parse_index(b)?),
        None => {
            let index = parse_index(expr)?;
            (index, index)
        }
    };

    if first < 1 || last < first || last > count {
        return Err(ExprError::InvalidRange);
    }
    Ok(PixelRange {
        start: first - 1,
        end: last,
    })
}

/// An RGBW color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub w: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgbw(0, 0, 0, 0);

    pub const fn rgbw(r: u8, g: u8, b: u8, w: u8) -> Self {
        Self { r, g, b, w }
    }

    /// Channel bytes in strip order: green, red, blue, white
    pub const fn wire(&self) -> [u8; 4] {
        [self.g, self.r, self.b, self.w]
    }

    /// Inverse of [`Color::wire`]; missing white reads as zero
    pub fn from_wire(bytes: &[u8]) -> Self {
        let at = |i: usize| bytes.get(i).copied().unwrap_or(0);
        Self::rgbw(at(1), at(0), at(2), at(3))
    }

    /// Format as `#rrggbbww`
    pub fn to_hex(&self) -> String<9> {
        let mut out = String::new();
        // 9 bytes always fit
        let _ = write!(out, "{}", self);
        out
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.w)
    }
}

/// Parse a color expression
pub fn parse_color(expr: &str) -> Result<Color, ExprError> {
    let expr = expr.trim();
    let digits = expr
        .strip_prefix('#')
        .or_else(|| expr.strip_prefix("0x"))
        .or_else(|| expr.strip_prefix("0X"))
        .unwrap_or(expr);

    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ExprError::InvalidColor);
    }
    let value = u32::from_str_radix(digits, 16).map_err(|_| ExprError::InvalidColor)?;
    let [a, b, c, d] = value.to_be_bytes();

    match digits.len() {
        6 => Ok(Color::rgbw(b, c, d, 0)),
        8 => Ok(Color::rgbw(a, b, c, d)),
        _ => Err(ExprError::InvalidColor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_forms() {
        assert_eq!(parse_range("all", 10), Ok(PixelRange { start: 0, end: 10 }));
        assert_eq!(parse_range("ALL", 3), Ok(PixelRange::all(3)));
        assert_eq!(parse_range("1", 10), Ok(PixelRange { start: 0, end: 1 }));
        assert_eq!(parse_range("2-4", 10), Ok(PixelRange { start: 1, end: 4 }));
        assert_eq!(parse_range("10-10", 10), Ok(PixelRange { start: 9, end: 10 }));
    }

    #[test]
    fn test_range_rejects() {
        for expr in ["0", "0-3", "4-2", "11", "3-11", "", "-", "1-", "-3", "a", "1-2-3", "+1"] {
            assert_eq!(parse_range(expr, 10), Err(ExprError::InvalidRange), "{}", expr);
        }
        assert_eq!(parse_range("99999999", 10), Err(ExprError::InvalidRange));
    }

    #[test]
    fn test_color_forms() {
        let red = Color::rgbw(0xff, 0, 0, 0);
        assert_eq!(parse_color("#ff0000"), Ok(red));
        assert_eq!(parse_color("0xff0000"), Ok(red));
        assert_eq!(parse_color("FF0000"), Ok(red));
        assert_eq!(parse_color("#01020304"), Ok(Color::rgbw(1, 2, 3, 4)));
    }

    #[test]
    fn test_color_rejects() {
        for expr in ["", "#", "#fff", "#ff00000", "#ff0000000", "#gg0000", "red", "0x-10000"] {
            assert_eq!(parse_color(expr), Err(ExprError::InvalidColor), "{}", expr);
        }
    }

    #[test]
    fn test_wire_order_and_hex() {
        let c = Color::rgbw(0x11, 0x22, 0x33, 0x44);
        assert_eq!(c.wire(), [0x22, 0x11, 0x33, 0x44]);
        assert_eq!(Color::from_wire(&c.wire()), c);
        assert_eq!(Color::from_wire(&[0x22, 0x11, 0x33]), Color::rgbw(0x11, 0x22, 0x33, 0));
        assert_eq!(c.to_hex().as_str(), "#11223344");
    }
}
