use anyhow::{bail, Result};
use tiny_skia::Color;

/// Cursor position in canvas coordinates. Negative values are legal while
/// chaining moves; drawing clips to the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Four-sided inset applied when anchoring an element relative to the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Margins {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Margins {
    pub const NONE: Margins = Margins {
        left: 0,
        top: 0,
        right: 0,
        bottom: 0,
    };

    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }
}

/// Parses `#rrggbb` or `#rrggbbaa`.
pub fn parse_hex_color(raw: &str) -> Result<Color> {
    let hex = raw.trim().strip_prefix('#').unwrap_or(raw.trim());
    if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
        bail!("invalid color '{raw}', expected #rrggbb or #rrggbbaa");
    }

    let channel = |index: usize| -> Result<u8> {
        u8::from_str_radix(&hex[index..index + 2], 16)
            .map_err(|_| anyhow::anyhow!("invalid color '{raw}', non-hex digit"))
    };

    let r = channel(0)?;
    let g = channel(2)?;
    let b = channel(4)?;
    let a = if hex.len() == 8 { channel(6)? } else { 255 };
    Ok(Color::from_rgba8(r, g, b, a))
}
