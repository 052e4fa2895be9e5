//! Bitmap-font measurement and rasterization for caption lines.
//!
//! Glyphs come from the 8×8 `font8x8` basic set, scaled up nearest-neighbor
//! so the rendered height tracks the requested font size. Characters outside
//! the basic set fall back to `?`. Because the metrics are exact integers,
//! the widest-line measurement the contrast sampler needs is free — no text
//! shaping engine required.

use font8x8::{BASIC_FONTS, UnicodeFonts};
use std::collections::HashSet;

/// Native glyph cell size in pixels.
pub const GLYPH_DIM: u32 = 8;

/// Nearest-neighbor scale factor for a requested font size in pixels.
///
/// Rendered glyph height is `GLYPH_DIM * scale`, the closest the bitmap font
/// gets to the requested size; never below 1.
pub fn scale_for_font_size(font_size: u32) -> u32 {
    ((font_size as f64 / GLYPH_DIM as f64).round() as u32).max(1)
}

/// Rendered width of a line at the given scale: one cell per character plus
/// a one-scaled-pixel gap between characters. Empty lines have zero width.
pub fn line_width(line: &str, scale: u32) -> u32 {
    let n = line.chars().count() as u32;
    if n == 0 {
        0
    } else {
        n * GLYPH_DIM * scale + (n - 1) * scale
    }
}

/// Rendered height of any line at the given scale.
pub fn line_height(scale: u32) -> u32 {
    GLYPH_DIM * scale
}

/// Lit pixels of one rasterized line, relative to its top-left corner.
#[derive(Debug, Clone)]
pub struct LineBitmap {
    pub pixels: Vec<(i32, i32)>,
    pub width: u32,
    pub height: u32,
}

/// Rasterize a line of text at the given scale.
pub fn rasterize_line(line: &str, scale: u32) -> LineBitmap {
    let scale = scale.max(1);
    let gap = scale as i32;
    let cell = (GLYPH_DIM * scale) as i32;
    let mut pixels = Vec::new();
    let mut cursor_x: i32 = 0;

    for ch in line.chars() {
        let glyph = BASIC_FONTS
            .get(ch)
            .unwrap_or_else(|| BASIC_FONTS.get('?').unwrap());
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_DIM as usize {
                if (bits >> col) & 1 == 0 {
                    continue;
                }
                let base_x = cursor_x + (col as u32 * scale) as i32;
                let base_y = (row as u32 * scale) as i32;
                for dx in 0..scale as i32 {
                    for dy in 0..scale as i32 {
                        pixels.push((base_x + dx, base_y + dy));
                    }
                }
            }
        }
        cursor_x += cell + gap;
    }

    LineBitmap {
        pixels,
        width: line_width(line, scale),
        height: line_height(scale),
    }
}

/// Thicken a line bitmap by double-striking one pixel to the right — the
/// bitmap-font stand-in for a bold weight. Pixels are deduplicated so
/// translucent passes blend each position exactly once.
pub fn embolden(bitmap: &LineBitmap) -> LineBitmap {
    let mut seen: HashSet<(i32, i32)> = HashSet::with_capacity(bitmap.pixels.len() * 2);
    for &(x, y) in &bitmap.pixels {
        seen.insert((x, y));
        seen.insert((x + 1, y));
    }
    let width = if bitmap.width == 0 {
        0
    } else {
        bitmap.width + 1
    };
    LineBitmap {
        pixels: seen.into_iter().collect(),
        width,
        height: bitmap.height,
    }
}
