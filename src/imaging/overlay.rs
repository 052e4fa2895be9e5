//! Caption overlay rendering: multi-line centered text with automatic
//! contrast against the normalized frame.
//!
//! The whole frame is recomposited from scratch on every call — no
//! incremental redraw, no cached layout — so two calls with the same inputs
//! produce identical bytes. Color selection samples the frame *before* any
//! ink is laid down: the widest line × block height rectangle around the
//! anchor decides black-on-light or white-on-dark, unless the caller forced
//! a color.

use super::codec;
use super::glyphs::{self, LineBitmap};
use super::{
    BLACK, ImagingError, average_brightness, choose_contrast_color, layout_text_block, sample_rect,
};
use crate::config::DEFAULT_TEXT_COLOR;
use crate::types::TextSettings;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

/// Neutral brightness assumed when the sample rectangle is degenerate.
const NEUTRAL_BRIGHTNESS: f64 = 128.0;

/// Edge treatment for black text on light backgrounds: a translucent black
/// under-strike offset one pixel down-right. White text gets none.
const SHADOW_OFFSET: i32 = 1;
const SHADOW_ALPHA: u8 = 153;

/// Result of one overlay render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    /// The recomposited frame, PNG-encoded.
    pub png: Vec<u8>,
    /// The color actually used, hex `#RRGGBB`. Callers persist this back
    /// into their settings record.
    pub chosen_color: String,
}

/// Composite `text` onto a normalized frame.
///
/// With empty/whitespace text or an inactive overlay the frame passes
/// through untouched (re-encoded) and `chosen_color` echoes the settings'
/// current color. Never mutates `settings`.
pub fn render_overlay(
    base: &[u8],
    text: &str,
    settings: &TextSettings,
    width: u32,
    height: u32,
) -> Result<Overlay, ImagingError> {
    let decoded = codec::decode_rgba(base)?;
    let mut canvas = if decoded.dimensions() == (width, height) {
        decoded
    } else {
        imageops::resize(&decoded, width, height, FilterType::Lanczos3)
    };

    if text.trim().is_empty() || !settings.is_active {
        let chosen_color = if settings.color.is_empty() {
            DEFAULT_TEXT_COLOR.to_string()
        } else {
            settings.color.clone()
        };
        return Ok(Overlay {
            png: codec::encode_png(&canvas)?,
            chosen_color,
        });
    }

    // Empty lines are preserved: they contribute height, not ink.
    let lines: Vec<&str> = text.split('\n').collect();
    let scale = glyphs::scale_for_font_size(settings.font_size);
    let widest = lines
        .iter()
        .map(|line| glyphs::line_width(line, scale))
        .max()
        .unwrap_or(0);

    let layout = layout_text_block(
        lines.len(),
        settings.font_size,
        width,
        height,
        settings.x_offset,
        settings.y_offset,
    );

    let chosen_color = match &settings.manual_color_override {
        Some(color) => color.clone(),
        None => {
            let brightness = sample_rect(
                layout.anchor_x,
                layout.block_center_y,
                widest as f64,
                layout.total_height,
                width,
                height,
            )
            .map(|rect| average_brightness(&canvas, &rect))
            .unwrap_or(NEUTRAL_BRIGHTNESS);
            choose_contrast_color(brightness).to_string()
        }
    };
    let ink = parse_hex_rgb(&chosen_color)
        .ok_or_else(|| ImagingError::Render(format!("unsupported text color {chosen_color:?}")))?;
    let with_shadow = chosen_color.eq_ignore_ascii_case(BLACK);

    let mut line_center_y = layout.first_line_center_y;
    for line in &lines {
        let bitmap = glyphs::embolden(&glyphs::rasterize_line(line, scale));
        let origin_x = (layout.anchor_x - bitmap.width as f64 / 2.0).round() as i32;
        let origin_y = (line_center_y - bitmap.height as f64 / 2.0).round() as i32;

        if with_shadow {
            composite(
                &mut canvas,
                &bitmap,
                origin_x + SHADOW_OFFSET,
                origin_y + SHADOW_OFFSET,
                (0, 0, 0),
                SHADOW_ALPHA,
            );
        }
        composite(&mut canvas, &bitmap, origin_x, origin_y, ink, 255);

        line_center_y += layout.line_height;
    }

    Ok(Overlay {
        png: codec::encode_png(&canvas)?,
        chosen_color,
    })
}

/// Blend a line bitmap onto the canvas with the standard "over" operator,
/// clipping pixels that land outside.
fn composite(
    canvas: &mut RgbaImage,
    bitmap: &LineBitmap,
    origin_x: i32,
    origin_y: i32,
    rgb: (u8, u8, u8),
    alpha: u8,
) {
    if alpha == 0 {
        return;
    }
    let (w, h) = canvas.dimensions();
    let inv = 255u16 - alpha as u16;
    for &(px, py) in &bitmap.pixels {
        let tx = origin_x + px;
        let ty = origin_y + py;
        if tx < 0 || ty < 0 || tx >= w as i32 || ty >= h as i32 {
            continue;
        }
        let dst = canvas.get_pixel_mut(tx as u32, ty as u32);
        let blend =
            |d: u8, s: u8| -> u8 { ((d as u16 * inv + s as u16 * alpha as u16) / 255) as u8 };
        let out_alpha = alpha as u16 + (dst[3] as u16 * inv + 127) / 255;
        *dst = Rgba([
            blend(dst[0], rgb.0),
            blend(dst[1], rgb.1),
            blend(dst[2], rgb.2),
            out_alpha.min(255) as u8,
        ]);
    }
}

/// Parse `#RRGGBB` (leading `#` optional) into RGB components.
fn parse_hex_rgb(input: &str) -> Option<(u8, u8, u8)> {
    let hex = input.trim().trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}
