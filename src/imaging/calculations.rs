//! Pure calculation functions for cropping, text layout, and brightness.
//!
//! Everything here is testable without decoding a single image. The only
//! exception is [`average_brightness`], which reads a pixel buffer but does
//! no drawing — it exists separately from the overlay compositor precisely so
//! contrast selection can be unit-tested against synthetic buffers.

use image::RgbaImage;

/// Hex color for black caption text.
pub const BLACK: &str = "#000000";
/// Hex color for white caption text.
pub const WHITE: &str = "#FFFFFF";

/// Extra leading between caption lines, as a fraction of the font size.
const LINE_SPACING_FACTOR: f64 = 1.2;

/// Weighted luminance of one pixel, non-gamma-corrected.
///
/// The 0.299/0.587/0.114 weights are a compatibility requirement of the
/// output format — do not swap in BT.709 coefficients.
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}

/// A crop rectangle in source-image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Compute the centered crop of `source` whose aspect ratio equals
/// `target`'s.
///
/// A relatively wider source keeps its full height and gives up symmetric
/// left/right margins; a relatively taller source keeps its full width and
/// gives up top/bottom margins; matching aspect ratios keep the full frame.
///
/// # Examples
/// ```
/// # use tintype::imaging::crop_rect;
/// // 4:3 landscape into a 3:4 portrait target: symmetric side margins.
/// let rect = crop_rect((1600, 1200), (600, 800));
/// assert_eq!((rect.x, rect.y), (350, 0));
/// assert_eq!((rect.width, rect.height), (900, 1200));
///
/// // Aspect ratios match: full frame.
/// let rect = crop_rect((1200, 1600), (600, 800));
/// assert_eq!((rect.x, rect.y, rect.width, rect.height), (0, 0, 1200, 1600));
/// ```
pub fn crop_rect(source: (u32, u32), target: (u32, u32)) -> CropRect {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    // Cross-multiplied aspect comparison — exact, no float equality.
    let src_cross = src_w as u64 * tgt_h as u64;
    let tgt_cross = src_h as u64 * tgt_w as u64;

    if src_cross > tgt_cross {
        // Source is relatively wider: full height, trimmed sides.
        let crop_w = (src_h as f64 * tgt_w as f64 / tgt_h as f64)
            .round()
            .clamp(1.0, src_w as f64) as u32;
        CropRect {
            x: (src_w - crop_w) / 2,
            y: 0,
            width: crop_w,
            height: src_h,
        }
    } else if src_cross < tgt_cross {
        // Source is relatively taller: full width, trimmed top/bottom.
        let crop_h = (src_w as f64 * tgt_h as f64 / tgt_w as f64)
            .round()
            .clamp(1.0, src_h as f64) as u32;
        CropRect {
            x: 0,
            y: (src_h - crop_h) / 2,
            width: src_w,
            height: crop_h,
        }
    } else {
        CropRect {
            x: 0,
            y: 0,
            width: src_w,
            height: src_h,
        }
    }
}

/// Clamp a caption offset to ± half the canvas extent on that axis.
pub fn clamp_offset(value: i32, extent: u32) -> i32 {
    let half = (extent / 2) as i32;
    value.clamp(-half, half)
}

/// Geometry of a multi-line caption block on the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextBlockLayout {
    /// Horizontal center of every line.
    pub anchor_x: f64,
    /// Vertical center of the whole block.
    pub block_center_y: f64,
    /// Vertical center of the first line.
    pub first_line_center_y: f64,
    /// Advance between consecutive line centers.
    pub line_height: f64,
    /// Height of the whole block: n lines of text plus (n-1) leadings.
    pub total_height: f64,
}

/// Lay out a caption block of `line_count` lines centered around the canvas
/// center plus the caption offsets.
pub fn layout_text_block(
    line_count: usize,
    font_size: u32,
    canvas_width: u32,
    canvas_height: u32,
    x_offset: i32,
    y_offset: i32,
) -> TextBlockLayout {
    let font_size = font_size as f64;
    let n = line_count as f64;
    let line_height = font_size * LINE_SPACING_FACTOR;
    let total_height = n * font_size + (n - 1.0).max(0.0) * font_size * (LINE_SPACING_FACTOR - 1.0);

    let anchor_x = canvas_width as f64 / 2.0 + x_offset as f64;
    let block_center_y = canvas_height as f64 / 2.0 + y_offset as f64;
    let first_line_center_y = block_center_y - total_height / 2.0 + font_size / 2.0;

    TextBlockLayout {
        anchor_x,
        block_center_y,
        first_line_center_y,
        line_height,
        total_height,
    }
}

/// A sampling rectangle in canvas coordinates, guaranteed non-empty and
/// inside the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// The rectangle to sample for background brightness: `block_width` ×
/// `block_height`, centered on the caption anchor, clamped to the canvas and
/// to at least 1×1 where it overlaps at all.
///
/// Returns `None` for degenerate inputs (zero-sized block, or a block
/// entirely off-canvas); callers treat that as neutral brightness.
pub fn sample_rect(
    anchor_x: f64,
    block_center_y: f64,
    block_width: f64,
    block_height: f64,
    canvas_width: u32,
    canvas_height: u32,
) -> Option<SampleRect> {
    if block_width <= 0.0 || block_height <= 0.0 || canvas_width == 0 || canvas_height == 0 {
        return None;
    }

    let left = (anchor_x - block_width / 2.0).floor();
    let top = (block_center_y - block_height / 2.0).floor();
    let width = block_width.ceil().max(1.0);
    let height = block_height.ceil().max(1.0);

    let x0 = left.max(0.0) as u32;
    let y0 = top.max(0.0) as u32;
    let x1 = ((left + width).min(canvas_width as f64)) as u32;
    let y1 = ((top + height).min(canvas_height as f64)) as u32;

    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    Some(SampleRect {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    })
}

/// Mean brightness over a rectangle of an already-grayscale buffer.
///
/// Reads the red channel only — after desaturation R=G=B, so one channel is
/// the luminance.
pub fn average_brightness(frame: &RgbaImage, rect: &SampleRect) -> f64 {
    let mut sum: u64 = 0;
    for y in rect.y..rect.y + rect.height {
        for x in rect.x..rect.x + rect.width {
            sum += frame.get_pixel(x, y)[0] as u64;
        }
    }
    sum as f64 / (rect.width as u64 * rect.height as u64) as f64
}

/// Pick the caption color that contrasts with the sampled background.
///
/// Strictly brighter than mid-gray gets black text; everything else,
/// including exactly 128, gets white.
pub fn choose_contrast_color(brightness: f64) -> &'static str {
    if brightness > 128.0 { BLACK } else { WHITE }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    // =========================================================================
    // crop_rect tests
    // =========================================================================

    #[test]
    fn crop_matching_aspect_uses_full_frame() {
        let rect = crop_rect((1200, 1600), (600, 800));
        assert_eq!(
            rect,
            CropRect {
                x: 0,
                y: 0,
                width: 1200,
                height: 1600
            }
        );
    }

    #[test]
    fn crop_wider_source_trims_sides_symmetrically() {
        // 1600x1200 into 3:4: crop width = 1200 * 600/800 = 900, x = 350.
        let rect = crop_rect((1600, 1200), (600, 800));
        assert_eq!(
            rect,
            CropRect {
                x: 350,
                y: 0,
                width: 900,
                height: 1200
            }
        );
        // Symmetric margins (even leftover splits evenly).
        assert_eq!(rect.x, 1600 - rect.width - rect.x);
    }

    #[test]
    fn crop_taller_source_trims_top_and_bottom() {
        // 600x1800 into 3:4: crop height = 600 * 800/600 = 800, y = 500.
        let rect = crop_rect((600, 1800), (600, 800));
        assert_eq!(
            rect,
            CropRect {
                x: 0,
                y: 500,
                width: 600,
                height: 800
            }
        );
    }

    #[test]
    fn crop_square_source_into_portrait() {
        // 1000x1000 into 3:4: source is relatively wider, crop width = 750.
        let rect = crop_rect((1000, 1000), (600, 800));
        assert_eq!(rect.width, 750);
        assert_eq!(rect.height, 1000);
        assert_eq!(rect.x, 125);
    }

    #[test]
    fn crop_never_degenerates_to_zero() {
        let rect = crop_rect((1, 5000), (600, 800));
        assert!(rect.width >= 1 && rect.height >= 1);
        let rect = crop_rect((5000, 1), (600, 800));
        assert!(rect.width >= 1 && rect.height >= 1);
    }

    // =========================================================================
    // offset clamp tests
    // =========================================================================

    #[test]
    fn offsets_clamp_to_half_extent() {
        assert_eq!(clamp_offset(0, 600), 0);
        assert_eq!(clamp_offset(300, 600), 300);
        assert_eq!(clamp_offset(301, 600), 300);
        assert_eq!(clamp_offset(-301, 600), -300);
        assert_eq!(clamp_offset(9999, 800), 400);
        assert_eq!(clamp_offset(-9999, 800), -400);
    }

    // =========================================================================
    // layout tests
    // =========================================================================

    #[test]
    fn single_line_is_centered_on_block_center() {
        let l = layout_text_block(1, 24, 600, 800, 0, 0);
        assert_eq!(l.total_height, 24.0);
        assert_eq!(l.anchor_x, 300.0);
        assert_eq!(l.block_center_y, 400.0);
        // One line: its center is the block center.
        assert_eq!(l.first_line_center_y, 400.0);
        assert!((l.line_height - 28.8).abs() < 1e-9);
    }

    #[test]
    fn multi_line_block_height_includes_leading() {
        // 3 lines of 24px: 3*24 + 2*4.8 = 81.6.
        let l = layout_text_block(3, 24, 600, 800, 0, 0);
        assert!((l.total_height - 81.6).abs() < 1e-9);
        // First line center: 400 - 40.8 + 12 = 371.2.
        assert!((l.first_line_center_y - 371.2).abs() < 1e-9);
    }

    #[test]
    fn offsets_shift_the_anchor() {
        let l = layout_text_block(1, 24, 600, 800, -50, 120);
        assert_eq!(l.anchor_x, 250.0);
        assert_eq!(l.block_center_y, 520.0);
    }

    // =========================================================================
    // sample rect tests
    // =========================================================================

    #[test]
    fn sample_rect_centered_block() {
        let rect = sample_rect(300.0, 400.0, 100.0, 50.0, 600, 800).unwrap();
        assert_eq!(
            rect,
            SampleRect {
                x: 250,
                y: 375,
                width: 100,
                height: 50
            }
        );
    }

    #[test]
    fn sample_rect_clamps_to_canvas() {
        // Anchor near the left edge: rectangle loses its off-canvas half.
        let rect = sample_rect(10.0, 400.0, 100.0, 50.0, 600, 800).unwrap();
        assert_eq!(rect.x, 0);
        assert_eq!(rect.width, 60);
    }

    #[test]
    fn sample_rect_degenerate_inputs_are_none() {
        assert!(sample_rect(300.0, 400.0, 0.0, 50.0, 600, 800).is_none());
        assert!(sample_rect(300.0, 400.0, 100.0, 0.0, 600, 800).is_none());
        // Entirely off-canvas.
        assert!(sample_rect(-500.0, 400.0, 100.0, 50.0, 600, 800).is_none());
    }

    #[test]
    fn sample_rect_fractional_block_is_at_least_one_pixel() {
        let rect = sample_rect(300.0, 400.0, 0.4, 0.4, 600, 800).unwrap();
        assert_eq!(rect.width, 1);
        assert_eq!(rect.height, 1);
    }

    // =========================================================================
    // brightness tests
    // =========================================================================

    #[test]
    fn average_brightness_of_uniform_buffer() {
        let frame = RgbaImage::from_pixel(10, 10, Rgba([77, 77, 77, 255]));
        let rect = SampleRect {
            x: 2,
            y: 2,
            width: 5,
            height: 5,
        };
        assert_eq!(average_brightness(&frame, &rect), 77.0);
    }

    #[test]
    fn average_brightness_mixes_regions() {
        // Left half 0, right half 200; full-width sample averages to 100.
        let frame = RgbaImage::from_fn(10, 4, |x, _| {
            if x < 5 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([200, 200, 200, 255])
            }
        });
        let rect = SampleRect {
            x: 0,
            y: 0,
            width: 10,
            height: 4,
        };
        assert_eq!(average_brightness(&frame, &rect), 100.0);
    }

    #[test]
    fn contrast_threshold_is_strictly_above_128() {
        assert_eq!(choose_contrast_color(128.0), WHITE);
        assert_eq!(choose_contrast_color(128.1), BLACK);
        assert_eq!(choose_contrast_color(127.9), WHITE);
        assert_eq!(choose_contrast_color(255.0), BLACK);
        assert_eq!(choose_contrast_color(0.0), WHITE);
    }

    // =========================================================================
    // luminance tests
    // =========================================================================

    #[test]
    fn luminance_uses_exact_weights() {
        assert_eq!(luminance(255, 255, 255), 255.0);
        assert_eq!(luminance(0, 0, 0), 0.0);
        assert!((luminance(200, 100, 50) - 124.2).abs() < 1e-9);
        assert!((luminance(255, 0, 0) - 76.245).abs() < 1e-9);
    }
}
