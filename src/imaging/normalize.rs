//! Frame normalization: decode → center-crop → resample → desaturate →
//! optional smoothing → PNG.
//!
//! The output canvas is always exactly the configured target size, whatever
//! the source dimensions. Desaturation uses the fixed 0.299/0.587/0.114
//! weights (a compatibility requirement); the smoothing pass is a single
//! separable 3×3 box blur, just enough to soften without changing content.

use super::codec;
use super::{ImagingError, crop_rect, luminance};
use crate::config::Config;
use image::RgbaImage;
use image::imageops::{self, FilterType};
use rayon::prelude::*;

/// Parameters for one normalization call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub target_width: u32,
    pub target_height: u32,
    pub smoothing: bool,
}

impl NormalizeOptions {
    pub fn from_config(config: &Config, smoothing: bool) -> Self {
        Self {
            target_width: config.target_width,
            target_height: config.target_height,
            smoothing,
        }
    }
}

/// Normalize one encoded image to a grayscale frame of exactly the target
/// size. Pure: consumes nothing, retains nothing.
pub fn normalize(bytes: &[u8], opts: &NormalizeOptions) -> Result<Vec<u8>, ImagingError> {
    let source = codec::decode_rgba(bytes)?;

    let rect = crop_rect(
        (source.width(), source.height()),
        (opts.target_width, opts.target_height),
    );
    let cropped = imageops::crop_imm(&source, rect.x, rect.y, rect.width, rect.height).to_image();
    let mut frame = imageops::resize(
        &cropped,
        opts.target_width,
        opts.target_height,
        FilterType::Lanczos3,
    );

    desaturate(&mut frame);
    if opts.smoothing {
        box_blur(&mut frame);
    }

    codec::encode_png(&frame)
}

/// Replace every pixel's RGB with its rounded weighted luminance, leaving
/// alpha untouched. Row-parallel; bitwise identical to the sequential scan.
pub(crate) fn desaturate(frame: &mut RgbaImage) {
    let row_len = frame.width() as usize * 4;
    if row_len == 0 {
        return;
    }
    frame.par_chunks_exact_mut(row_len).for_each(|row| {
        for px in row.chunks_exact_mut(4) {
            let l = luminance(px[0], px[1], px[2]).round() as u8;
            px[0] = l;
            px[1] = l;
            px[2] = l;
        }
    });
}

/// One separable 3×3 box-blur pass over all four channels, clamping at the
/// edges. Intermediate values stay in f32 until the final rounding.
pub(crate) fn box_blur(frame: &mut RgbaImage) {
    let w = frame.width() as usize;
    let h = frame.height() as usize;
    if w == 0 || h == 0 {
        return;
    }

    let src: Vec<u8> = frame.as_raw().clone();
    let mut horizontal = vec![0f32; src.len()];

    for y in 0..h {
        for x in 0..w {
            for c in 0..4 {
                let mut sum = 0f32;
                for dx in -1i32..=1 {
                    let sx = (x as i32 + dx).clamp(0, w as i32 - 1) as usize;
                    sum += src[(y * w + sx) * 4 + c] as f32;
                }
                horizontal[(y * w + x) * 4 + c] = sum / 3.0;
            }
        }
    }

    let out: &mut [u8] = frame;
    for y in 0..h {
        for x in 0..w {
            for c in 0..4 {
                let mut sum = 0f32;
                for dy in -1i32..=1 {
                    let sy = (y as i32 + dy).clamp(0, h as i32 - 1) as usize;
                    sum += horizontal[(sy * w + x) * 4 + c];
                }
                out[(y * w + x) * 4 + c] = (sum / 3.0).round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn opts(width: u32, height: u32, smoothing: bool) -> NormalizeOptions {
        NormalizeOptions {
            target_width: width,
            target_height: height,
            smoothing,
        }
    }

    fn encode(frame: &RgbaImage) -> Vec<u8> {
        codec::encode_png(frame).unwrap()
    }

    #[test]
    fn output_is_always_target_sized() {
        for (sw, sh) in [(100, 100), (1600, 1200), (1200, 1600), (50, 900), (900, 7)] {
            let source = encode(&RgbaImage::from_pixel(sw, sh, Rgba([10, 20, 30, 255])));
            let png = normalize(&source, &opts(600, 800, false)).unwrap();
            let result = codec::decode_rgba(&png).unwrap();
            assert_eq!(result.dimensions(), (600, 800), "source {sw}x{sh}");
        }
    }

    #[test]
    fn solid_color_maps_to_its_luminance() {
        // (200, 100, 50) → 0.299*200 + 0.587*100 + 0.114*50 = 124.2 → 124.
        let source = encode(&RgbaImage::from_pixel(300, 400, Rgba([200, 100, 50, 255])));
        let png = normalize(&source, &opts(300, 400, false)).unwrap();
        let result = codec::decode_rgba(&png).unwrap();
        for px in result.pixels() {
            assert_eq!(px.0, [124, 124, 124, 255]);
        }
    }

    #[test]
    fn desaturation_is_idempotent() {
        let mut frame = RgbaImage::from_fn(20, 20, |x, y| {
            Rgba([(x * 13) as u8, (y * 7) as u8, 99, 255])
        });
        desaturate(&mut frame);
        let once = frame.clone();
        desaturate(&mut frame);
        assert_eq!(frame, once);
    }

    #[test]
    fn matching_aspect_uses_full_frame() {
        // 3:4 source, 3:4 target: distinct corner colors survive into the
        // output, proving nothing was cropped away.
        let mut source = RgbaImage::from_pixel(1200, 1600, Rgba([255, 255, 255, 255]));
        for y in 0..100 {
            for x in 0..100 {
                source.put_pixel(x, y, Rgba([0, 0, 0, 255]));
                source.put_pixel(1199 - x, 1599 - y, Rgba([0, 0, 0, 255]));
            }
        }
        let png = normalize(&encode(&source), &opts(600, 800, false)).unwrap();
        let result = codec::decode_rgba(&png).unwrap();
        assert_eq!(result.dimensions(), (600, 800));
        // Both corners stay dark, center stays bright.
        assert!(result.get_pixel(5, 5)[0] < 64);
        assert!(result.get_pixel(594, 794)[0] < 64);
        assert!(result.get_pixel(300, 400)[0] > 192);
    }

    #[test]
    fn landscape_source_loses_symmetric_margins() {
        // 1600x1200 with 350px red/blue side margins and a white middle:
        // the 3:4 center crop is exactly the white region.
        let source = RgbaImage::from_fn(1600, 1200, |x, _| {
            if x < 350 {
                Rgba([255, 0, 0, 255])
            } else if x >= 1250 {
                Rgba([0, 0, 255, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        let png = normalize(&encode(&source), &opts(600, 800, false)).unwrap();
        let result = codec::decode_rgba(&png).unwrap();
        assert_eq!(result.dimensions(), (600, 800));
        for px in result.pixels() {
            assert_eq!(px.0, [255, 255, 255, 255]);
        }
    }

    #[test]
    fn smoothing_preserves_uniform_frames() {
        let source = encode(&RgbaImage::from_pixel(300, 400, Rgba([90, 90, 90, 255])));
        let plain = normalize(&source, &opts(300, 400, false)).unwrap();
        let smoothed = normalize(&source, &opts(300, 400, true)).unwrap();
        assert_eq!(
            codec::decode_rgba(&plain).unwrap(),
            codec::decode_rgba(&smoothed).unwrap()
        );
    }

    #[test]
    fn smoothing_softens_hard_edges() {
        // Sharp black/white vertical split; the blurred frame must differ.
        let source = RgbaImage::from_fn(300, 400, |x, _| {
            if x < 150 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        let bytes = encode(&source);
        let plain = codec::decode_rgba(&normalize(&bytes, &opts(300, 400, false)).unwrap()).unwrap();
        let smoothed =
            codec::decode_rgba(&normalize(&bytes, &opts(300, 400, true)).unwrap()).unwrap();
        assert_ne!(plain, smoothed);
        // The edge got intermediate values.
        let edge = smoothed.get_pixel(150, 200)[0];
        assert!(edge > 0 && edge < 255, "edge pixel {edge} not softened");
    }

    #[test]
    fn box_blur_averages_neighbors() {
        // Single bright pixel in a dark 3x3: center becomes the mean of the
        // whole neighborhood after the separable pass.
        let mut frame = RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 255]));
        frame.put_pixel(1, 1, Rgba([90, 90, 90, 255]));
        box_blur(&mut frame);
        assert_eq!(frame.get_pixel(1, 1).0[0], 10);
        assert_eq!(frame.get_pixel(0, 0).0[0], 10);
    }

    #[test]
    fn undecodable_bytes_fail_with_decode_error() {
        let err = normalize(b"garbage", &opts(600, 800, false)).unwrap_err();
        assert!(matches!(err, ImagingError::Decode(_)));
    }
}
