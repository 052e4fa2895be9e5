//! Per-frame image processing — pure Rust, pure functions.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** (JPEG, PNG, TIFF, WebP) | `image` crate, format guessed from magic bytes |
//! | **Crop + resample** | `imageops::crop_imm` + Lanczos3 resize |
//! | **Desaturate** | weighted luminance, row-parallel via rayon |
//! | **Smoothing** | separable 3×3 box blur |
//! | **Caption glyphs** | `font8x8` bitmap font, nearest-neighbor scaled |
//! | **Encode** | PNG |
//!
//! The module is split into:
//! - **Calculations**: pure math for crop rects, text layout, brightness
//!   sampling (unit testable without images)
//! - **Glyphs**: bitmap-font measurement and rasterization
//! - **Normalize**: decode → crop → resample → desaturate → smooth → encode
//! - **Overlay**: decode → layout → contrast pick → composite text → encode
//!
//! Every entry point is a pure function from (bytes, parameters) to new
//! bytes. Nothing here retains state, touches the session store, or spawns
//! threads of its own (the desaturation row loop borrows rayon's pool but is
//! bitwise identical to the sequential scan).

mod calculations;
pub(crate) mod codec;
mod glyphs;
mod normalize;
mod overlay;

use thiserror::Error;

pub use calculations::{
    BLACK, CropRect, SampleRect, TextBlockLayout, WHITE, average_brightness, choose_contrast_color,
    clamp_offset, crop_rect, layout_text_block, luminance, sample_rect,
};
pub use normalize::{NormalizeOptions, normalize};
pub use overlay::{Overlay, render_overlay};

/// Errors surfaced by the imaging core. Both are terminal for the single
/// call that raised them; callers decide what happens to the item.
#[derive(Error, Debug)]
pub enum ImagingError {
    /// The supplied bytes could not be decoded as an image.
    #[error("Failed to decode image data: {0}")]
    Decode(String),
    /// Compositing or encoding machinery failed.
    #[error("Failed to render image: {0}")]
    Render(String),
}
