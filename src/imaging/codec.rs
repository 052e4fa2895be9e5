//! In-memory decode/encode shared by the normalize and overlay stages.

use super::ImagingError;
use image::{ExtendedColorType, ImageEncoder, ImageReader, RgbaImage};
use std::io::Cursor;

/// Decode encoded bytes into an RGBA buffer, honoring magic bytes over any
/// extension hint the caller might have had.
pub(crate) fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, ImagingError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImagingError::Decode(e.to_string()))?;
    let decoded = reader
        .decode()
        .map_err(|e| ImagingError::Decode(e.to_string()))?;
    Ok(decoded.to_rgba8())
}

/// Encode an RGBA buffer as PNG.
pub(crate) fn encode_png(frame: &RgbaImage) -> Result<Vec<u8>, ImagingError> {
    let mut buffer = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(Cursor::new(&mut buffer));
    encoder
        .write_image(
            frame.as_raw(),
            frame.width(),
            frame.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| ImagingError::Render(format!("PNG encode failed: {e}")))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn png_round_trip_preserves_pixels() {
        let frame = RgbaImage::from_fn(3, 2, |x, y| Rgba([x as u8 * 10, y as u8 * 20, 7, 255]));
        let png = encode_png(&frame).unwrap();
        let decoded = decode_rgba(&png).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn garbage_bytes_fail_with_decode_error() {
        let err = decode_rgba(b"not an image at all").unwrap_err();
        assert!(matches!(err, ImagingError::Decode(_)));
    }

    #[test]
    fn empty_bytes_fail_with_decode_error() {
        assert!(matches!(decode_rgba(&[]), Err(ImagingError::Decode(_))));
    }
}
