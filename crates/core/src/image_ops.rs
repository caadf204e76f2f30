//! Client-image preparation: bounded downscale + JPEG re-encode.
//!
//! Input images are resized to fit within 800×800 before they are sent to a
//! provider, to bound payload size and provider-side cost. Images already
//! inside the bound are re-encoded but never upscaled.

use base64::Engine;
use image::imageops::FilterType;
use image::ImageReader;
use std::io::Cursor;

use crate::error::CoreError;
use crate::generation::ImagePayload;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Longest allowed edge for provider-bound images.
pub const MAX_DIMENSION: u32 = 800;

/// JPEG re-encode quality (0-100, matching canvas quality 0.8).
pub const JPEG_QUALITY: u8 = 80;

/// Mime type of every prepared image.
pub const PREPARED_MIME: &str = "image/jpeg";

// ---------------------------------------------------------------------------
// Dimension math
// ---------------------------------------------------------------------------

/// Compute output dimensions that fit within `max`×`max`.
///
/// Downscale only: dimensions already inside the bound are returned
/// unchanged. Aspect ratio is preserved within rounding; the longer edge of
/// an oversized image lands exactly on `max`.
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }
    if width >= height {
        let scaled = (height as f64 * max as f64 / width as f64).round() as u32;
        (max, scaled.max(1))
    } else {
        let scaled = (width as f64 * max as f64 / height as f64).round() as u32;
        (scaled.max(1), max)
    }
}

// ---------------------------------------------------------------------------
// Preparation
// ---------------------------------------------------------------------------

/// Decode raw image bytes, downscale to the provider bound, and re-encode as
/// base64 JPEG.
///
/// Empty or undecodable input is a local validation failure: it is reported
/// before any network call and never reaches a provider.
pub fn prepare_for_generation(bytes: &[u8]) -> Result<ImagePayload, CoreError> {
    if bytes.is_empty() {
        return Err(CoreError::Validation(
            "Imagem vazia ou corrompida. Envie o arquivo novamente.".into(),
        ));
    }

    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CoreError::Validation(format!("Unreadable image data: {e}")))?
        .decode()
        .map_err(|e| CoreError::Validation(format!("Imagem corrompida: {e}")))?;

    let (w, h) = (img.width(), img.height());
    let (tw, th) = fit_within(w, h, MAX_DIMENSION);
    let resized = if (tw, th) == (w, h) {
        img
    } else {
        img.resize_exact(tw, th, FilterType::Lanczos3)
    };

    let mut jpeg = Vec::new();
    let encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(Cursor::new(&mut jpeg), JPEG_QUALITY);
    resized
        .into_rgb8()
        .write_with_encoder(encoder)
        .map_err(|e| CoreError::Internal(format!("JPEG encoding failed: {e}")))?;

    Ok(ImagePayload {
        data_b64: base64::engine::general_purpose::STANDARD.encode(&jpeg),
        mime_type: PREPARED_MIME.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- fit_within --

    #[test]
    fn oversized_landscape_longer_edge_hits_max() {
        assert_eq!(fit_within(1600, 900, 800), (800, 450));
    }

    #[test]
    fn oversized_portrait_longer_edge_hits_max() {
        assert_eq!(fit_within(900, 1600, 800), (450, 800));
    }

    #[test]
    fn square_oversized() {
        assert_eq!(fit_within(2000, 2000, 800), (800, 800));
    }

    #[test]
    fn within_bound_unchanged() {
        assert_eq!(fit_within(800, 800, 800), (800, 800));
        assert_eq!(fit_within(640, 480, 800), (640, 480));
        assert_eq!(fit_within(1, 1, 800), (1, 1));
    }

    #[test]
    fn extreme_ratio_never_collapses_to_zero() {
        let (w, h) = fit_within(100_000, 10, 800);
        assert_eq!(w, 800);
        assert!(h >= 1);
    }

    #[test]
    fn aspect_ratio_preserved_within_rounding() {
        let (w, h) = fit_within(1333, 1000, 800);
        let input_ratio = 1333.0 / 1000.0;
        let output_ratio = w as f64 / h as f64;
        assert!((input_ratio - output_ratio).abs() < 0.01);
    }

    // -- prepare_for_generation --

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([120, 80, 200]));
        let mut out = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    fn decoded_dims(payload: &ImagePayload) -> (u32, u32) {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&payload.data_b64)
            .unwrap();
        let img = image::load_from_memory(&bytes).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn large_image_is_downscaled_to_bound() {
        let payload = prepare_for_generation(&png_bytes(1000, 500)).unwrap();
        assert_eq!(payload.mime_type, "image/jpeg");
        assert_eq!(decoded_dims(&payload), (800, 400));
    }

    #[test]
    fn small_image_is_not_upscaled() {
        let payload = prepare_for_generation(&png_bytes(320, 200)).unwrap();
        assert_eq!(decoded_dims(&payload), (320, 200));
    }

    #[test]
    fn empty_input_is_a_validation_error() {
        let err = prepare_for_generation(&[]).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn garbage_input_is_a_validation_error() {
        let err = prepare_for_generation(b"definitely not an image").unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
