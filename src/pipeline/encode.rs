//! Payload preparation: raw image bytes → downscaled JPEG upload.
//!
//! Recognition reads large cover and spine lettering, not fine print, so the
//! upload can be compressed hard without hurting accuracy. Re-encoding every
//! input also normalises exotic camera formats to something the endpoint is
//! known to accept, and bounds worst-case upload size on mobile connections.

use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::pipeline::input::magic_bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Decode, downscale, and re-encode the input as a JPEG payload.
///
/// The longest edge is capped at [`ScanConfig::max_edge`] (aspect ratio
/// preserved) and the result is encoded at [`ScanConfig::jpeg_quality`].
/// Alpha channels are flattened — JPEG has no transparency, and neither do
/// book covers.
pub fn prepare_payload(bytes: &[u8], config: &ScanConfig) -> Result<Vec<u8>, ScanError> {
    let format = image::guess_format(bytes).map_err(|_| ScanError::NotAnImage {
        magic: magic_bytes(bytes),
    })?;

    let img = image::load_from_memory_with_format(bytes, format).map_err(|e| {
        ScanError::EncodeFailed {
            detail: e.to_string(),
        }
    })?;

    let (w, h) = (img.width(), img.height());
    let img = if w.max(h) > config.max_edge {
        img.resize(config.max_edge, config.max_edge, FilterType::Triangle)
    } else {
        img
    };

    // JPEG cannot carry an alpha channel.
    let img = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut buf = Vec::new();
    img.write_with_encoder(JpegEncoder::new_with_quality(
        &mut Cursor::new(&mut buf),
        config.jpeg_quality,
    ))
    .map_err(|e| ScanError::EncodeFailed {
        detail: e.to_string(),
    })?;

    debug!(
        "Prepared payload: {}x{} → {}x{}, {} → {} bytes",
        w,
        h,
        img.width(),
        img.height(),
        bytes.len(),
        buf.len()
    );

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba([120, 80, 40, 255]),
        ));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn payload_is_jpeg() {
        let config = ScanConfig::default();
        let payload = prepare_payload(&png_bytes(32, 24), &config).unwrap();
        // JPEG SOI marker.
        assert_eq!(&payload[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn oversized_images_are_downscaled() {
        let config = ScanConfig::builder().max_edge(100).build().unwrap();
        let payload = prepare_payload(&png_bytes(400, 200), &config).unwrap();
        let img = image::load_from_memory(&payload).unwrap();
        assert_eq!(img.width(), 100);
        assert_eq!(img.height(), 50);
    }

    #[test]
    fn small_images_keep_their_dimensions() {
        let config = ScanConfig::default();
        let payload = prepare_payload(&png_bytes(64, 48), &config).unwrap();
        let img = image::load_from_memory(&payload).unwrap();
        assert_eq!((img.width(), img.height()), (64, 48));
    }

    #[test]
    fn garbage_bytes_are_not_an_image() {
        let config = ScanConfig::default();
        let err = prepare_payload(b"definitely not pixels", &config).unwrap_err();
        assert!(matches!(err, ScanError::NotAnImage { .. }));
    }
}
