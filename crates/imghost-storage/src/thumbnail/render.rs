//! Image decoding and thumbnail encoding.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageReader};
use tracing::debug;

use imghost_core::error::AppError;
use imghost_core::result::AppResult;

const JPEG_QUALITY: u8 = 85;

/// An encoded thumbnail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub data: Vec<u8>,
    /// File extension matching the encoding (`webp` or `jpg`).
    pub extension: &'static str,
}

/// Read the pixel dimensions from an image header without decoding it.
pub fn image_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// Decode `data` and shrink it to fit within `width` x `height`. Images that
/// already fit are re-encoded at their own size.
///
/// Encodes WebP, falling back to JPEG when WebP encoding fails. This is CPU
/// bound; async callers should run it on the blocking pool.
pub fn render_thumbnail(data: &[u8], width: u32, height: u32) -> AppResult<Thumbnail> {
    if width == 0 || height == 0 {
        return Err(AppError::validation("Thumbnail size must be positive"));
    }

    let img = image::load_from_memory(data)
        .map_err(|e| AppError::internal(format!("Failed to decode image: {e}")))?;
    let thumb = if img.width() <= width && img.height() <= height {
        img
    } else {
        img.thumbnail(width, height)
    };

    match encode_webp(&thumb) {
        Ok(data) => Ok(Thumbnail {
            data,
            extension: "webp",
        }),
        Err(e) => {
            debug!(error = %e, "WebP encoding failed, falling back to JPEG");
            Ok(Thumbnail {
                data: encode_jpeg(&thumb)?,
                extension: "jpg",
            })
        }
    }
}

fn encode_webp(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(img.to_rgba8())
        .write_with_encoder(WebPEncoder::new_lossless(&mut buf))?;
    Ok(buf)
}

fn encode_jpeg(img: &DynamicImage) -> AppResult<Vec<u8>> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY))
        .map_err(|e| AppError::internal(format!("Failed to encode thumbnail: {e}")))?;
    Ok(buf)
}
