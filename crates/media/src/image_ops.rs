//! Image re-encoding and downscaling before OCR and the multimodal call.

use std::io::Cursor;

use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};

use crate::error::{Error, Result};

/// Upper bound on the encoded size of an image sent to the reasoning service.
pub const MAX_ENCODED_BYTES: usize = 5 * 1024 * 1024;

const JPEG_QUALITY: u8 = 85;

/// An image ready for the multimodal call.
#[derive(Debug)]
pub struct OptimizedImage {
    pub data: Vec<u8>,
    pub media_type: &'static str,
    pub width: u32,
    pub height: u32,
    pub was_resized: bool,
}

/// Sniff the container format from the leading bytes.
pub fn detect_format(data: &[u8]) -> Option<ImageFormat> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()
        .and_then(|r| r.format())
}

fn decode(data: &[u8]) -> Result<DynamicImage> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| Error::external("failed to guess image format", e))?
        .decode()
        .map_err(|e| Error::external("failed to decode image", e))
}

/// Decode any supported raster and re-encode it as PNG.
pub fn transcode_to_png(data: &[u8]) -> Result<Vec<u8>> {
    let img = decode(data)?;
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .map_err(|e| Error::external("failed to encode PNG", e))?;
    Ok(out.into_inner())
}

/// Downscale an image so its longest edge is at most `max_dimension` and its
/// encoding stays under [`MAX_ENCODED_BYTES`]. Small images are returned
/// as-is.
pub fn optimize_for_llm(data: &[u8], max_dimension: u32) -> Result<OptimizedImage> {
    let img = decode(data)?;
    let (width, height) = img.dimensions();

    if width <= max_dimension && height <= max_dimension && data.len() <= MAX_ENCODED_BYTES {
        return Ok(OptimizedImage {
            data: data.to_vec(),
            media_type: media_type_of(detect_format(data)),
            width,
            height,
            was_resized: false,
        });
    }

    let resized = resize_to_fit(&img, max_dimension);
    let (final_width, final_height) = resized.dimensions();

    let (data, media_type) = if img.color().has_alpha() {
        let mut out = Cursor::new(Vec::new());
        resized
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| Error::external("failed to encode PNG", e))?;
        (out.into_inner(), "image/png")
    } else {
        (shrink_jpeg(&resized, MAX_ENCODED_BYTES)?, "image/jpeg")
    };

    Ok(OptimizedImage {
        data,
        media_type,
        width: final_width,
        height: final_height,
        was_resized: true,
    })
}

fn resize_to_fit(img: &DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width <= max_dimension && height <= max_dimension {
        return img.clone();
    }
    // `resize` preserves aspect ratio within the bounding box.
    img.resize(
        max_dimension,
        max_dimension,
        image::imageops::FilterType::Lanczos3,
    )
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality);
    img.to_rgb8()
        .write_with_encoder(encoder)
        .map_err(|e| Error::external("failed to encode JPEG", e))?;
    Ok(out.into_inner())
}

/// Lower JPEG quality, then dimensions, until the encoding fits.
fn shrink_jpeg(img: &DynamicImage, max_bytes: usize) -> Result<Vec<u8>> {
    for quality in [JPEG_QUALITY, 70, 55, 40] {
        let data = encode_jpeg(img, quality)?;
        if data.len() <= max_bytes {
            return Ok(data);
        }
    }

    let (width, height) = img.dimensions();
    let next = (width.max(height) as f64 * 0.75).round() as u32;
    if next < 256 {
        return Err(Error::invalid_input(
            "image cannot be reduced below the size limit",
        ));
    }
    shrink_jpeg(&resize_to_fit(img, next), max_bytes)
}

fn media_type_of(format: Option<ImageFormat>) -> &'static str {
    match format {
        Some(ImageFormat::Png) => "image/png",
        Some(ImageFormat::WebP) => "image/webp",
        Some(ImageFormat::Gif) => "image/gif",
        Some(ImageFormat::Bmp) => "image/bmp",
        Some(ImageFormat::Tiff) => "image/tiff",
        _ => "image/jpeg",
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            width,
            height,
            image::Rgb([200, 30, 30]),
        ));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    #[test]
    fn small_image_is_untouched() {
        let png = encoded(4, 3, ImageFormat::Png);
        let result = optimize_for_llm(&png, 1568).unwrap();
        assert!(!result.was_resized);
        assert_eq!(result.data, png);
        assert_eq!(result.media_type, "image/png");
        assert_eq!((result.width, result.height), (4, 3));
    }

    #[test]
    fn large_image_is_downscaled_to_jpeg() {
        let png = encoded(400, 200, ImageFormat::Png);
        let result = optimize_for_llm(&png, 100).unwrap();
        assert!(result.was_resized);
        assert_eq!(result.media_type, "image/jpeg");
        assert_eq!((result.width, result.height), (100, 50));
        assert_eq!(detect_format(&result.data), Some(ImageFormat::Jpeg));
    }

    #[test]
    fn bmp_transcodes_to_png() {
        let bmp = encoded(2, 2, ImageFormat::Bmp);
        let png = transcode_to_png(&bmp).unwrap();
        assert_eq!(detect_format(&png), Some(ImageFormat::Png));
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(optimize_for_llm(b"not an image", 100).is_err());
        assert!(transcode_to_png(b"").is_err());
    }
}
