//! Format normalization of fetched attachments.
//!
//! HEIC/HEIF photos are transcoded to JPEG with the `heif-convert` CLI, other
//! rasters that are neither JPEG nor PNG are re-encoded to PNG, and oversized
//! images are downscaled. Any failure keeps the original bytes and content
//! type: a later stage records its own error note if it cannot cope.

use std::{io::Write, time::Duration};

use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    image_ops,
};

const HEIF_CONVERT_TIMEOUT: Duration = Duration::from_secs(30);

/// Normalized attachment bytes with their effective content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

fn is_heif(content_type: &str) -> bool {
    matches!(
        content_type,
        "image/heic" | "image/heif" | "image/heic-sequence" | "image/heif-sequence"
    )
}

/// Normalize fetched bytes. `content_type` must already be a lowercased
/// essence (no parameters).
pub async fn normalize(bytes: Vec<u8>, content_type: &str, max_dimension: u32) -> Normalized {
    if !content_type.starts_with("image/") {
        return Normalized {
            bytes,
            content_type: content_type.to_string(),
        };
    }

    let (bytes, content_type) = if is_heif(content_type) {
        match heif_to_jpeg(&bytes).await {
            Ok(jpeg) => (jpeg, "image/jpeg".to_string()),
            Err(e) => {
                warn!(error = %e, "heif-convert failed, keeping original bytes");
                return Normalized {
                    bytes,
                    content_type: content_type.to_string(),
                };
            },
        }
    } else if matches!(content_type, "image/jpeg" | "image/png") {
        (bytes, content_type.to_string())
    } else {
        let input = bytes.clone();
        match blocking(move || image_ops::transcode_to_png(&input)).await {
            Ok(png) => (png, "image/png".to_string()),
            Err(e) => {
                warn!(content_type, error = %e, "transcode to PNG failed, keeping original bytes");
                return Normalized {
                    bytes,
                    content_type: content_type.to_string(),
                };
            },
        }
    };

    let input = bytes.clone();
    match blocking(move || image_ops::optimize_for_llm(&input, max_dimension)).await {
        Ok(optimized) if optimized.was_resized => {
            debug!(
                width = optimized.width,
                height = optimized.height,
                "downscaled image"
            );
            Normalized {
                bytes: optimized.data,
                content_type: optimized.media_type.to_string(),
            }
        },
        Ok(_) => Normalized {
            bytes,
            content_type,
        },
        Err(e) => {
            debug!(error = %e, "image optimization skipped");
            Normalized {
                bytes,
                content_type,
            }
        },
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::external("image task panicked", e))?
}

async fn heif_to_jpeg(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut input = tempfile::Builder::new()
        .prefix("claimguard-")
        .suffix(".heic")
        .tempfile()
        .map_err(|e| Error::external("failed to create temp file", e))?;
    input
        .write_all(bytes)
        .map_err(|e| Error::external("failed to write temp file", e))?;
    let output = tempfile::Builder::new()
        .prefix("claimguard-")
        .suffix(".jpg")
        .tempfile()
        .map_err(|e| Error::external("failed to create temp file", e))?;

    let run = tokio::process::Command::new("heif-convert")
        .arg(input.path())
        .arg(output.path())
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true)
        .output();

    let out = tokio::time::timeout(HEIF_CONVERT_TIMEOUT, run)
        .await
        .map_err(|_| Error::Timeout(HEIF_CONVERT_TIMEOUT))?
        .map_err(|e| Error::external("failed to run heif-convert", e))?;
    if !out.status.success() {
        return Err(Error::invalid_input(format!(
            "heif-convert exited with {}: {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let jpeg = tokio::fs::read(output.path())
        .await
        .map_err(|e| Error::external("failed to read heif-convert output", e))?;
    if jpeg.is_empty() {
        return Err(Error::invalid_input("heif-convert produced no output"));
    }
    Ok(jpeg)
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::image_ops::tests::encoded, image::ImageFormat};

    #[tokio::test]
    async fn pdf_passes_through() {
        let out = normalize(b"%PDF-1.4".to_vec(), "application/pdf", 1568).await;
        assert_eq!(out.bytes, b"%PDF-1.4");
        assert_eq!(out.content_type, "application/pdf");
    }

    #[tokio::test]
    async fn jpeg_and_png_are_kept() {
        let png = encoded(3, 3, ImageFormat::Png);
        let out = normalize(png.clone(), "image/png", 1568).await;
        assert_eq!(out.bytes, png);
        assert_eq!(out.content_type, "image/png");
    }

    #[tokio::test]
    async fn other_rasters_become_png() {
        let gif = encoded(3, 3, ImageFormat::Gif);
        let out = normalize(gif, "image/gif", 1568).await;
        assert_eq!(out.content_type, "image/png");
        assert_eq!(image_ops::detect_format(&out.bytes), Some(ImageFormat::Png));
    }

    #[tokio::test]
    async fn undecodable_image_keeps_original() {
        let out = normalize(b"junk".to_vec(), "image/webp", 1568).await;
        assert_eq!(out.bytes, b"junk");
        assert_eq!(out.content_type, "image/webp");
    }

    #[tokio::test]
    async fn oversized_image_is_downscaled() {
        let png = encoded(300, 30, ImageFormat::Png);
        let out = normalize(png, "image/png", 100).await;
        assert_eq!(out.content_type, "image/jpeg");
    }
}
