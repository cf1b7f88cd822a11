use std::time::Duration;

use {async_trait::async_trait, tokio::process::Command, tracing::debug};

use crate::{
    error::Result,
    shellout::{clip_chars, run_bounded, suffix_for_content_type, write_temp_file},
};

/// Optical character recognition over encoded image bytes.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &[u8], content_type: &str) -> Result<String>;
}

/// OCR through the `tesseract` CLI.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    language: String,
    timeout: Duration,
    max_chars: usize,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self {
            language: "eng".into(),
            timeout: Duration::from_secs(30),
            max_chars: 20_000,
        }
    }
}

impl TesseractOcr {
    pub fn from_config(config: &claimguard_config::ExtractConfig) -> Self {
        Self {
            language: config.ocr_language.clone(),
            timeout: Duration::from_secs(config.ocr_timeout_seconds),
            ..Default::default()
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image: &[u8], content_type: &str) -> Result<String> {
        let tmp = write_temp_file(image, suffix_for_content_type(content_type))?;
        let mut cmd = Command::new("tesseract");
        cmd.arg(tmp.path()).arg("stdout").arg("-l").arg(&self.language);

        let out = run_bounded(
            cmd,
            "tesseract",
            self.timeout,
            self.max_chars.saturating_mul(4),
        )
        .await?;
        let text = clip_chars(String::from_utf8_lossy(&out).trim(), self.max_chars);
        debug!(chars = text.chars().count(), "tesseract finished");
        Ok(text)
    }
}

/// Recognize text in an image, turning any failure into an inline note.
pub async fn image_text(engine: &dyn OcrEngine, image: &[u8], content_type: &str) -> String {
    match engine.recognize(image, content_type).await {
        Ok(text) => text,
        Err(e) => format!("(OCR error: {e})"),
    }
}
