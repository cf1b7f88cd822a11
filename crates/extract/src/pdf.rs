//! PDF text extraction: embedded text layer first, page OCR when the layer is
//! missing or nearly empty (scanned documents).

use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    tokio::process::Command,
    tracing::{debug, info},
};

use crate::{
    error::{Context, Error, Result},
    ocr::OcrEngine,
    shellout::{run_bounded, write_temp_file},
};

/// Reads the embedded text layer of a PDF.
#[async_trait]
pub trait PdfTextLayer: Send + Sync {
    async fn extract_text(&self, pdf: &[u8]) -> Result<String>;
}

/// Renders PDF pages to PNG images, in page order.
#[async_trait]
pub trait PdfRasterizer: Send + Sync {
    async fn rasterize(&self, pdf: &[u8]) -> Result<Vec<Vec<u8>>>;
}

/// Text layer via the pure-Rust `pdf-extract` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractText;

#[async_trait]
impl PdfTextLayer for PdfExtractText {
    async fn extract_text(&self, pdf: &[u8]) -> Result<String> {
        let bytes = pdf.to_vec();
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .context("pdf text task panicked")?
            .map_err(|e| Error::message(format!("failed to read PDF text layer: {e}")))
    }
}

/// Page rasterization through poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct Pdftoppm {
    dpi: u32,
    max_pages: u32,
    timeout: Duration,
}

impl Default for Pdftoppm {
    fn default() -> Self {
        Self {
            dpi: 200,
            max_pages: 10,
            timeout: Duration::from_secs(60),
        }
    }
}

impl Pdftoppm {
    pub fn from_config(config: &claimguard_config::ExtractConfig) -> Self {
        Self {
            dpi: config.pdf_render_dpi,
            max_pages: config.pdf_max_pages.max(1),
            timeout: Duration::from_secs(config.ocr_timeout_seconds.saturating_mul(2)),
        }
    }
}

#[async_trait]
impl PdfRasterizer for Pdftoppm {
    async fn rasterize(&self, pdf: &[u8]) -> Result<Vec<Vec<u8>>> {
        let input = write_temp_file(pdf, ".pdf")?;
        let out_dir = tempfile::Builder::new()
            .prefix("claimguard-pages-")
            .tempdir()
            .context("failed to create page directory")?;
        let prefix = out_dir.path().join("page");

        let mut cmd = Command::new("pdftoppm");
        cmd.arg("-r")
            .arg(self.dpi.to_string())
            .arg("-f")
            .arg("1")
            .arg("-l")
            .arg(self.max_pages.to_string())
            .arg("-png")
            .arg(input.path())
            .arg(&prefix);
        run_bounded(cmd, "pdftoppm", self.timeout, 0).await?;

        // pdftoppm zero-pads page numbers to a common width, so names sort in
        // page order.
        let mut pages: Vec<_> = std::fs::read_dir(out_dir.path())
            .context("failed to list rendered pages")?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
            .collect();
        pages.sort();

        let mut images = Vec::with_capacity(pages.len());
        for page in pages {
            images.push(
                tokio::fs::read(&page)
                    .await
                    .with_context(|| format!("failed to read {}", page.display()))?,
            );
        }
        if images.is_empty() {
            return Err(Error::message("pdftoppm rendered no pages"));
        }
        Ok(images)
    }
}

/// Text-layer extraction with OCR fallback.
#[derive(Clone)]
pub struct PdfExtractor {
    text_layer: Arc<dyn PdfTextLayer>,
    rasterizer: Arc<dyn PdfRasterizer>,
    ocr: Arc<dyn OcrEngine>,
    min_text_chars: usize,
}

impl PdfExtractor {
    pub fn new(
        text_layer: Arc<dyn PdfTextLayer>,
        rasterizer: Arc<dyn PdfRasterizer>,
        ocr: Arc<dyn OcrEngine>,
        min_text_chars: usize,
    ) -> Self {
        Self {
            text_layer,
            rasterizer,
            ocr,
            min_text_chars,
        }
    }

    /// Extract readable text. Never fails: an unusable text layer falls back
    /// to OCR, and a failed fallback becomes `(PDF OCR error: …)`.
    pub async fn extract(&self, pdf: &[u8]) -> String {
        let layer = match self.text_layer.extract_text(pdf).await {
            Ok(text) => text,
            Err(e) => {
                debug!(error = %e, "no usable PDF text layer");
                String::new()
            },
        };

        let visible = layer.chars().filter(|c| !c.is_whitespace()).count();
        if visible >= self.min_text_chars {
            return layer.trim().to_string();
        }

        info!(visible, "PDF text layer too thin, falling back to OCR");
        match self.ocr_pages(pdf).await {
            Ok(text) => text,
            Err(e) => format!("(PDF OCR error: {e})"),
        }
    }

    async fn ocr_pages(&self, pdf: &[u8]) -> Result<String> {
        let pages = self.rasterizer.rasterize(pdf).await?;
        let mut texts = Vec::with_capacity(pages.len());
        for page in &pages {
            let text = self.ocr.recognize(page, "image/png").await?;
            if !text.trim().is_empty() {
                texts.push(text.trim().to_string());
            }
        }
        Ok(texts.join("\n"))
    }
}
