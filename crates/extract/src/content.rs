use std::sync::Arc;

use {
    claimguard_config::ExtractConfig,
    claimguard_media::MediaOutcome,
    futures::future::join_all,
};

use crate::{
    ocr::{OcrEngine, TesseractOcr, image_text},
    pdf::{PdfExtractText, PdfExtractor, Pdftoppm},
    scrape::PageScraper,
};

/// Text recovered from one attachment or linked page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedContent {
    /// OCR text of the image at `index` (zero-based).
    Image { index: usize, text: String },
    /// Text layer (or page OCR) of the PDF at `index`.
    Pdf { index: usize, text: String },
    /// Paragraph text of a linked page.
    Url { url: String, text: String },
    /// Attachment that produced no text (unsupported type, failed download).
    Error { index: usize, note: String },
}

impl ExtractedContent {
    /// Text that may itself contain further links.
    #[must_use]
    pub fn media_text(&self) -> Option<&str> {
        match self {
            Self::Image { text, .. } | Self::Pdf { text, .. } => Some(text),
            Self::Url { .. } | Self::Error { .. } => None,
        }
    }
}

/// Runs the extractors over fetched attachments and linked pages.
#[derive(Clone)]
pub struct ContentExtractor {
    ocr: Arc<dyn OcrEngine>,
    pdf: PdfExtractor,
    scraper: PageScraper,
}

impl ContentExtractor {
    pub fn new(ocr: Arc<dyn OcrEngine>, pdf: PdfExtractor, scraper: PageScraper) -> Self {
        Self { ocr, pdf, scraper }
    }

    /// Production wiring: tesseract, pdf-extract with pdftoppm fallback, and
    /// the reqwest-backed scraper.
    pub fn from_config(config: &ExtractConfig) -> Self {
        let ocr: Arc<dyn OcrEngine> = Arc::new(TesseractOcr::from_config(config));
        let pdf = PdfExtractor::new(
            Arc::new(PdfExtractText),
            Arc::new(Pdftoppm::from_config(config)),
            Arc::clone(&ocr),
            config.pdf_min_text_chars,
        );
        Self::new(ocr, pdf, PageScraper::from_config(config))
    }

    /// One entry per outcome, in the same order.
    pub async fn extract_media(&self, outcomes: &[MediaOutcome]) -> Vec<ExtractedContent> {
        join_all(outcomes.iter().map(|outcome| self.extract_one(outcome))).await
    }

    async fn extract_one(&self, outcome: &MediaOutcome) -> ExtractedContent {
        match outcome {
            MediaOutcome::Fetched(media) if media.is_pdf() => ExtractedContent::Pdf {
                index: media.index,
                text: self.pdf.extract(&media.bytes).await,
            },
            MediaOutcome::Fetched(media) if media.is_image() => ExtractedContent::Image {
                index: media.index,
                text: image_text(self.ocr.as_ref(), &media.bytes, &media.content_type).await,
            },
            MediaOutcome::Fetched(media) => ExtractedContent::Error {
                index: media.index,
                note: format!("(Unsupported media type: {})", media.content_type),
            },
            MediaOutcome::Unsupported {
                index,
                content_type,
            } => ExtractedContent::Error {
                index: *index,
                note: format!("(Unsupported media type: {content_type})"),
            },
            MediaOutcome::Failed {
                index,
                kind,
                attempts,
                ..
            } => ExtractedContent::Error {
                index: *index,
                note: format!("(Media error: {kind} after {attempts} attempts)"),
            },
        }
    }

    /// Scrape each URL concurrently; pages that yield no text are dropped.
    pub async fn scrape_urls(&self, urls: &[String]) -> Vec<ExtractedContent> {
        let texts = join_all(urls.iter().map(|url| self.scraper.scrape(url))).await;
        urls.iter()
            .zip(texts)
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(url, text)| ExtractedContent::Url {
                url: url.clone(),
                text,
            })
            .collect()
    }
}
