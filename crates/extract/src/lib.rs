//! Content extraction: OCR for images, text layer with OCR fallback for PDFs,
//! and paragraph scraping for linked web pages.
//!
//! Every extractor is total. Failures surface as inline text (`(OCR error: …)`,
//! `(PDF OCR error: …)`) or, for scraping, as an empty string, so a single bad
//! attachment never aborts the reply.

pub mod content;
pub mod error;
pub mod ocr;
pub mod pdf;
pub mod scrape;
pub mod shellout;

pub use {
    content::{ContentExtractor, ExtractedContent},
    error::{Error, Result},
    ocr::{OcrEngine, TesseractOcr},
    pdf::{PdfExtractText, PdfExtractor, PdfRasterizer, PdfTextLayer, Pdftoppm},
    scrape::PageScraper,
};
