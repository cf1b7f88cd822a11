//! Attachment retrieval: credentialed, retrying downloads from the media host
//! followed by format normalization for the OCR and multimodal stages.

pub mod error;
pub mod image_ops;
pub mod normalize;
pub mod retriever;
pub mod retry;

pub use {
    error::{Error, Result},
    retriever::{FetchedMedia, MediaOutcome, MediaRetriever},
    retry::{RetryFailure, RetryPolicy, Retryable, with_backoff},
};
