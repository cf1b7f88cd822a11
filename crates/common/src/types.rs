//! Message types shared by the transport adapters and the reply pipeline.

use serde::{Deserialize, Serialize};

/// Content types the pipeline knows how to extract text from.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// A reference to attachment bytes on the media host. Not fetched yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    /// Content type as declared by the transport (may carry parameters).
    pub content_type: String,
}

impl MediaRef {
    pub fn new(url: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content_type: content_type.into(),
        }
    }

    /// Lowercased content type without parameters (`image/jpeg; q=1` → `image/jpeg`).
    #[must_use]
    pub fn essence(&self) -> String {
        content_type_essence(&self.content_type)
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        self.essence().starts_with("image/")
    }

    #[must_use]
    pub fn is_pdf(&self) -> bool {
        self.essence() == PDF_CONTENT_TYPE
    }

    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.is_image() || self.is_pdf()
    }
}

/// Strip parameters and lowercase a MIME type.
#[must_use]
pub fn content_type_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// One message as delivered by the webhook transport. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Opaque sender identifier (e.g. `whatsapp:+15551234567`).
    pub user_id: String,
    pub body: String,
    #[serde(default)]
    pub media: Vec<MediaRef>,
}

impl InboundMessage {
    pub fn text(user_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            body: body.into(),
            media: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_media(mut self, media: MediaRef) -> Self {
        self.media.push(media);
        self
    }

    #[must_use]
    pub fn has_media(&self) -> bool {
        !self.media.is_empty()
    }

    /// The text recorded as the user's turn: the trimmed body, or `(media)`
    /// when the message carried attachments only.
    #[must_use]
    pub fn turn_text(&self) -> &str {
        let body = self.body.trim();
        if body.is_empty() { "(media)" } else { body }
    }
}
