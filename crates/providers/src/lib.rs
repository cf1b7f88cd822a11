//! Reasoning service abstraction and the Gemini `generateContent` client.

pub mod error;
pub mod gemini;

use async_trait::async_trait;

pub use {error::GenerationError, gemini::GeminiProvider};

/// Shared HTTP client for outbound calls.
///
/// Callers that don't need custom redirect/proxy settings should reuse this
/// client to share connection pools, DNS cache, and TLS sessions.
pub fn shared_http_client() -> &'static reqwest::Client {
    static CLIENT: std::sync::LazyLock<reqwest::Client> =
        std::sync::LazyLock::new(reqwest::Client::new);
    &CLIENT
}

/// An encoded image handed to a multimodal call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImagePayload {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }
}

/// A generative model that turns prompts (optionally with images) into text.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    fn name(&self) -> &str;

    /// Model identifier (e.g. "gemini-1.5-flash").
    fn model(&self) -> &str;

    /// Text-only generation.
    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Generation over an instruction, one or more images, and optional
    /// extracted text, sent as a single request.
    async fn generate_multimodal(
        &self,
        instruction: &str,
        images: &[ImagePayload],
        context: Option<&str>,
    ) -> Result<String, GenerationError>;
}
