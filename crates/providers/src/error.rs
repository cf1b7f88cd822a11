/// Failure of a call to the reasoning service.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation_error: no API key configured")]
    NotConfigured,

    #[error("generation_error: request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("generation_error: service answered {status}: {message}")]
    Status { status: u16, message: String },

    #[error("generation_error: prompt blocked ({reason})")]
    Blocked { reason: String },

    #[error("generation_error: malformed response: {0}")]
    Malformed(String),

    #[error("generation_error: empty response")]
    Empty,
}

impl GenerationError {
    /// Timeouts and transport failures, as opposed to answers the service
    /// chose to give.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Request(_))
    }
}
