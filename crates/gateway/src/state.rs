use claimguard_auto_reply::{ClaimVerifier, ReplyPipeline};

/// Shared by every handler. Both members are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: ReplyPipeline,
    pub verifier: ClaimVerifier,
    pub version: &'static str,
}

impl AppState {
    pub fn new(pipeline: ReplyPipeline, verifier: ClaimVerifier) -> Self {
        Self {
            pipeline,
            verifier,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
