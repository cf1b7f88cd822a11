//! Citation hygiene: URL extraction, the authoritative-domain allow-list, and
//! the reply post-processor that rewrites the `Sources:` block.

pub mod allowlist;
pub mod rewrite;
pub mod urls;

pub use {
    allowlist::{Allowlist, is_allowed},
    rewrite::{VerifiedReply, enforce_sources, render_sources},
    urls::extract_urls,
};
