//! Reply post-processing: keep only allow-listed citations.

use tracing::{debug, warn};

use crate::{
    allowlist::{Allowlist, host_of},
    urls::extract_urls,
};

const SOURCES_MARKER: &str = "Sources:";

/// A generated reply after citation enforcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedReply {
    pub text: String,
    /// Allow-listed URLs rendered in the `Sources:` block, first-seen order.
    /// Empty when no allow-listed citation was found.
    pub sources: Vec<String>,
}

impl VerifiedReply {
    #[must_use]
    pub fn is_rewritten(&self) -> bool {
        !self.sources.is_empty()
    }
}

/// Rewrite the `Sources:` block of `text` so that it lists only allow-listed
/// URLs.
///
/// URLs are collected from the whole text. When at least one allow-listed
/// URL is found, the text is cut at its first `Sources:` marker (if any) and a
/// fresh block with up to `max_sources` URLs is appended. Otherwise the text
/// is returned unchanged, except that a `Sources:` block citing only
/// disallowed URLs is replaced by `Sources:\n- None`.
pub fn enforce_sources(text: &str, allowlist: &Allowlist, max_sources: usize) -> VerifiedReply {
    let mut kept = Vec::new();
    let mut dropped_hosts = Vec::new();

    for url in extract_urls(text) {
        if allowlist.allows(&url) {
            if kept.len() < max_sources {
                kept.push(url);
            }
        } else {
            let host = host_of(&url).unwrap_or_else(|| url.clone());
            if !dropped_hosts.contains(&host) {
                dropped_hosts.push(host);
            }
        }
    }

    if !dropped_hosts.is_empty() {
        warn!(hosts = ?dropped_hosts, "dropping citations outside the allow-list");
    }

    let marker = text.find(SOURCES_MARKER);
    if kept.is_empty() {
        let cites_disallowed = marker.is_some_and(|pos| !extract_urls(&text[pos..]).is_empty());
        if !cites_disallowed {
            debug!("no allow-listed citation found, reply passed through");
            return VerifiedReply {
                text: text.to_string(),
                sources: Vec::new(),
            };
        }
    }

    let body = match marker {
        Some(pos) => &text[..pos],
        None => text,
    }
    .trim_end();

    let block = render_sources(&kept);
    let text = if body.is_empty() {
        block
    } else {
        format!("{body}\n\n{block}")
    };

    VerifiedReply {
        text,
        sources: kept,
    }
}

/// Render a `Sources:` block, or `Sources:\n- None` for an empty list.
pub fn render_sources(urls: &[String]) -> String {
    if urls.is_empty() {
        return format!("{SOURCES_MARKER}\n- None");
    }
    let mut out = String::from(SOURCES_MARKER);
    for url in urls {
        out.push_str("\n- ");
        out.push_str(url);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowlist() -> Allowlist {
        Allowlist::new(["who.int", "cdc.gov", "nih.gov", "bmj.com"])
    }

    #[test]
    fn replaces_sources_block_with_allowed_urls_only() {
        let text = "Verdict: False\nSummary: Garlic does not prevent COVID-19.\nSources:\n\
                    - https://www.who.int/myth-busters\n- https://randomblog.example/garlic\n\
                    - https://www.cdc.gov/covid";
        let reply = enforce_sources(text, &allowlist(), 3);
        assert_eq!(
            reply.text,
            "Verdict: False\nSummary: Garlic does not prevent COVID-19.\n\nSources:\n\
             - https://www.who.int/myth-busters\n- https://www.cdc.gov/covid"
        );
        assert_eq!(reply.sources.len(), 2);
        assert!(reply.is_rewritten());
    }

    #[test]
    fn caps_at_max_and_deduplicates() {
        let text = "Answer: x.\nSources:\n- https://who.int/a\n- https://who.int/a\n\
                    - https://cdc.gov/b\n- https://nih.gov/c\n- https://bmj.com/d";
        let reply = enforce_sources(text, &allowlist(), 3);
        assert_eq!(reply.sources, [
            "https://who.int/a",
            "https://cdc.gov/b",
            "https://nih.gov/c"
        ]);
        assert!(!reply.text.contains("bmj.com"));
    }

    #[test]
    fn disallowed_only_sources_block_becomes_none() {
        let text = "Answer: try https://example.com/x.\nSources:\n- https://example.com/x";
        let reply = enforce_sources(text, &allowlist(), 3);
        assert_eq!(
            reply.text,
            "Answer: try https://example.com/x.\n\nSources:\n- None"
        );
        assert!(reply.sources.is_empty());
        assert!(!reply.is_rewritten());
    }

    #[test]
    fn disallowed_url_outside_sources_block_passes_through() {
        let text = "Answer: a blog at https://example.com/x repeats this claim.";
        let reply = enforce_sources(text, &allowlist(), 3);
        assert_eq!(reply.text, text);
    }

    #[test]
    fn passes_through_plain_text() {
        let reply = enforce_sources("Answer: Hello.\nSources:\n- None", &allowlist(), 3);
        assert_eq!(reply.text, "Answer: Hello.\nSources:\n- None");
    }

    #[test]
    fn appends_block_when_marker_missing() {
        let reply = enforce_sources("See https://www.who.int/x for details.", &allowlist(), 3);
        assert_eq!(
            reply.text,
            "See https://www.who.int/x for details.\n\nSources:\n- https://www.who.int/x"
        );
    }

    #[test]
    fn every_rendered_source_is_allowed() {
        let text = "Sources:\n- https://who.int.evil.com/\n- https://evilcdc.gov/\n- https://nih.gov/ok";
        let reply = enforce_sources(text, &allowlist(), 3);
        assert_eq!(reply.text, "Sources:\n- https://nih.gov/ok");
        assert!(reply.sources.iter().all(|u| allowlist().allows(u)));
    }

    #[test]
    fn renders_none_for_empty_list() {
        assert_eq!(render_sources(&[]), "Sources:\n- None");
    }
}
