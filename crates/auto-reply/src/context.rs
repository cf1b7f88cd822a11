//! Builds the bounded text context for one inbound message.

use {
    claimguard_config::ClaimguardConfig,
    claimguard_extract::{ContentExtractor, ExtractedContent},
    claimguard_media::MediaOutcome,
    claimguard_sources::extract_urls,
    tracing::debug,
};

use crate::prompt::ReplyMode;

/// Sent in place of an empty context.
pub const EMPTY_CONTEXT_PLACEHOLDER: &str = "(The user sent no text, readable attachment or \
                                             link. Ask them to send the statement, question, \
                                             image, PDF or link they want checked.)";

/// Assembled context plus its classification. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantContext {
    pub text: String,
    pub mode: ReplyMode,
    /// Set when nothing usable was extracted and the placeholder was used.
    pub is_placeholder: bool,
}

/// Runs extraction over a message and joins the results into one context.
#[derive(Clone)]
pub struct ContextAssembler {
    extractor: ContentExtractor,
    max_urls: usize,
    max_chars: usize,
    keywords: Vec<String>,
}

impl ContextAssembler {
    pub fn new(extractor: ContentExtractor, keywords: Vec<String>) -> Self {
        Self {
            extractor,
            max_urls: 3,
            max_chars: 12_000,
            keywords,
        }
    }

    pub fn from_config(extractor: ContentExtractor, config: &ClaimguardConfig) -> Self {
        Self {
            extractor,
            max_urls: config.extract.scrape_max_urls,
            max_chars: config.chat.max_context_chars,
            keywords: config.chat.claim_keywords.clone(),
        }
    }

    /// Extract attachment text, scrape linked pages and assemble the result.
    pub async fn build(&self, body: &str, outcomes: &[MediaOutcome]) -> AssistantContext {
        let media = self.extractor.extract_media(outcomes).await;
        let urls = collect_urls(body, &media, self.max_urls);
        let pages = if urls.is_empty() {
            Vec::new()
        } else {
            self.extractor.scrape_urls(&urls).await
        };
        debug!(
            media = media.len(),
            urls = urls.len(),
            pages = pages.len(),
            "extraction finished"
        );

        let text = assemble(body, &media, &pages, self.max_chars);
        // A fetched image is content in its own right even when OCR finds no
        // text; it goes to the multimodal call without a placeholder.
        let is_placeholder = text.is_empty() && !has_fetched_image(outcomes);
        let text = if is_placeholder {
            EMPTY_CONTEXT_PLACEHOLDER.to_string()
        } else {
            text
        };
        let mode = if is_placeholder {
            ReplyMode::Query
        } else {
            ReplyMode::classify(&text, &self.keywords)
        };
        AssistantContext {
            text,
            mode,
            is_placeholder,
        }
    }
}

fn has_fetched_image(outcomes: &[MediaOutcome]) -> bool {
    outcomes
        .iter()
        .any(|outcome| matches!(outcome, MediaOutcome::Fetched(media) if media.is_image()))
}

/// Distinct URLs from the message body and extracted attachment text,
/// first-seen order, at most `max`.
pub fn collect_urls(body: &str, media: &[ExtractedContent], max: usize) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    let texts = std::iter::once(body).chain(media.iter().filter_map(ExtractedContent::media_text));
    for text in texts {
        for url in extract_urls(text) {
            if urls.len() >= max {
                return urls;
            }
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
    }
    urls
}

/// Join the sections in order: body, attachment text blocks, attachment
/// notes, page blocks. Empty sections are skipped; the rest are separated by
/// a blank line. The result is cut to `max_chars` characters.
pub fn assemble(
    body: &str,
    media: &[ExtractedContent],
    pages: &[ExtractedContent],
    max_chars: usize,
) -> String {
    let mut sections: Vec<String> = Vec::new();

    let body = body.trim();
    if !body.is_empty() {
        sections.push(body.to_string());
    }

    let mut ordered: Vec<&ExtractedContent> = media.iter().collect();
    ordered.sort_by_key(|c| media_index(c));

    for &content in &ordered {
        if let ExtractedContent::Image { index, text } | ExtractedContent::Pdf { index, text } =
            content
        {
            let text = text.trim();
            if !text.is_empty() {
                sections.push(format!("[Extracted text from media {}]:\n{text}", index + 1));
            }
        }
    }
    for &content in &ordered {
        if let ExtractedContent::Error { note, .. } = content {
            sections.push(note.clone());
        }
    }
    for page in pages {
        if let ExtractedContent::Url { url, text } = page {
            let text = text.trim();
            if !text.is_empty() {
                sections.push(format!("[Extracted text from URL {url}]:\n{text}"));
            }
        }
    }

    clip(sections.join("\n\n"), max_chars)
}

fn media_index(content: &ExtractedContent) -> usize {
    match content {
        ExtractedContent::Image { index, .. }
        | ExtractedContent::Pdf { index, .. }
        | ExtractedContent::Error { index, .. } => *index,
        ExtractedContent::Url { .. } => usize::MAX,
    }
}

fn clip(mut text: String, max_chars: usize) -> String {
    if let Some((end, _)) = text.char_indices().nth(max_chars) {
        text.truncate(end);
    }
    text
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn image(index: usize, text: &str) -> ExtractedContent {
        ExtractedContent::Image {
            index,
            text: text.into(),
        }
    }

    #[test]
    fn sections_are_ordered_and_labelled() {
        let media = [
            ExtractedContent::Error {
                index: 1,
                note: "(Unsupported media type: audio/ogg)".into(),
            },
            ExtractedContent::Pdf {
                index: 2,
                text: "Page one text".into(),
            },
            image(0, "  Garlic cures COVID  "),
        ];
        let pages = [ExtractedContent::Url {
            url: "https://www.who.int/news".into(),
            text: "WHO says garlic does not prevent COVID-19.".into(),
        }];

        let text = assemble("Is this true?", &media, &pages, 12_000);
        assert_eq!(
            text,
            "Is this true?\n\n\
             [Extracted text from media 1]:\nGarlic cures COVID\n\n\
             [Extracted text from media 3]:\nPage one text\n\n\
             (Unsupported media type: audio/ogg)\n\n\
             [Extracted text from URL https://www.who.int/news]:\n\
             WHO says garlic does not prevent COVID-19."
        );
    }

    #[test]
    fn empty_sections_are_skipped() {
        let media = [image(0, "   ")];
        assert_eq!(assemble("  ", &media, &[], 100), "");
        assert_eq!(assemble("hi", &media, &[], 100), "hi");
    }

    #[test]
    fn context_is_clipped_by_chars() {
        let text = assemble(&"é".repeat(50), &[], &[], 20);
        assert_eq!(text.chars().count(), 20);
    }

    #[test]
    fn urls_come_from_body_and_media_text() {
        let media = [
            image(0, "see https://cdc.gov/a and https://example.com/b"),
            ExtractedContent::Error {
                index: 1,
                note: "(Unsupported media type: https://not.a/link)".into(),
            },
        ];
        let urls = collect_urls(
            "read https://who.int/x, then https://cdc.gov/a",
            &media,
            10,
        );
        assert_eq!(urls, [
            "https://who.int/x",
            "https://cdc.gov/a",
            "https://example.com/b"
        ]);
    }

    #[test]
    fn url_collection_is_capped() {
        let body = "https://a.org/1 https://b.org/2 https://c.org/3 https://d.org/4";
        assert_eq!(collect_urls(body, &[], 3).len(), 3);
        assert!(collect_urls(body, &[], 0).is_empty());
    }
}
