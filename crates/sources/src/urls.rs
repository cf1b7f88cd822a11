use std::sync::LazyLock;

use regex::Regex;

static URL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>()"'\[\]{}]+"#).ok());

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '>', '\'', '"'];

/// Extract `http(s)://` tokens from free text, in first-seen order, without
/// duplicates. Sentence punctuation stuck to the end of a URL is trimmed.
pub fn extract_urls(text: &str) -> Vec<String> {
    let Some(pattern) = URL_PATTERN.as_ref() else {
        return Vec::new();
    };
    let mut seen: Vec<String> = Vec::new();
    for m in pattern.find_iter(text) {
        let url = m.as_str().trim_end_matches(TRAILING_PUNCTUATION);
        if !url.ends_with("://") && !seen.iter().any(|s| s == url) {
            seen.push(url.to_string());
        }
    }
    seen
}
