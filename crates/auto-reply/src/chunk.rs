/// Split a reply into transport-sized parts.
///
/// The trimmed text is cut into contiguous pieces of at most `limit`
/// characters. Each cut falls just after the last whitespace inside the
/// window when there is one past the window start, otherwise at the limit.
/// When more than one piece results, each gets a one-based `(i/total) `
/// prefix. Stripping the prefixes and concatenating gives back the trimmed
/// input.
pub fn chunk_reply(text: &str, limit: usize) -> Vec<String> {
    let pieces = split_bodies(text.trim(), limit);
    if pieces.len() <= 1 {
        return pieces.into_iter().map(str::to_string).collect();
    }
    let total = pieces.len();
    pieces
        .into_iter()
        .enumerate()
        .map(|(i, body)| format!("({}/{total}) {body}", i + 1))
        .collect()
}

fn split_bodies(text: &str, limit: usize) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let limit = limit.max(1);
    let mut pieces = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        // Byte offset of the char just past the window, if the rest is longer.
        let Some((window_end, _)) = remaining.char_indices().nth(limit) else {
            pieces.push(remaining);
            break;
        };
        let window = &remaining[..window_end];
        let cut = window
            .char_indices()
            .filter(|&(i, c)| i > 0 && c.is_whitespace())
            .map(|(i, c)| i + c.len_utf8())
            .next_back()
            .unwrap_or(window_end);
        pieces.push(&remaining[..cut]);
        remaining = &remaining[cut..];
    }
    pieces
}
