/// Default number of turns kept per user.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

const USER_PREFIX: &str = "User: ";
const ASSISTANT_PREFIX: &str = "Assistant: ";

/// Ordered turns for one user, oldest first, never longer than `limit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationHistory {
    turns: Vec<String>,
    limit: usize,
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl ConversationHistory {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            turns: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Build from stored turns, keeping only the most recent `limit`.
    pub fn from_turns(turns: impl IntoIterator<Item = String>, limit: usize) -> Self {
        let mut history = Self {
            turns: turns.into_iter().collect(),
            limit: limit.max(1),
        };
        history.trim();
        history
    }

    pub fn push_user(&mut self, text: &str) {
        self.push(format!("{USER_PREFIX}{text}"));
    }

    /// Record an assistant turn, keeping at most `max_chars` characters of
    /// the reply.
    pub fn push_assistant(&mut self, reply: &str, max_chars: usize) {
        let truncated = match reply.char_indices().nth(max_chars) {
            Some((end, _)) => &reply[..end],
            None => reply,
        };
        self.push(format!("{ASSISTANT_PREFIX}{truncated}"));
    }

    fn push(&mut self, turn: String) {
        self.turns.push(turn);
        self.trim();
    }

    fn trim(&mut self) {
        if self.turns.len() > self.limit {
            let excess = self.turns.len() - self.limit;
            self.turns.drain(..excess);
        }
    }

    #[must_use]
    pub fn turns(&self) -> &[String] {
        &self.turns
    }

    /// The last `n` turns (fewer if the history is shorter).
    #[must_use]
    pub fn recent(&self, n: usize) -> &[String] {
        &self.turns[self.turns.len().saturating_sub(n)..]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Storage form: one escaped turn per line.
    #[must_use]
    pub fn encode(&self) -> String {
        self.turns
            .iter()
            .map(|t| escape(t))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Inverse of [`encode`](Self::encode). Blank lines are skipped.
    #[must_use]
    pub fn decode(stored: &str, limit: usize) -> Self {
        Self::from_turns(
            stored
                .split('\n')
                .filter(|line| !line.trim().is_empty())
                .map(unescape),
            limit,
        )
    }
}

fn escape(turn: &str) -> String {
    let mut out = String::with_capacity(turn.len());
    for c in turn.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            // Unknown escape or trailing backslash: keep verbatim.
            Some(other) => {
                out.push('\\');
                out.push(other);
            },
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_at_most_limit_turns() {
        for n in [0usize, 1, 19, 20, 21, 45] {
            let mut history = ConversationHistory::new(20);
            for i in 0..n {
                history.push_user(&format!("message {i}"));
            }
            assert_eq!(history.len(), n.min(20), "after {n} appends");
            if n > 0 {
                assert_eq!(
                    history.turns().last().map(String::as_str),
                    Some(format!("User: message {}", n - 1).as_str())
                );
            }
        }
    }

    #[test]
    fn assistant_turn_is_truncated_by_chars() {
        let mut history = ConversationHistory::default();
        let reply = "é".repeat(1500);
        history.push_assistant(&reply, 1000);
        let turn = &history.turns()[0];
        assert_eq!(turn.chars().count(), "Assistant: ".len() + 1000);
        assert!(turn.starts_with("Assistant: "));
    }

    #[test]
    fn recent_returns_tail() {
        let mut history = ConversationHistory::default();
        for i in 0..10 {
            history.push_user(&i.to_string());
        }
        assert_eq!(history.recent(3), ["User: 7", "User: 8", "User: 9"]);
        assert_eq!(history.recent(50).len(), 10);
    }

    #[test]
    fn multiline_turns_survive_storage() {
        let mut history = ConversationHistory::default();
        history.push_user("Is this true?\n[Extracted text from media 1]:\nC:\\cure");
        history.push_assistant("Verdict: False\nSummary: No.", 1000);
        let stored = history.encode();
        assert_eq!(stored.lines().count(), 2);
        assert_eq!(ConversationHistory::decode(&stored, 20), history);
    }

    #[test]
    fn decode_trims_to_limit_and_skips_blank_lines() {
        let stored = "User: a\n\nAssistant: b\nUser: c\n";
        let history = ConversationHistory::decode(stored, 2);
        assert_eq!(history.turns(), ["Assistant: b", "User: c"]);
    }

    #[test]
    fn stray_backslashes_are_kept() {
        assert_eq!(unescape("a\\qb\\"), "a\\qb\\");
    }
}
