//! Instruction templates for the two reply shapes.

use {claimguard_sources::Allowlist, serde::Serialize};

/// Which answer format the reasoning service is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyMode {
    /// The message asserts something checkable: answer with a verdict.
    Claim,
    /// Anything else: answer the question.
    Query,
}

impl ReplyMode {
    /// Claim-like iff the lowercased text contains any keyword.
    pub fn classify(text: &str, keywords: &[String]) -> Self {
        let lowered = text.to_lowercase();
        if keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .any(|k| !k.is_empty() && lowered.contains(&k))
        {
            Self::Claim
        } else {
            Self::Query
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Claim => "claim",
            Self::Query => "query",
        }
    }
}

impl std::fmt::Display for ReplyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Render the instruction for `mode`, listing the citable domains.
pub fn instruction(mode: ReplyMode, allowlist: &Allowlist, max_sources: usize) -> String {
    let domains = if allowlist.is_empty() {
        "(none configured)".to_string()
    } else {
        allowlist.roots().join(", ")
    };

    let (role, body) = match mode {
        ReplyMode::Claim => (
            "You are a health misinformation checker. Decide whether the claim in the user \
             content is accurate.",
            "Verdict: <True|False|Misleading|Unclear>\n\
             Summary: <2-5 plain sentences explaining the verdict>",
        ),
        ReplyMode::Query => (
            "You are a careful health information assistant. Answer the user's question.",
            "Answer: <2-5 plain sentences>",
        ),
    };

    format!(
        "{role}\n\
         \n\
         Reply in exactly this format and nothing else:\n\
         {body}\n\
         Sources:\n\
         - <url>\n\
         \n\
         Rules:\n\
         - List at most {max_sources} source URLs, one per line, each starting with \"- \".\n\
         - Only cite pages on these domains or their subdomains: {domains}.\n\
         - If no page on those domains supports the answer, write \"- None\" under Sources: \
         and say that no reliable source was found.\n\
         - No preface, no emoji, no markdown headings."
    )
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn keywords() -> Vec<String> {
        claimguard_config::schema::DEFAULT_CLAIM_KEYWORDS
            .iter()
            .map(|k| (*k).to_string())
            .collect()
    }

    #[rstest]
    #[case("Does garlic cure COVID?", ReplyMode::Claim)]
    #[case("5G CAUSES cancer", ReplyMode::Claim)]
    #[case("Is this a miracle treatment", ReplyMode::Claim)]
    #[case("How much water should I drink a day?", ReplyMode::Query)]
    #[case("", ReplyMode::Query)]
    fn classifies_by_keyword(#[case] text: &str, #[case] expected: ReplyMode) {
        assert_eq!(ReplyMode::classify(text, &keywords()), expected);
    }

    #[test]
    fn blank_keywords_never_match() {
        assert_eq!(
            ReplyMode::classify("anything", &[" ".to_string()]),
            ReplyMode::Query
        );
    }

    #[test]
    fn claim_instruction_asks_for_verdict() {
        let allowlist = Allowlist::new(["who.int", "cdc.gov"]);
        let text = instruction(ReplyMode::Claim, &allowlist, 3);
        assert!(text.contains("Verdict: <True|False|Misleading|Unclear>"));
        assert!(text.contains("Summary:"));
        assert!(text.contains("who.int, cdc.gov"));
        assert!(text.contains("at most 3 source URLs"));
        assert!(text.contains("- None"));
        assert!(!text.contains("Answer:"));
    }

    #[test]
    fn query_instruction_asks_for_answer() {
        let text = instruction(ReplyMode::Query, &Allowlist::new(["nih.gov"]), 2);
        assert!(text.contains("Answer: <2-5 plain sentences>"));
        assert!(text.contains("Sources:"));
        assert!(text.contains("no markdown headings"));
        assert!(!text.contains("Verdict:"));
    }
}
