//! One-shot claim verification returning a structured verdict.

use std::{fmt::Write as _, sync::Arc};

use {
    claimguard_providers::ReasoningService,
    claimguard_sources::Allowlist,
    serde::{Deserialize, Serialize},
    serde_json::Value,
    sha2::{Digest, Sha256},
    tracing::{info, warn},
};

const MAX_LINKS: usize = 3;
const MAX_TITLE_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    True,
    False,
    Misleading,
    Unclear,
}

impl Verdict {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "True" => Some(Self::True),
            "False" => Some(Self::False),
            "Misleading" => Some(Self::Misleading),
            "Unclear" => Some(Self::Unclear),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyLink {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    /// First 12 hex chars of SHA-256 over the normalized claim.
    pub id: String,
    pub verdict: Verdict,
    pub summary: String,
    pub links: Vec<VerifyLink>,
}

impl VerifyResponse {
    fn unclear(id: String, summary: impl Into<String>) -> Self {
        Self {
            id,
            verdict: Verdict::Unclear,
            summary: summary.into(),
            links: Vec::new(),
        }
    }
}

/// Asks the reasoning service for a JSON verdict and validates it.
#[derive(Clone)]
pub struct ClaimVerifier {
    service: Arc<dyn ReasoningService>,
    allowlist: Allowlist,
}

impl ClaimVerifier {
    pub fn new(service: Arc<dyn ReasoningService>, allowlist: Allowlist) -> Self {
        Self { service, allowlist }
    }

    pub async fn verify(&self, text: &str) -> VerifyResponse {
        let claim = normalize_claim(text);
        let id = claim_id(&claim);
        if claim.is_empty() {
            return VerifyResponse::unclear(id, "Empty claim provided");
        }

        let raw = match self.service.generate_text(&self.prompt(&claim)).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(id = %id, error = %e, "verification call failed");
                return VerifyResponse::unclear(id, format!("API error: {e}"));
            },
        };

        let response = match parse_response(&raw, &self.allowlist) {
            Ok((verdict, summary, links)) => VerifyResponse {
                id,
                verdict,
                summary,
                links,
            },
            Err(reason) => {
                VerifyResponse::unclear(id, format!("Error parsing response: {reason}"))
            },
        };
        info!(
            id = %response.id,
            verdict = ?response.verdict,
            links = response.links.len(),
            "claim verified"
        );
        response
    }

    fn prompt(&self, claim: &str) -> String {
        format!(
            "You are a health fact-checker that verifies claims using only authoritative sources.\n\
             Rules:\n\
             1. Evaluate if the claim is \"True\", \"False\", \"Misleading\", or \"Unclear\"\n\
             2. Provide a concise summary of up to 5 sentences explaining your verdict\n\
             3. Include up to {MAX_LINKS} supporting links ONLY from these domains: {}\n\
             4. If unsure or no valid sources found, return \"Unclear\" with empty links\n\
             \n\
             Return only valid JSON in this shape:\n\
             {{\"verdict\": \"True|False|Misleading|Unclear\", \"summary\": \"...\", \
             \"links\": [{{\"title\": \"...\", \"url\": \"...\"}}]}}\n\
             \n\
             Claim to verify:\n{claim}",
            self.allowlist.roots().join(", ")
        )
    }
}

/// Collapse whitespace runs and trim.
pub fn normalize_claim(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn claim_id(normalized: &str) -> String {
    let digest = Sha256::digest(normalized.as_bytes());
    let mut id = String::with_capacity(12);
    for byte in &digest[..6] {
        let _ = write!(id, "{byte:02x}");
    }
    id
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_response(
    raw: &str,
    allowlist: &Allowlist,
) -> Result<(Verdict, String, Vec<VerifyLink>), String> {
    let value: Value = serde_json::from_str(strip_code_fence(raw)).map_err(|e| e.to_string())?;
    let (Some(verdict), Some(summary), Some(links)) =
        (value.get("verdict"), value.get("summary"), value.get("links"))
    else {
        return Err("Missing required fields in response".into());
    };

    let summary = match summary {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    let links: Vec<VerifyLink> = links
        .as_array()
        .map(|items| {
            items
                .iter()
                .take(MAX_LINKS)
                .filter_map(|link| valid_link(link, allowlist))
                .collect()
        })
        .unwrap_or_default();

    let mut verdict = verdict
        .as_str()
        .and_then(Verdict::parse)
        .unwrap_or(Verdict::Unclear);
    if links.is_empty() && verdict != Verdict::Unclear {
        verdict = Verdict::Unclear;
    }
    Ok((verdict, summary, links))
}

fn valid_link(link: &Value, allowlist: &Allowlist) -> Option<VerifyLink> {
    let obj = link.as_object()?;
    let url = obj.get("url").and_then(Value::as_str).unwrap_or("").trim();
    if url.is_empty() || !allowlist.allows(url) {
        return None;
    }
    let title = obj
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or(url)
        .trim()
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect();
    Some(VerifyLink {
        title,
        url: url.to_string(),
    })
}
