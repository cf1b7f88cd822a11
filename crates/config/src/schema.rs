/// Config schema types (server, providers, transport credentials, sources,
/// media, extraction, chat pipeline, storage).
use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Authoritative health-information root domains that may be cited.
pub const DEFAULT_ALLOWED_DOMAINS: &[&str] = &[
    "who.int",
    "cdc.gov",
    "icmr.gov.in",
    "mohfw.gov.in",
    "fda.gov",
    "ema.europa.eu",
    "nice.org.uk",
    "nih.gov",
    "ncbi.nlm.nih.gov",
    "cochranelibrary.com",
    "bmj.com",
    "thelancet.com",
    "nature.com",
];

/// Keywords that mark a message as a checkable health claim.
pub const DEFAULT_CLAIM_KEYWORDS: &[&str] = &[
    "cure",
    "cures",
    "causes",
    "prevents",
    "hoax",
    "fake",
    "myth",
    "claim",
    "vaccine",
    "vaccination",
    "covid",
    "coronavirus",
    "garlic",
    "treatment",
    "miracle",
];

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimguardConfig {
    pub server: ServerConfig,
    pub providers: ProvidersConfig,
    pub twilio: TwilioConfig,
    pub sources: SourcesConfig,
    pub media: MediaConfig,
    pub extract: ExtractConfig,
    pub chat: ChatConfig,
    pub storage: StorageConfig,
}

/// Webhook server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    /// Port to listen on. Defaults to 5000.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 5000,
        }
    }
}

/// Generative reasoning service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub gemini: GeminiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<Secret<String>>,
    /// Model used for both text-only and multimodal calls.
    pub model: String,
    /// Generative Language API base URL (override for proxies and tests).
    pub base_url: String,
    pub timeout_seconds: u64,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-1.5-flash".into(),
            base_url: "https://generativelanguage.googleapis.com".into(),
            timeout_seconds: 60,
            temperature: 0.2,
            max_output_tokens: 1024,
        }
    }
}

/// Transport credentials used to fetch attachment bytes from the media host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TwilioConfig {
    pub account_sid: Option<String>,
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub auth_token: Option<Secret<String>>,
}

impl TwilioConfig {
    /// Basic-auth pair, when both halves are configured.
    #[must_use]
    pub fn credentials(&self) -> Option<(String, Secret<String>)> {
        match (&self.account_sid, &self.auth_token) {
            (Some(sid), Some(token)) if !sid.is_empty() && !token.expose_secret().is_empty() => {
                Some((sid.clone(), token.clone()))
            },
            _ => None,
        }
    }
}

/// Citation allow-list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Root domains; a URL is citable when its host equals or is a subdomain
    /// of one of these.
    pub allowed_domains: Vec<String>,
    /// Maximum number of sources kept in a reply.
    pub max_sources: usize,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            allowed_domains: DEFAULT_ALLOWED_DOMAINS
                .iter()
                .map(|d| (*d).to_string())
                .collect(),
            max_sources: 3,
        }
    }
}

/// Attachment download policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each further attempt.
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Timeout applied to each individual attempt.
    pub attempt_timeout_seconds: u64,
    pub max_bytes: usize,
    /// Longest edge of images forwarded to the multimodal call.
    pub max_image_dimension: u32,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 500,
            max_backoff_ms: 4_000,
            attempt_timeout_seconds: 15,
            max_bytes: 20 * 1024 * 1024,
            max_image_dimension: 1568,
        }
    }
}

/// Content extraction settings (OCR, PDF, URL scraping).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub ocr_timeout_seconds: u64,
    /// Tesseract language pack(s), e.g. "eng" or "eng+hin".
    pub ocr_language: String,
    /// Text layers with fewer non-whitespace characters than this fall back to OCR.
    pub pdf_min_text_chars: usize,
    pub pdf_max_pages: u32,
    pub pdf_render_dpi: u32,
    pub scrape_timeout_seconds: u64,
    pub scrape_max_paragraphs: usize,
    /// At most this many distinct URLs are scraped per message.
    pub scrape_max_urls: usize,
    pub scrape_max_chars: usize,
    /// Page bodies are read up to this many bytes.
    pub scrape_max_bytes: usize,
    /// Redirects are followed by hand, re-checking each target.
    pub scrape_max_redirects: u8,
    /// Refuse to scrape hosts resolving to loopback/private addresses.
    pub block_private_hosts: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            ocr_timeout_seconds: 30,
            ocr_language: "eng".into(),
            pdf_min_text_chars: 10,
            pdf_max_pages: 10,
            pdf_render_dpi: 200,
            scrape_timeout_seconds: 10,
            scrape_max_paragraphs: 10,
            scrape_max_urls: 3,
            scrape_max_chars: 4_000,
            scrape_max_bytes: 2 * 1024 * 1024,
            scrape_max_redirects: 3,
            block_private_hosts: true,
        }
    }
}

/// Reply pipeline limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Turns kept per user.
    pub history_limit: usize,
    /// Most recent turns included in a text-only prompt.
    pub prompt_history_turns: usize,
    /// Assistant turns are truncated to this many characters before storage.
    pub assistant_turn_max_chars: usize,
    pub max_context_chars: usize,
    /// Character limit of a single outbound part, before the `(i/n)` marker.
    pub chunk_limit: usize,
    /// Serialize concurrent requests from the same user. When false, two
    /// overlapping requests race on history and the last writer wins.
    pub serialize_per_user: bool,
    pub claim_keywords: Vec<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: 20,
            prompt_history_turns: 8,
            assistant_turn_max_chars: 1_000,
            max_context_chars: 12_000,
            chunk_limit: 1_500,
            serialize_per_user: true,
            claim_keywords: DEFAULT_CLAIM_KEYWORDS
                .iter()
                .map(|k| (*k).to_string())
                .collect(),
        }
    }
}

/// Conversation history persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite URL, or `memory` for a process-local store.
    pub database_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://conversations.db?mode=rwc".into(),
        }
    }
}

impl StorageConfig {
    #[must_use]
    pub fn is_memory(&self) -> bool {
        self.database_url.eq_ignore_ascii_case("memory")
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
