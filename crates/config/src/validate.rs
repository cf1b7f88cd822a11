//! Configuration validation.
//!
//! Checks a configuration file for syntax errors and unknown (usually
//! misspelled) fields, then checks the loaded values for settings that would
//! break the reply pipeline at runtime.

use std::path::Path;

use {secrecy::ExposeSecret, serde_json::Value};

use crate::{env_subst::substitute_env, loader::apply_env_overrides, schema::ClaimguardConfig};

/// Hard size limit of one outbound message on the WhatsApp transport.
pub const TRANSPORT_MESSAGE_LIMIT: usize = 1_600;

/// Optional keys that are absent from the serialized defaults.
const OPTIONAL_KEYS: &[&str] = &[
    "providers.gemini.api_key",
    "twilio.account_sid",
    "twilio.auth_token",
];

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "missing-secret", "limit", "sources"
    pub category: &'static str,
    /// Dotted path, e.g. "chat.chunk_limit"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

/// Validate a config file: syntax, unknown fields, then semantic checks on
/// the parsed values.
pub fn validate_file(path: &Path) -> ValidationResult {
    let mut result = ValidationResult {
        config_path: Some(path.to_path_buf()),
        ..Default::default()
    };

    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => substitute_env(&raw),
        Err(e) => {
            result.diagnostics.push(Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("failed to read {}: {e}", path.display()),
            ));
            return result;
        },
    };

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    let parsed: Result<Value, String> = match ext {
        "toml" => toml::from_str::<toml::Value>(&raw)
            .map_err(|e| e.to_string())
            .and_then(|v| serde_json::to_value(v).map_err(|e| e.to_string())),
        "yaml" | "yml" => serde_yaml::from_str::<Value>(&raw).map_err(|e| e.to_string()),
        "json" => serde_json::from_str::<Value>(&raw).map_err(|e| e.to_string()),
        other => Err(format!("unsupported config format: .{other}")),
    };

    let value = match parsed {
        Ok(value) => value,
        Err(message) => {
            result
                .diagnostics
                .push(Diagnostic::new(Severity::Error, "syntax", "", message));
            return result;
        },
    };

    if let Ok(known) = serde_json::to_value(ClaimguardConfig::default()) {
        check_unknown_fields(&value, &known, "", &mut result.diagnostics);
    }

    match serde_json::from_value::<ClaimguardConfig>(value) {
        Ok(config) => result
            .diagnostics
            .extend(validate(&apply_env_overrides(config)).diagnostics),
        Err(e) => result.diagnostics.push(Diagnostic::new(
            Severity::Error,
            "syntax",
            "",
            format!("invalid value: {e}"),
        )),
    }

    result
}

fn check_unknown_fields(value: &Value, known: &Value, prefix: &str, out: &mut Vec<Diagnostic>) {
    let (Value::Object(fields), Value::Object(known_fields)) = (value, known) else {
        return;
    };
    for (key, child) in fields {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match known_fields.get(key) {
            Some(known_child) => check_unknown_fields(child, known_child, &path, out),
            None if OPTIONAL_KEYS.contains(&path.as_str()) => {},
            None => out.push(Diagnostic::new(
                Severity::Warning,
                "unknown-field",
                path.clone(),
                format!("unknown field `{path}` is ignored"),
            )),
        }
    }
}

/// Semantic checks on a loaded configuration.
#[must_use]
pub fn validate(config: &ClaimguardConfig) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let has_key = config
        .providers
        .gemini
        .api_key
        .as_ref()
        .is_some_and(|k| !k.expose_secret().trim().is_empty());
    if !has_key {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "missing-secret",
            "providers.gemini.api_key",
            "no Gemini API key configured (set GEMINI_API_KEY)",
        ));
    }

    if config.twilio.credentials().is_none() {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "missing-secret",
            "twilio",
            "no Twilio credentials configured; attachment downloads will be unauthenticated",
        ));
    }

    if config.sources.allowed_domains.is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "sources",
            "sources.allowed_domains",
            "allow-list is empty; every cited source will be dropped",
        ));
    }
    for (i, domain) in config.sources.allowed_domains.iter().enumerate() {
        if domain.contains("://") || domain.contains('/') || domain.trim() != domain {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "sources",
                format!("sources.allowed_domains[{i}]"),
                format!("`{domain}` must be a bare host name such as `who.int`"),
            ));
        }
    }
    if config.sources.max_sources == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "limit",
            "sources.max_sources",
            "max_sources is 0; replies will never carry a Sources block",
        ));
    }

    let chat = &config.chat;
    if chat.chunk_limit == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "limit",
            "chat.chunk_limit",
            "chunk_limit must be greater than 0",
        ));
    } else if chat.chunk_limit + "(99/99) ".len() > TRANSPORT_MESSAGE_LIMIT {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "limit",
            "chat.chunk_limit",
            format!(
                "chunk_limit {} leaves no room for part markers under the {TRANSPORT_MESSAGE_LIMIT}-character transport limit",
                chat.chunk_limit
            ),
        ));
    }
    if chat.history_limit == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "limit",
            "chat.history_limit",
            "history_limit must be greater than 0",
        ));
    }
    if chat.prompt_history_turns > chat.history_limit {
        diagnostics.push(Diagnostic::new(
            Severity::Info,
            "limit",
            "chat.prompt_history_turns",
            "prompt_history_turns exceeds history_limit; only stored turns can be replayed",
        ));
    }
    if config.media.max_attempts == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "limit",
            "media.max_attempts",
            "max_attempts must be at least 1",
        ));
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::Secret, std::io::Write};

    fn configured() -> ClaimguardConfig {
        let mut cfg = ClaimguardConfig::default();
        cfg.providers.gemini.api_key = Some(Secret::new("k".into()));
        cfg.twilio.account_sid = Some("AC1".into());
        cfg.twilio.auth_token = Some(Secret::new("t".into()));
        cfg
    }

    #[test]
    fn configured_defaults_are_clean() {
        let result = validate(&configured());
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let result = validate(&ClaimguardConfig::default());
        assert!(result.has_errors());
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.path == "providers.gemini.api_key")
        );
    }

    #[test]
    fn domain_with_scheme_is_rejected() {
        let mut cfg = configured();
        cfg.sources.allowed_domains.push("https://who.int/".into());
        let result = validate(&cfg);
        assert_eq!(result.count(Severity::Error), 1);
        assert!(result.diagnostics[0].path.starts_with("sources.allowed_domains["));
    }

    #[test]
    fn oversized_chunk_limit_warns() {
        let mut cfg = configured();
        cfg.chat.chunk_limit = 1_600;
        let result = validate(&cfg);
        assert_eq!(result.count(Severity::Warning), 1);
    }

    #[test]
    fn file_with_typo_reports_unknown_field() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(b"[chat]\nchunk_limt = 100\n\n[providers.gemini]\napi_key = \"k\"\n")
            .unwrap();
        let result = validate_file(file.path());
        let unknown: Vec<_> = result
            .diagnostics
            .iter()
            .filter(|d| d.category == "unknown-field")
            .collect();
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].path, "chat.chunk_limt");
    }

    #[test]
    fn file_with_syntax_error_stops_early() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(b"[chat\n").unwrap();
        let result = validate_file(file.path());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].category, "syntax");
    }
}
