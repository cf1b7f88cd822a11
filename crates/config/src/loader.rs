use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::ClaimguardConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "claimguard.toml",
    "claimguard.yaml",
    "claimguard.yml",
    "claimguard.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<ClaimguardConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations, then apply environment
/// overrides.
///
/// Search order:
/// 1. `./claimguard.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/claimguard/claimguard.{toml,yaml,yml,json}` (user-global)
///
/// Falls back to `ClaimguardConfig::default()` if no file is found or the
/// file fails to parse.
pub fn discover_and_load() -> ClaimguardConfig {
    let config = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                ClaimguardConfig::default()
            })
        },
        None => {
            debug!("no config file found, using defaults");
            ClaimguardConfig::default()
        },
    };
    apply_env_overrides(config)
}

/// Load an explicit path if given, otherwise discover.
pub fn load_or_discover(path: Option<&Path>) -> anyhow::Result<ClaimguardConfig> {
    match path {
        Some(path) => Ok(apply_env_overrides(load_config(path)?)),
        None => Ok(discover_and_load()),
    }
}

/// Overlay secrets and deployment knobs from the process environment.
///
/// Environment values win over file values so that secrets can stay out of
/// the config file entirely.
pub fn apply_env_overrides(config: ClaimguardConfig) -> ClaimguardConfig {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

fn apply_env_overrides_with(
    mut config: ClaimguardConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> ClaimguardConfig {
    let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(key) = var("GEMINI_API_KEY") {
        config.providers.gemini.api_key = Some(Secret::new(key));
    }
    if let Some(model) = var("GEMINI_MODEL") {
        config.providers.gemini.model = model;
    }
    if let Some(sid) = var("TWILIO_ACCOUNT_SID") {
        config.twilio.account_sid = Some(sid);
    }
    if let Some(token) = var("TWILIO_AUTH_TOKEN") {
        config.twilio.auth_token = Some(Secret::new(token));
    }
    if let Some(url) = var("CLAIMGUARD_DATABASE_URL") {
        config.storage.database_url = url;
    }
    if let Some(port) = var("PORT") {
        match port.parse() {
            Ok(port) => config.server.port = port,
            Err(e) => warn!(value = %port, error = %e, "ignoring invalid PORT"),
        }
    }
    config
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/claimguard/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "claimguard").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<ClaimguardConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
