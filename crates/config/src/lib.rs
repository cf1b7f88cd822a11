//! Configuration loading, validation, and env substitution.
//!
//! Config files: `claimguard.toml`, `claimguard.yaml`, or `claimguard.json`
//! Searched in `./` then `~/.config/claimguard/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values. Secrets and a few
//! deployment knobs are also read directly from the environment
//! (`GEMINI_API_KEY`, `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`, `PORT`, ...).

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{
        apply_env_overrides, config_dir, discover_and_load, find_config_file, load_config,
        load_or_discover,
    },
    schema::{
        ChatConfig, ClaimguardConfig, ExtractConfig, GeminiConfig, MediaConfig, ServerConfig,
        SourcesConfig, StorageConfig, TwilioConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate, validate_file},
};
