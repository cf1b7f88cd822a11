use std::path::Path;

use {anyhow::Result, clap::Subcommand};

use claimguard_config::{
    ValidationResult, find_config_file,
    validate::{self, Severity},
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print the effective configuration (defaults, file, env overrides) as JSON.
    Show,
}

pub fn handle_config(action: ConfigAction, path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Check { verbose } => check(path, verbose),
        ConfigAction::Show => {
            let config = claimguard_config::load_or_discover(path)?;
            let mut value = serde_json::to_value(&config)?;
            redact_secrets(&mut value);
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        },
    }
}

const SECRET_PATHS: &[&str] = &["/providers/gemini/api_key", "/twilio/auth_token"];

fn redact_secrets(value: &mut serde_json::Value) {
    for pointer in SECRET_PATHS {
        if let Some(secret) = value.pointer_mut(pointer) {
            *secret = serde_json::Value::String("[REDACTED]".into());
        }
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn run_checks(path: Option<&Path>) -> ValidationResult {
    match path.map(Path::to_path_buf).or_else(find_config_file) {
        Some(file) => validate::validate_file(&file),
        None => validate::validate(&claimguard_config::discover_and_load()),
    }
}

fn check(path: Option<&Path>, verbose: bool) -> Result<()> {
    let result = run_checks(path);

    if let Some(ref path) = result.config_path {
        eprintln!("Checking {}\n", path.display());
    } else {
        eprintln!("No config file found; checking defaults.\n");
    }

    let mut shown = 0;
    for d in &result.diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let (color, label) = match d.severity {
            Severity::Error => (RED, "error"),
            Severity::Warning => (YELLOW, "warning"),
            Severity::Info => (CYAN, "info"),
        };

        if d.path.is_empty() {
            eprintln!("  {BOLD}{color}{label}{RESET} {}", d.message);
        } else {
            eprintln!("  {BOLD}{color}{label}{RESET} {}: {}", d.path, d.message);
        }
        shown += 1;
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if shown > 0 {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}
