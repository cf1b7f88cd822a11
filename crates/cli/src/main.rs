mod config_commands;
mod history_commands;

use std::{path::PathBuf, sync::Arc};

use {
    clap::{Parser, Subcommand},
    claimguard_auto_reply::{ClaimVerifier, ReplyPipeline},
    claimguard_common::{InboundMessage, MediaRef},
    claimguard_config::ClaimguardConfig,
    claimguard_gateway::AppState,
    claimguard_providers::{GeminiProvider, ReasoningService, shared_http_client},
    claimguard_sessions::ConversationStore,
    claimguard_sources::Allowlist,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use crate::{config_commands::ConfigAction, history_commands::HistoryAction};

#[derive(Parser)]
#[command(
    name = "claimguard",
    about = "Health-claim assistant that cites only authoritative sources"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery in ./ and the user config dir).
    #[arg(long, global = true, env = "CLAIMGUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server (default when no subcommand is provided).
    Serve,
    /// Run one message through the reply pipeline and print the chunks.
    Ask {
        /// Text body of the message.
        #[arg(default_value = "")]
        message: String,
        /// Sender id used for conversation history.
        #[arg(long, default_value = "cli")]
        from: String,
        /// Attachment as `CONTENT_TYPE:URL`, e.g. `image/png:https://host/a.png`.
        #[arg(long, value_parser = parse_media)]
        media: Vec<MediaRef>,
    },
    /// Verify a single claim and print the JSON verdict.
    Verify { text: String },
    /// Inspect or clear stored conversation history.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

fn parse_media(raw: &str) -> Result<MediaRef, String> {
    match raw.split_once(':') {
        Some((content_type, url)) if content_type.contains('/') && !url.is_empty() => {
            Ok(MediaRef::new(url, content_type))
        },
        _ => Err(format!("expected CONTENT_TYPE:URL, got `{raw}`")),
    }
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// The reply pipeline and claim verifier over one Gemini client and one store.
async fn build_services(
    config: &ClaimguardConfig,
) -> anyhow::Result<(ReplyPipeline, ClaimVerifier)> {
    let client = shared_http_client().clone();
    let service: Arc<dyn ReasoningService> = Arc::new(GeminiProvider::new(
        client.clone(),
        &config.providers.gemini,
    ));
    info!(
        provider = service.name(),
        model = service.model(),
        "reasoning service ready"
    );

    let store =
        ConversationStore::open(&config.storage.database_url, config.chat.history_limit).await?;
    let pipeline = ReplyPipeline::from_config(config, client, Arc::clone(&service), store);
    let verifier = ClaimVerifier::new(service, Allowlist::new(&config.sources.allowed_domains));
    Ok((pipeline, verifier))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "claimguard starting");

    let config_path = cli.config.as_deref();
    let load = || claimguard_config::load_or_discover(config_path);

    match cli.command {
        None | Some(Commands::Serve) => {
            let config = load()?;
            let bind = cli.bind.unwrap_or_else(|| config.server.bind.clone());
            let port = cli.port.unwrap_or(config.server.port);
            let (pipeline, verifier) = build_services(&config).await?;
            claimguard_gateway::start_server(&bind, port, AppState::new(pipeline, verifier)).await
        },
        Some(Commands::Ask {
            message,
            from,
            media,
        }) => {
            let (pipeline, _) = build_services(&load()?).await?;
            let mut inbound = InboundMessage::text(from, message.trim());
            for item in media {
                inbound = inbound.with_media(item);
            }
            let reply = pipeline.process_inbound(&inbound).await;
            for chunk in &reply.chunks {
                println!("{chunk}\n");
            }
            if reply.failed {
                anyhow::bail!("reasoning service failed; the apology was sent instead");
            }
            Ok(())
        },
        Some(Commands::Verify { text }) => {
            let (_, verifier) = build_services(&load()?).await?;
            let response = verifier.verify(&text).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        },
        Some(Commands::History { action }) => {
            history_commands::handle_history(action, &load()?).await
        },
        // Load failures are reported as diagnostics here, not as an error.
        Some(Commands::Config { action }) => config_commands::handle_config(action, config_path),
    }
}
