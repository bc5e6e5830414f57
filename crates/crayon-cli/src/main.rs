use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use crayon_agents::ToolContext;
use crayon_channels::discord::{DiscordChannel, DiscordConfig};
use crayon_channels::{ChannelLifecycle, ChannelStatus, split_message};
use crayon_common::ConversationHistory;
use crayon_config::{AppConfig, ConfigLoader};
use crayon_gateway::build_services;
use crayon_security::RedactingWriter;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "crayon", version, about = "A Discord companion that knows when to chime in")]
struct Cli {
    /// YAML config file (defaults to ./config.yml when present)
    #[arg(short, long, global = true, env = "CRAYON_CONFIG")]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and serve until Ctrl-C
    Start,
    /// Validate the configuration and probe the Gemini API
    Check,
    /// Ask one question locally, without Discord
    Ask {
        /// The message to send
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(RedactingWriter::stderr());
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<AppConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = path {
        loader = loader.with_config_path(path);
    }
    loader.load().context("failed to load configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = load_config(cli.config)?;
    match cli.command {
        Commands::Start => start(config).await,
        Commands::Check => check(config).await,
        Commands::Ask { text } => ask(config, &text.join(" ")).await,
    }
}

async fn start(config: AppConfig) -> Result<()> {
    config.validate()?;
    let services = build_services(&config)?;

    let discord_config = DiscordConfig::from_settings(
        config.discord.bot_token.as_deref(),
        &config.discord.command_prefix,
    )?
    .with_request_timeout(config.agent.request_timeout());
    let mut channel = DiscordChannel::new(discord_config, services.router.clone());
    let mut status = channel.subscribe_status();
    channel.connect().await?;
    info!("crayon is running, press Ctrl-C to stop");

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            info!("shutting down");
        }
        reason = wait_for_failure(&mut status) => {
            error!("discord connection failed: {reason}");
            channel.disconnect().await?;
            bail!("discord connection failed: {reason}");
        }
    }

    channel.disconnect().await?;
    Ok(())
}

async fn wait_for_failure(status: &mut watch::Receiver<ChannelStatus>) -> String {
    loop {
        if let ChannelStatus::Error(reason) = status.borrow_and_update().clone() {
            return reason;
        }
        if status.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn check(config: AppConfig) -> Result<()> {
    config.validate()?;
    println!("configuration ok");

    let services = build_services(&config)?;
    let model = &config.llm.model;
    if services.exchange.health_check().await? {
        println!("gemini ok ({model})");
        Ok(())
    } else {
        bail!("gemini health check failed for model {model}")
    }
}

async fn ask(config: AppConfig, text: &str) -> Result<()> {
    config.validate_llm()?;
    let services = build_services(&config)?;

    let tools = services.engine.tool_definitions();
    let context = ToolContext {
        channel_id: "cli".to_string(),
        requested_by: None,
    };
    let reply = services
        .engine
        .converse(&context, text, &ConversationHistory::empty(), Some(tools.as_slice()))
        .await;

    let answer = reply.text();
    for segment in split_message(&answer, config.agent.max_message_len) {
        println!("{segment}");
    }
    Ok(())
}
