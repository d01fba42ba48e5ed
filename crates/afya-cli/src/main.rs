use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use afya_core::{GoogleProvider, LlmProvider, Orchestrator, OrchestratorConfig, WhatsAppLink};
use afya_gateway::GatewayServer;
use afya_store::ConsultationDb;
use config::AfyaConfig;

#[derive(Parser)]
#[command(name = "afya")]
#[command(version)]
#[command(about = "AfyaMkononi: multi-agent health assistant backend")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory and default config
    Init,

    /// Show current configuration
    Config,

    /// Start the HTTP API
    Serve {
        /// Override the bind address from config
        #[arg(long)]
        bind: Option<String>,
    },

    /// Run one message through the agent pipeline
    Ask {
        /// The message to send
        message: String,

        /// User id the interaction is recorded under
        #[arg(short, long, default_value = "cli")]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config),
        Commands::Serve { bind } => cmd_serve(&cli.config, bind).await,
        Commands::Ask { message, user } => cmd_ask(&cli.config, &message, &user).await,
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
    } else {
        tokio::fs::write(&config_path, config::DEFAULT_CONFIG).await?;
        info!("Created default config at {}", config_path.display());
    }

    println!("AfyaMkononi initialized at {}", config_dir.display());
    println!("Export GEMINI_API_KEY or edit {} before running `afya serve`.", config_path.display());
    Ok(())
}

fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = AfyaConfig::load(config_path)?;
    println!("{:#?}", cfg);
    Ok(())
}

/// Wire the provider, store and orchestrator from config
fn build_orchestrator(cfg: &AfyaConfig, db: &ConsultationDb) -> Result<Orchestrator> {
    let api_key = cfg.require_api_key()?.to_string();
    let google = &cfg.providers.google;

    let provider = GoogleProvider::with_timeout(
        api_key,
        google.model.clone(),
        google.max_tokens,
        Duration::from_secs(google.timeout_secs),
    )?
    .with_base_url(google.base_url.clone())
    .with_temperature(google.temperature);
    info!("Using {} model {}", provider.provider_name(), provider.model());

    let whatsapp = WhatsAppLink::new(
        &cfg.escalation.whatsapp_base_url,
        &cfg.escalation.whatsapp_number,
    )
    .context("Invalid [escalation] config")?;

    Ok(Orchestrator::new(
        Arc::new(provider),
        Arc::new(db.clone()),
        whatsapp,
        OrchestratorConfig {
            history_window: cfg.orchestrator.history_window,
        },
    ))
}

fn open_store(cfg: &AfyaConfig) -> Result<ConsultationDb> {
    let db_path = config::shellexpand(&cfg.store.db_path);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data dir: {}", parent.display()))?;
    }
    ConsultationDb::new(&db_path)
}

async fn cmd_serve(config_path: &Option<PathBuf>, bind: Option<String>) -> Result<()> {
    let cfg = AfyaConfig::load(config_path)?;
    let db = open_store(&cfg)?;
    let orchestrator = build_orchestrator(&cfg, &db)?;

    let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("Invalid bind address: {}", bind))?;

    let cancel = CancellationToken::new();
    let server = GatewayServer::new(addr, Arc::new(orchestrator), db);
    let mut server_task = tokio::spawn(server.run(cancel.clone()));

    // Wait for shutdown signal, or for the server to die on its own
    tokio::select! {
        res = signal::ctrl_c() => {
            res?;
            info!("Received Ctrl+C, shutting down...");
            cancel.cancel();
            server_task.await.context("Gateway task panicked")??;
        }
        res = &mut server_task => {
            res.context("Gateway task panicked")??;
        }
    }
    Ok(())
}

async fn cmd_ask(config_path: &Option<PathBuf>, message: &str, user: &str) -> Result<()> {
    let cfg = AfyaConfig::load(config_path)?;
    let db = open_store(&cfg)?;
    let orchestrator = build_orchestrator(&cfg, &db)?;

    let dispatch = orchestrator.dispatch(message, user, &[]).await;
    for result in &dispatch.agent_results {
        info!("{} agent: {}", result.agent(), result.message());
    }
    println!("{}", serde_json::to_string_pretty(&dispatch.response)?);

    // The process exits right after; let the record land first
    if let Some(memory) = dispatch.memory {
        let outcome = memory.await.context("Memory task panicked")?;
        if !outcome.stored {
            warn!("Interaction was not recorded");
        }
    }
    Ok(())
}
