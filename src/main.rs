//! botdash: terminal dashboard and offline proxy for a trading bot.
//!
//! Entry point. Loads configuration, initialises structured logging, and
//! runs one of the control, watch or serve commands.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

use botdash::cache::network::HttpNetwork;
use botdash::cache::proxy;
use botdash::cache::storage::CacheStorage;
use botdash::cache::worker::OfflineCacheWorker;
use botdash::client::dashboard::Dashboard;
use botdash::client::state::PollOutcome;
use botdash::client::view::TerminalView;
use botdash::client::HttpBotClient;
use botdash::config::{self, AppConfig};
use botdash::types::Mode;

#[derive(Parser, Debug)]
#[command(author, version, about = "Control and watch a trading bot", long_about = None)]
struct Cli {
    /// Path to the botdash TOML config.
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE)]
    config: String,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Start the bot, then show its status.
    Start {
        /// simulate | live
        #[arg(long)]
        mode: Option<Mode>,
        /// Bot-side config file path.
        #[arg(long = "bot-config")]
        bot_config: Option<String>,
    },
    /// Stop the bot, then show its status.
    Stop,
    /// Show the bot's status once.
    Status,
    /// Poll and redraw the status until Ctrl+C.
    Watch,
    /// Pre-cache the dashboard assets and run the offline proxy.
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    let cfg = AppConfig::load_or_default(&cli.config)?;

    init_logging();

    info!(
        bot = %cfg.bot.base_url,
        interval_secs = cfg.poll.interval_secs,
        command = ?cli.command,
        "botdash starting"
    );

    match cli.command {
        Cmd::Start { mode, bot_config } => {
            let dashboard = build_dashboard(&cfg)?;
            let mode = mode.unwrap_or(cfg.control.default_mode);
            let path = bot_config.or_else(|| cfg.control.default_config_path.clone());
            dashboard
                .start(mode, path.as_deref())
                .await
                .context("start command failed")?;
        }
        Cmd::Stop => {
            let dashboard = build_dashboard(&cfg)?;
            dashboard.stop().await.context("stop command failed")?;
        }
        Cmd::Status => {
            let dashboard = build_dashboard(&cfg)?;
            if dashboard.refresh_status().await == PollOutcome::Failed {
                bail!("could not fetch status from {}", cfg.bot.base_url);
            }
        }
        Cmd::Watch => {
            let dashboard = build_dashboard(&cfg)?;
            info!("Watching bot status. Press Ctrl+C to stop.");
            dashboard.run(cfg.poll_interval(), shutdown_signal()).await;
        }
        Cmd::Serve { port } => {
            let port = port.unwrap_or(cfg.cache.listen_port);
            let network = Arc::new(HttpNetwork::new(&cfg.bot.base_url, cfg.request_timeout())?);
            let storage = Arc::new(CacheStorage::new());
            let worker = Arc::new(OfflineCacheWorker::from_config(&cfg.cache, storage, network)?);

            worker
                .install()
                .await
                .context("offline cache install failed")?;
            let evicted = worker.activate().await?;
            info!(
                bucket = worker.bucket_name(),
                evicted = evicted.len(),
                "Offline cache ready"
            );

            proxy::serve(worker.clone(), port, shutdown_signal()).await?;

            let stats = worker.stats();
            info!(hits = stats.hits, misses = stats.misses, "Offline proxy shut down cleanly.");
        }
    }

    Ok(())
}

fn build_dashboard(cfg: &AppConfig) -> Result<Dashboard> {
    let api = HttpBotClient::new(&cfg.bot.base_url, cfg.request_timeout())?;
    Ok(Dashboard::new(
        Arc::new(api),
        Arc::new(TerminalView),
        cfg.stale_after(),
    ))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received.");
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("botdash=info"));

    let json_logging = std::env::var("BOTDASH_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
