use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use notif_snoop::app::Config;
use notif_snoop::dispatch::{self, CommandHandler, Dispatcher};
use notif_snoop::notify::{self, Monitor, NotificationQueue, ZbusClient};

/// Notification snooper - react to desktop notifications seen on D-Bus
#[derive(Parser)]
#[command(name = "notif-snoop")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Write logs to this file instead of stderr
    #[arg(long, env = "NOTIF_SNOOP_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Config file (defaults to ~/.config/notif-snoop/config.toml)
    #[arg(short, long, env = "NOTIF_SNOOP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured handlers on matching notifications (default)
    Run,
    /// Print every notification as it arrives
    Watch,
    /// Show the config file location and effective settings
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.log_file.as_deref())?;

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Some(Commands::Config) => show_config(&cli.config, &config),
        Some(Commands::Watch) => block_on(watch(config)),
        Some(Commands::Run) | None => block_on(run(config)),
    }
}

fn init_logging(level: &str, log_file: Option<&std::path::Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file: {}", path.display()))?;
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(file).with_ansi(false))
                .init();
        }
        None => {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    info!("notif-snoop starting");
    Ok(())
}

fn block_on<F: std::future::Future<Output = Result<()>>>(fut: F) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(fut)
}

fn show_config(explicit: &Option<PathBuf>, config: &Config) -> Result<()> {
    let path = match explicit {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };
    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Connect, install the eavesdrop rule and start the listener.
///
/// Ctrl-C cancels the returned token.
async fn start(config: &Config) -> Result<(Monitor, CancellationToken)> {
    let shutdown = CancellationToken::new();

    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
        }
        ctrl_c.cancel();
    });

    let capacity = config.queue.checked_capacity()?;
    let client = ZbusClient::connect(config.bus).await?;
    let monitor = notify::start_monitor(client, capacity, shutdown.clone())
        .await
        .context("Failed to start notification monitor")?;

    Ok((monitor, shutdown))
}

/// Consumers are done: stop the listener and report how it ended
async fn finish(monitor: Monitor, shutdown: CancellationToken) -> Result<()> {
    shutdown.cancel();
    monitor.join().await?;
    Ok(())
}

async fn run(config: Config) -> Result<()> {
    let (monitor, shutdown) = start(&config).await?;

    let marker = config.dispatch.summary_marker.clone();
    let mut dispatcher = Dispatcher::new(dispatch::summary_contains(marker));
    for handler in config.handlers.iter().cloned() {
        dispatcher = dispatcher.with_handler(Arc::new(CommandHandler::new(handler)));
    }
    info!(
        "Handlers for summaries containing {:?}: {:?}",
        config.dispatch.summary_marker,
        dispatcher.handler_names().collect::<Vec<_>>()
    );

    dispatcher.run(monitor.queue(), shutdown.clone()).await;
    finish(monitor, shutdown).await
}

async fn watch(config: Config) -> Result<()> {
    let (monitor, shutdown) = start(&config).await?;
    print_notifications(monitor.queue(), shutdown.clone()).await;
    finish(monitor, shutdown).await
}

async fn print_notifications(queue: NotificationQueue, shutdown: CancellationToken) {
    loop {
        let notif = tokio::select! {
            _ = shutdown.cancelled() => return,
            notif = queue.get() => notif,
        };
        let Some(notif) = notif else {
            return;
        };

        let now = chrono::Local::now().format("%H:%M:%S");
        println!("{} {}", now, notif);
        if !notif.actions().is_empty() {
            let actions: Vec<_> = notif.action_pairs().map(|(_, label)| label).collect();
            println!("         actions: {}", actions.join(", "));
        }
        if let Some(urgency) = notif.urgency() {
            println!("         urgency: {}", urgency);
        }
    }
}
