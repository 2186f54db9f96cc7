use std::path::PathBuf;

use clap::Parser;
use log::{error, info};
use tokio::signal;
use tokio::sync::watch;

use burn_watch::blockchain::{BurnWatcher, BurnWatcherConfig, RpcConnector};
use burn_watch::cache::DedupCache;
use burn_watch::config::AppConfig;
use burn_watch::logging::init_logging;
use burn_watch::notifier::TelegramNotifier;

#[derive(Parser)]
#[command(name = "burn-watch")]
#[command(about = "Watches an ERC-20 token for burns from one address and posts them to Telegram")]
#[command(version)]
struct Args {
    /// TOML configuration file, `CONFIG_FILE` or ./config.toml when omitted.
    /// Environment variables override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print a sample configuration file and exit
    #[arg(long)]
    print_sample_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.print_sample_config {
        println!("{}", AppConfig::generate_sample_config()?);
        return Ok(());
    }

    let loaded = match &args.config {
        Some(path) => AppConfig::load_with_file(path),
        None => AppConfig::load(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config.logging)?;

    info!("Starting burn-watch {}", env!("CARGO_PKG_VERSION"));

    let cache = match DedupCache::load(&config.cache.path) {
        Ok(cache) => cache,
        Err(e) => {
            error!("Failed to load notification cache: {}", e);
            return Err(e.into());
        }
    };
    info!("Loaded {} notified transactions from {}", cache.len(), cache.path().display());

    let connector = RpcConnector::from_config(&config.rpc);
    let notifier = TelegramNotifier::new(&config.telegram)?;

    let mut watcher = BurnWatcher::new(
        connector,
        notifier,
        cache,
        BurnWatcherConfig::from_app_config(&config),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    spawn_signal_listener(shutdown_tx);

    if let Err(e) = watcher.start(shutdown_rx).await {
        error!("Burn watcher stopped with error: {}", e);
        return Err(e.into());
    }

    info!("Burn watcher stopped");
    Ok(())
}

fn spawn_signal_listener(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        if wait_for_shutdown_signal().await {
            info!("Received shutdown signal");
            let _ = shutdown_tx.send(true);
        } else {
            // Keep the sender alive so the watcher keeps running
            std::future::pending::<()>().await;
        }
    });
}

async fn wait_for_shutdown_signal() -> bool {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal as unix_signal, SignalKind};

        if let Ok(mut term) = unix_signal(SignalKind::terminate()) {
            tokio::select! {
                result = signal::ctrl_c() => {
                    if let Err(err) = result {
                        error!("Unable to listen for shutdown signal: {}", err);
                        return false;
                    }
                }
                _ = term.recv() => {}
            }
            return true;
        }
        error!("Unable to listen for SIGTERM, falling back to Ctrl-C only");
    }

    match signal::ctrl_c().await {
        Ok(()) => true,
        Err(err) => {
            error!("Unable to listen for shutdown signal: {}", err);
            false
        }
    }
}
