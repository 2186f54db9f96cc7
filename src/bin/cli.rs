use std::path::PathBuf;

use clap::{Parser, Subcommand};

use burn_watch::blockchain::{ChainClient, ChainConnector, RpcConnector};
use burn_watch::cache::DedupCache;
use burn_watch::config::AppConfig;

#[derive(Parser)]
#[command(name = "burn-watch-cli")]
#[command(about = "Inspect the burn-watch notification cache and RPC endpoint")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect notified transactions
    Cache {
        /// Cache file, overrides the configured path
        #[arg(long)]
        path: Option<PathBuf>,

        #[command(subcommand)]
        action: CacheAction,
    },
    /// Connect to the RPC endpoint and print the chain head
    Check,
    /// Print a sample configuration file
    SampleConfig,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Print every cached transaction hash
    List,
    /// Print the number of cached transactions
    Count,
    /// Exit with status 0 if the transaction was notified, 1 otherwise
    Contains { transaction_hash: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Quieter than the watcher itself
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::SampleConfig => {
            println!("{}", AppConfig::generate_sample_config()?);
        }
        Commands::Cache { path, action } => {
            let path = match path {
                Some(path) => path,
                None => PathBuf::from(unvalidated_config(&cli.config)?.cache.path),
            };

            let cache = match DedupCache::load(&path) {
                Ok(cache) => cache,
                Err(e) => {
                    eprintln!("Failed to load cache at '{}': {}", path.display(), e);
                    std::process::exit(1);
                }
            };

            match action {
                CacheAction::List => {
                    for tx in cache.iter() {
                        println!("{}", tx);
                    }
                }
                CacheAction::Count => println!("{}", cache.len()),
                CacheAction::Contains { transaction_hash } => {
                    if cache.contains(&transaction_hash) {
                        println!("notified");
                    } else {
                        println!("not notified");
                        std::process::exit(1);
                    }
                }
            }
        }
        Commands::Check => {
            let config = unvalidated_config(&cli.config)?;
            if config.rpc.endpoint.is_empty() {
                eprintln!("RPC_URL is not set");
                std::process::exit(1);
            }

            let connector = RpcConnector::from_config(&config.rpc);
            let client = match connector.connect().await {
                Ok(client) => client,
                Err(e) => {
                    eprintln!("Failed to connect to {}: {}", config.rpc.endpoint, e);
                    std::process::exit(1);
                }
            };

            let chain_id = client.chain_id().await?;
            let height = client.current_height().await?;
            println!("endpoint: {}", client.endpoint());
            println!("chain id: {}", chain_id);
            println!("head:     {}", height);
        }
    }

    Ok(())
}

/// File plus environment, without requiring the watcher-only settings
fn unvalidated_config(path: &std::path::Path) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = AppConfig::load_from_file(path)?;
    config.apply_env_overrides()?;
    Ok(config)
}
