use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::blockchain::transfer_detector::{validate_address, DEAD_ADDRESS};
use crate::error::ConfigError;
use crate::retry::ReconnectPolicy;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub rpc: RpcConfig,
    pub watch: WatchConfig,
    pub cache: CacheConfig,
    pub telegram: TelegramConfig,
    pub logging: LoggingConfig,
}

/// RPC client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// JSON-RPC endpoint URL
    pub endpoint: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Refuse to connect to a node reporting a different chain id
    pub expected_chain_id: Option<u64>,
}

/// What to watch and how often
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// ERC-20 token contract emitting the Transfer events
    pub token_address: String,
    /// Sender whose burns are reported
    pub source_address: String,
    /// Burn destination
    pub dead_address: String,
    pub token_symbol: String,
    pub token_decimals: u8,
    pub poll_interval_seconds: u64,
    /// Delay between connection attempts at startup
    pub reconnect_delay_seconds: u64,
    pub max_reconnect_delay_seconds: u64,
    /// 1.0 keeps the reconnect delay fixed
    pub reconnect_backoff_multiplier: f64,
    /// Upper bound on blocks scanned per cycle, 0 for no limit
    pub max_blocks_per_poll: u64,
    /// Prefix for transaction links, e.g. `https://bscscan.com/tx/`
    pub explorer_tx_url: Option<String>,
}

/// Dedup cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// JSON file holding notified transaction hashes
    pub path: String,
}

/// Telegram destination and credentials
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_base: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Also append log lines to `file_path`
    pub file_enabled: bool,
    pub file_path: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout_seconds: 30,
            expected_chain_id: None,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            token_address: String::new(),
            source_address: String::new(),
            dead_address: DEAD_ADDRESS.to_string(),
            token_symbol: "TOKEN".to_string(),
            token_decimals: 18,
            poll_interval_seconds: 60,
            reconnect_delay_seconds: 30,
            max_reconnect_delay_seconds: 300,
            reconnect_backoff_multiplier: 1.0,
            max_blocks_per_poll: 0,
            explorer_tx_url: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: "./notified_txs.json".to_string(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: "https://api.telegram.org".to_string(),
        }
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_enabled: true,
            file_path: "./burn-watch.log".to_string(),
        }
    }
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_delay_seconds: self.reconnect_delay_seconds,
            max_delay_seconds: self.max_reconnect_delay_seconds,
            backoff_multiplier: self.reconnect_backoff_multiplier,
            jitter: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables.
    /// Environment variables take precedence over file values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_with_file(Path::new(&config_path))
    }

    /// Same as `load`, reading the TOML layer from `path` if it exists
    pub fn load_with_file(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file; a missing file yields defaults
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::Parsing(e.to_string()))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        // RPC configuration
        env_string("RPC_URL", &mut self.rpc.endpoint);
        env_parse("RPC_TIMEOUT_SECONDS", &mut self.rpc.timeout_seconds)?;
        if let Ok(chain_id) = env::var("RPC_EXPECTED_CHAIN_ID") {
            self.rpc.expected_chain_id = Some(parse_value("RPC_EXPECTED_CHAIN_ID", chain_id)?);
        }

        // Watch configuration
        env_string("TOKEN_ADDRESS", &mut self.watch.token_address);
        env_string("SOURCE_ADDRESS", &mut self.watch.source_address);
        env_string("DEAD_ADDRESS", &mut self.watch.dead_address);
        env_string("TOKEN_SYMBOL", &mut self.watch.token_symbol);
        env_parse("TOKEN_DECIMALS", &mut self.watch.token_decimals)?;
        env_parse("POLL_INTERVAL_SECONDS", &mut self.watch.poll_interval_seconds)?;
        env_parse("RECONNECT_DELAY_SECONDS", &mut self.watch.reconnect_delay_seconds)?;
        env_parse("MAX_RECONNECT_DELAY_SECONDS", &mut self.watch.max_reconnect_delay_seconds)?;
        env_parse("RECONNECT_BACKOFF_MULTIPLIER", &mut self.watch.reconnect_backoff_multiplier)?;
        env_parse("MAX_BLOCKS_PER_POLL", &mut self.watch.max_blocks_per_poll)?;
        if let Ok(url) = env::var("EXPLORER_TX_URL") {
            self.watch.explorer_tx_url = Some(url);
        }

        // Cache configuration
        env_string("CACHE_PATH", &mut self.cache.path);

        // Telegram configuration
        env_string("TELEGRAM_BOT_TOKEN", &mut self.telegram.bot_token);
        env_string("TELEGRAM_CHAT_ID", &mut self.telegram.chat_id);
        env_string("TELEGRAM_API_BASE", &mut self.telegram.api_base);

        // Logging configuration
        env_string("LOG_LEVEL", &mut self.logging.level);
        env_parse("LOG_FILE_ENABLED", &mut self.logging.file_enabled)?;
        env_string("LOG_FILE_PATH", &mut self.logging.file_path);

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Required values, reported by the variable that supplies them
        let required = [
            ("RPC_URL", &self.rpc.endpoint),
            ("TOKEN_ADDRESS", &self.watch.token_address),
            ("SOURCE_ADDRESS", &self.watch.source_address),
            ("TELEGRAM_BOT_TOKEN", &self.telegram.bot_token),
            ("TELEGRAM_CHAT_ID", &self.telegram.chat_id),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingEnvVar(key.to_string()));
            }
        }

        for url in [&self.rpc.endpoint, &self.telegram.api_base] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidUrl(url.clone()));
            }
        }

        if self.rpc.timeout_seconds == 0 || self.rpc.timeout_seconds > 300 {
            return Err(invalid("rpc.timeout_seconds", self.rpc.timeout_seconds));
        }

        for (key, address) in [
            ("watch.token_address", &self.watch.token_address),
            ("watch.source_address", &self.watch.source_address),
            ("watch.dead_address", &self.watch.dead_address),
        ] {
            if validate_address(address).is_err() {
                return Err(invalid(key, address));
            }
        }

        if self.watch.token_decimals > 38 {
            return Err(invalid("watch.token_decimals", self.watch.token_decimals));
        }

        if self.watch.poll_interval_seconds == 0 {
            return Err(invalid("watch.poll_interval_seconds", self.watch.poll_interval_seconds));
        }

        if self.watch.reconnect_delay_seconds == 0 {
            return Err(invalid("watch.reconnect_delay_seconds", self.watch.reconnect_delay_seconds));
        }

        if self.watch.max_reconnect_delay_seconds < self.watch.reconnect_delay_seconds {
            return Err(invalid(
                "watch.max_reconnect_delay_seconds",
                self.watch.max_reconnect_delay_seconds,
            ));
        }

        if !self.watch.reconnect_backoff_multiplier.is_finite()
            || self.watch.reconnect_backoff_multiplier < 1.0
        {
            return Err(invalid(
                "watch.reconnect_backoff_multiplier",
                self.watch.reconnect_backoff_multiplier,
            ));
        }

        if self.cache.path.trim().is_empty() {
            return Err(invalid("cache.path", &self.cache.path));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(invalid("logging.level", &self.logging.level));
        }

        if self.logging.file_enabled && self.logging.file_path.trim().is_empty() {
            return Err(invalid("logging.file_path", &self.logging.file_path));
        }

        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample_config() -> Result<String, ConfigError> {
        let mut config = Self::default();
        config.rpc.endpoint = "https://bsc-dataseed.binance.org/".to_string();
        config.watch.token_address = "0x0000000000000000000000000000000000000000".to_string();
        config.watch.source_address = "0x0000000000000000000000000000000000000000".to_string();
        toml::to_string_pretty(&config).map_err(|e| ConfigError::Parsing(e.to_string()))
    }
}

fn env_string(key: &str, target: &mut String) {
    if let Ok(value) = env::var(key) {
        *target = value;
    }
}

fn env_parse<T: FromStr>(key: &str, target: &mut T) -> Result<(), ConfigError> {
    if let Ok(value) = env::var(key) {
        *target = parse_value(key, value)?;
    }
    Ok(())
}

fn parse_value<T: FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}
