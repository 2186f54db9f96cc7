use thiserror::Error;

/// Main error type for the burn watcher
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),
}

/// RPC-related errors
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RPC method error: code={code}, message={message}")]
    Method { code: i32, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Block not found: {block_number}")]
    BlockNotFound { block_number: u64 },

    #[error("Receipt not found for transaction {0}")]
    ReceiptNotFound(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Chain id mismatch: expected={expected}, got={got}")]
    ChainIdMismatch { expected: u64, got: u64 },
}

/// Dedup cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache file {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("Cache file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Configuration parsing failed: {0}")]
    Parsing(String),

    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
}

/// Notification delivery errors
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Destination rejected message: status={status}, description={description}")]
    Rejected { status: u16, description: String },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, WatchError>;

/// Error severity levels for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Stops the process at startup
    Critical,
    /// Loses a notification or cache write
    High,
    /// Transient, handled by reconnecting
    Medium,
    Low,
}

impl WatchError {
    /// Get the severity level of an error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            WatchError::Config(_) => ErrorSeverity::Critical,
            WatchError::Cache(CacheError::Corrupt { .. }) => ErrorSeverity::Critical,
            WatchError::Rpc(RpcError::ChainIdMismatch { .. }) => ErrorSeverity::High,
            WatchError::Cache(CacheError::Io(_)) => ErrorSeverity::High,
            WatchError::Delivery(_) => ErrorSeverity::High,
            WatchError::Rpc(RpcError::BlockNotFound { .. }) => ErrorSeverity::Low,
            WatchError::Rpc(RpcError::ReceiptNotFound(_)) => ErrorSeverity::Low,
            WatchError::Rpc(_) => ErrorSeverity::Medium,
        }
    }

    /// Whether the poll loop keeps going after this error.
    pub fn is_recoverable(&self) -> bool {
        match self {
            WatchError::Rpc(_) => true,
            WatchError::Delivery(_) => true,
            WatchError::Cache(CacheError::Io(_)) => true,
            WatchError::Cache(CacheError::Corrupt { .. }) => false,
            WatchError::Config(_) => false,
        }
    }
}

impl RpcError {
    /// Classify a transport failure the way the poll loop reports it
    pub fn from_transport(err: reqwest::Error, timeout_seconds: u64) -> Self {
        if err.is_timeout() {
            RpcError::Timeout { seconds: timeout_seconds }
        } else if err.is_connect() {
            RpcError::Connection(err.to_string())
        } else {
            RpcError::Http(err)
        }
    }
}
