pub mod burn_watcher;
pub mod client;
pub mod rpc_client;
pub mod transfer_detector;

pub use burn_watcher::{BurnWatcher, BurnWatcherConfig, CycleOutcome, CycleReport, WatcherState};
pub use client::{ChainClient, ChainConnector, RpcConnector};
pub use rpc_client::{LogFilter, RpcClient};
pub use transfer_detector::{
    decode_transfer_log, normalize_address, validate_address, BurnFilter, TransferDetectionError,
    DEAD_ADDRESS, TRANSFER_EVENT_SIGNATURE,
};
