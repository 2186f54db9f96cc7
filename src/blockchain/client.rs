use async_trait::async_trait;

use crate::blockchain::rpc_client::RpcClient;
use crate::error::RpcError;
use crate::models::{BlockInfo, Receipt, TransferEvent};

/// Read access to the chain, as used by the poll loop.
///
/// Implementations must not retry internally; failures are surfaced so the
/// loop can drop the handle and reconnect on its next tick.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn current_height(&self) -> Result<u64, RpcError>;

    /// Transfer events for `event_signature` emitted by `contract` in
    /// `from_block..=to_block`, in block order. An inverted range is empty.
    async fn fetch_events(
        &self,
        contract: &str,
        event_signature: &str,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferEvent>, RpcError>;

    async fn fetch_receipt(&self, transaction_hash: &str) -> Result<Receipt, RpcError>;

    async fn fetch_block(&self, block_number: u64) -> Result<BlockInfo, RpcError>;
}

/// Produces verified `ChainClient` handles
#[async_trait]
pub trait ChainConnector: Send + Sync {
    type Client: ChainClient;

    /// Establish a connection and check liveness before returning it
    async fn connect(&self) -> Result<Self::Client, RpcError>;
}

#[async_trait]
impl ChainClient for RpcClient {
    async fn current_height(&self) -> Result<u64, RpcError> {
        self.get_latest_block_number().await
    }

    async fn fetch_events(
        &self,
        contract: &str,
        event_signature: &str,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferEvent>, RpcError> {
        self.get_transfer_events(contract, event_signature, from_block, to_block).await
    }

    async fn fetch_receipt(&self, transaction_hash: &str) -> Result<Receipt, RpcError> {
        self.get_transaction_receipt(transaction_hash).await
    }

    async fn fetch_block(&self, block_number: u64) -> Result<BlockInfo, RpcError> {
        self.get_block(block_number).await
    }
}

/// Connects `RpcClient`s to a fixed HTTP endpoint
#[derive(Debug, Clone)]
pub struct RpcConnector {
    endpoint: String,
    timeout_seconds: u64,
    expected_chain_id: Option<u64>,
}

impl RpcConnector {
    pub fn new(endpoint: String, timeout_seconds: u64, expected_chain_id: Option<u64>) -> Self {
        Self {
            endpoint,
            timeout_seconds,
            expected_chain_id,
        }
    }

    pub fn from_config(config: &crate::config::RpcConfig) -> Self {
        Self::new(config.endpoint.clone(), config.timeout_seconds, config.expected_chain_id)
    }
}

#[async_trait]
impl ChainConnector for RpcConnector {
    type Client = RpcClient;

    async fn connect(&self) -> Result<RpcClient, RpcError> {
        RpcClient::connect(self.endpoint.clone(), self.timeout_seconds, self.expected_chain_id).await
    }
}
