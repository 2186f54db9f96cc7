use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::blockchain::transfer_detector::decode_transfer_log;
use crate::error::RpcError;
use crate::logging::{LogContext, MetricsLogger, PerformanceMonitor};
use crate::models::{BlockInfo, RawLog, Receipt, TransferEvent};

#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Vec<Value>,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Debug, Deserialize)]
struct EthBlockHeader {
    number: String,
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct EthReceipt {
    #[serde(rename = "transactionHash")]
    transaction_hash: String,
    #[serde(rename = "blockNumber")]
    block_number: String,
    status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogFilter {
    #[serde(rename = "fromBlock")]
    pub from_block: String,
    #[serde(rename = "toBlock")]
    pub to_block: String,
    pub address: Option<String>,
    pub topics: Option<Vec<Option<String>>>,
}

impl LogFilter {
    /// Filter for one event signature on one contract over an inclusive range
    pub fn for_event(contract: &str, event_signature: &str, from_block: u64, to_block: u64) -> Self {
        Self {
            from_block: format!("0x{:x}", from_block),
            to_block: format!("0x{:x}", to_block),
            address: Some(contract.to_string()),
            topics: Some(vec![Some(event_signature.to_string())]),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EthLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
    #[serde(rename = "logIndex")]
    pub log_index: String,
}

/// JSON-RPC client for an EVM node. Performs no retries of its own.
#[derive(Debug)]
pub struct RpcClient {
    client: Client,
    endpoint: String,
    timeout_seconds: u64,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(endpoint: String, timeout_seconds: u64) -> Result<Self, RpcError> {
        let context = LogContext::new("rpc_client", "initialization")
            .with_metadata("endpoint", serde_json::json!(endpoint))
            .with_metadata("timeout_seconds", serde_json::json!(timeout_seconds));
        context.debug("Initializing RPC client");

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            timeout_seconds,
            next_id: AtomicU64::new(1),
        })
    }

    /// Build a client and verify the node answers before handing it out.
    pub async fn connect(
        endpoint: String,
        timeout_seconds: u64,
        expected_chain_id: Option<u64>,
    ) -> Result<Self, RpcError> {
        let client = Self::new(endpoint, timeout_seconds)?;
        let chain_id = client.chain_id().await?;

        if let Some(expected) = expected_chain_id {
            if expected != chain_id {
                return Err(RpcError::ChainIdMismatch { expected, got: chain_id });
            }
        }

        LogContext::new("rpc_client", "connect")
            .with_metadata("chain_id", serde_json::json!(chain_id))
            .info(&format!("Connected to RPC endpoint, chain id {}", chain_id));

        Ok(client)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn make_request(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        let monitor = PerformanceMonitor::new(method);
        let result = self.send_request(&request).await;
        let duration = monitor.finish_with_result(&result);
        MetricsLogger::log_rpc_call(method, duration, result.is_ok());

        result
    }

    async fn send_request(&self, request: &JsonRpcRequest) -> Result<Value, RpcError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| RpcError::from_transport(e, self.timeout_seconds))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Connection(format!(
                "HTTP error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RpcError::from_transport(e, self.timeout_seconds))?;
        let rpc_response: JsonRpcResponse = serde_json::from_str(&body)?;

        if let Some(error) = rpc_response.error {
            return Err(RpcError::Method {
                code: error.code,
                message: error.message,
            });
        }

        // `null` is a legitimate result for unknown blocks and receipts
        Ok(rpc_response.result.unwrap_or(Value::Null))
    }

    pub async fn chain_id(&self) -> Result<u64, RpcError> {
        let result = self.make_request("eth_chainId", vec![]).await?;
        parse_hex_value(&result)
    }

    pub async fn get_latest_block_number(&self) -> Result<u64, RpcError> {
        let result = self.make_request("eth_blockNumber", vec![]).await?;
        parse_hex_value(&result)
    }

    pub async fn get_block(&self, block_number: u64) -> Result<BlockInfo, RpcError> {
        let params = vec![
            Value::String(format!("0x{:x}", block_number)),
            Value::Bool(false), // transaction hashes only
        ];

        let result = self.make_request("eth_getBlockByNumber", params).await?;
        if result.is_null() {
            return Err(RpcError::BlockNotFound { block_number });
        }

        let header: EthBlockHeader = serde_json::from_value(result)?;
        Ok(BlockInfo {
            number: parse_hex_to_u64(&header.number)?,
            timestamp: parse_hex_to_u64(&header.timestamp)?,
        })
    }

    pub async fn get_transaction_receipt(&self, transaction_hash: &str) -> Result<Receipt, RpcError> {
        let params = vec![Value::String(transaction_hash.to_string())];

        let result = self.make_request("eth_getTransactionReceipt", params).await?;
        if result.is_null() {
            return Err(RpcError::ReceiptNotFound(transaction_hash.to_string()));
        }

        let receipt: EthReceipt = serde_json::from_value(result)?;
        let status = match receipt.status.as_deref() {
            Some(raw) => Some(parse_hex_to_u64(raw)? == 1),
            None => None,
        };

        Ok(Receipt {
            transaction_hash: receipt.transaction_hash.to_lowercase(),
            block_number: parse_hex_to_u64(&receipt.block_number)?,
            status,
        })
    }

    pub async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, RpcError> {
        let params = vec![serde_json::to_value(filter)?];
        let result = self.make_request("eth_getLogs", params).await?;

        let eth_logs: Vec<EthLog> = serde_json::from_value(result)?;

        let mut raw_logs = Vec::with_capacity(eth_logs.len());
        for eth_log in eth_logs {
            raw_logs.push(RawLog {
                address: eth_log.address,
                topics: eth_log.topics,
                data: eth_log.data,
                block_number: parse_hex_to_u64(&eth_log.block_number)?,
                transaction_hash: eth_log.transaction_hash,
                log_index: parse_hex_to_u32(&eth_log.log_index)?,
            });
        }

        LogContext::new("rpc_client", "get_logs")
            .with_metadata("log_count", serde_json::json!(raw_logs.len()))
            .with_metadata("from_block", serde_json::json!(filter.from_block))
            .with_metadata("to_block", serde_json::json!(filter.to_block))
            .debug(&format!("Retrieved {} logs", raw_logs.len()));

        Ok(raw_logs)
    }

    /// Fetch and decode Transfer events over an inclusive block range
    pub async fn get_transfer_events(
        &self,
        contract: &str,
        event_signature: &str,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferEvent>, RpcError> {
        if from_block > to_block {
            return Ok(Vec::new());
        }

        let filter = LogFilter::for_event(contract, event_signature, from_block, to_block);
        let raw_logs = self.get_logs(&filter).await?;

        raw_logs
            .iter()
            .map(|log| {
                decode_transfer_log(log).map_err(|e| {
                    RpcError::InvalidResponse(format!(
                        "Undecodable log {}#{}: {}",
                        log.transaction_hash, log.log_index, e
                    ))
                })
            })
            .collect()
    }
}

fn parse_hex_value(value: &Value) -> Result<u64, RpcError> {
    let hex_string = value
        .as_str()
        .ok_or_else(|| RpcError::InvalidResponse(format!("Expected hex string, got {}", value)))?;
    parse_hex_to_u64(hex_string)
}

fn parse_hex_to_u64(hex_str: &str) -> Result<u64, RpcError> {
    let hex_without_prefix = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    u64::from_str_radix(hex_without_prefix, 16)
        .map_err(|e| RpcError::InvalidResponse(format!("Failed to parse hex '{}' to u64: {}", hex_str, e)))
}

fn parse_hex_to_u32(hex_str: &str) -> Result<u32, RpcError> {
    let hex_without_prefix = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    u32::from_str_radix(hex_without_prefix, 16)
        .map_err(|e| RpcError::InvalidResponse(format!("Failed to parse hex '{}' to u32: {}", hex_str, e)))
}
