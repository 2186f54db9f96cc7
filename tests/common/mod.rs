#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use primitive_types::U256;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use burn_watch::blockchain::{ChainClient, ChainConnector, TRANSFER_EVENT_SIGNATURE};
use burn_watch::error::{DeliveryError, RpcError};
use burn_watch::models::{BlockInfo, Receipt, TransferEvent};
use burn_watch::notifier::Notifier;

pub const TOKEN: &str = "0x0e09fabb73bd3ade0a17ecc321fd13a19e81ce82";
pub const SOURCE: &str = "0xf977814e90da44bfa03b6295a0616a897441acec";
pub const OTHER: &str = "0x28c6c06298d514db089934071355e5743bf21d60";
pub const DEAD: &str = "0x000000000000000000000000000000000000dead";

pub fn address_topic(address: &str) -> String {
    format!("0x{:0>64}", address.trim_start_matches("0x"))
}

pub fn amount_data(value: u128) -> String {
    format!("0x{:064x}", value)
}

/// `eth_getLogs` entry for a Transfer log
pub fn transfer_log(from: &str, to: &str, value: u128, tx: &str, block: u64, log_index: u32) -> Value {
    json!({
        "address": TOKEN,
        "topics": [TRANSFER_EVENT_SIGNATURE, address_topic(from), address_topic(to)],
        "data": amount_data(value),
        "blockNumber": format!("0x{:x}", block),
        "transactionHash": tx,
        "logIndex": format!("0x{:x}", log_index),
        "blockHash": "0x00",
        "transactionIndex": "0x0",
        "removed": false
    })
}

pub fn rpc_result(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "id": 1, "result": result}))
}

pub fn rpc_error(code: i32, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": {"code": code, "message": message}
    }))
}

pub async fn mock_rpc(server: &MockServer, rpc_method: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": rpc_method})))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Mount a consistent chain view: chain id 56, head at `height`, `logs` for
/// any range, and a receipt plus block for every log's transaction.
pub async fn mount_chain(server: &MockServer, height: u64, logs: &[Value]) {
    server.reset().await;

    mock_rpc(server, "eth_chainId", rpc_result(json!("0x38"))).await;
    mock_rpc(server, "eth_blockNumber", rpc_result(json!(format!("0x{:x}", height)))).await;
    mock_rpc(server, "eth_getLogs", rpc_result(Value::Array(logs.to_vec()))).await;

    for log in logs {
        let tx = log["transactionHash"].clone();
        let block = log["blockNumber"].clone();

        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "eth_getTransactionReceipt", "params": [tx]})))
            .respond_with(rpc_result(json!({
                "transactionHash": tx,
                "blockNumber": block,
                "status": "0x1"
            })))
            .mount(server)
            .await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "eth_getBlockByNumber", "params": [block]})))
            .respond_with(rpc_result(json!({
                "number": block,
                "timestamp": "0x65a8c2f0",
                "hash": "0x00"
            })))
            .mount(server)
            .await;
    }
}

pub fn telegram_ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": {"message_id": 1}}))
}

pub async fn mount_telegram(server: &MockServer, token: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendMessage", token)))
        .respond_with(response)
        .mount(server)
        .await;
}

/// In-memory chain for driving the poll loop without HTTP
#[derive(Default)]
pub struct ChainState {
    pub height: u64,
    pub events: Vec<TransferEvent>,
    pub fail_height: bool,
    pub fail_connect: bool,
    pub connects: u32,
    pub ranges: Vec<(u64, u64)>,
}

#[derive(Clone, Default)]
pub struct FakeChain(pub Arc<Mutex<ChainState>>);

impl FakeChain {
    pub fn at_height(height: u64) -> Self {
        let chain = Self::default();
        chain.0.lock().unwrap().height = height;
        chain
    }

    pub fn set_height(&self, height: u64) {
        self.0.lock().unwrap().height = height;
    }

    pub fn push_event(&self, event: TransferEvent) {
        self.0.lock().unwrap().events.push(event);
    }

    pub fn set_fail_height(&self, fail: bool) {
        self.0.lock().unwrap().fail_height = fail;
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.0.lock().unwrap().fail_connect = fail;
    }

    pub fn connects(&self) -> u32 {
        self.0.lock().unwrap().connects
    }

    pub fn ranges(&self) -> Vec<(u64, u64)> {
        self.0.lock().unwrap().ranges.clone()
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn current_height(&self) -> Result<u64, RpcError> {
        let state = self.0.lock().unwrap();
        if state.fail_height {
            return Err(RpcError::Connection("connection reset by peer".to_string()));
        }
        Ok(state.height)
    }

    async fn fetch_events(
        &self,
        _contract: &str,
        _event_signature: &str,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferEvent>, RpcError> {
        let mut state = self.0.lock().unwrap();
        state.ranges.push((from_block, to_block));
        Ok(state
            .events
            .iter()
            .filter(|e| e.block_number >= from_block && e.block_number <= to_block)
            .cloned()
            .collect())
    }

    async fn fetch_receipt(&self, transaction_hash: &str) -> Result<Receipt, RpcError> {
        let state = self.0.lock().unwrap();
        let event = state
            .events
            .iter()
            .find(|e| e.transaction_hash == transaction_hash)
            .ok_or_else(|| RpcError::ReceiptNotFound(transaction_hash.to_string()))?;
        Ok(Receipt {
            transaction_hash: transaction_hash.to_string(),
            block_number: event.block_number,
            status: Some(true),
        })
    }

    async fn fetch_block(&self, block_number: u64) -> Result<BlockInfo, RpcError> {
        Ok(BlockInfo {
            number: block_number,
            timestamp: 1_705_560_000 + block_number * 3,
        })
    }
}

#[async_trait]
impl ChainConnector for FakeChain {
    type Client = FakeChain;

    async fn connect(&self) -> Result<FakeChain, RpcError> {
        let mut state = self.0.lock().unwrap();
        state.connects += 1;
        if state.fail_connect {
            return Err(RpcError::Connection("connection refused".to_string()));
        }
        drop(state);
        Ok(self.clone())
    }
}

/// Records every message; can be switched to reject sends
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub sent: Arc<Mutex<Vec<(String, String)>>>,
    pub fail: Arc<Mutex<bool>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, text)| text.clone()).collect()
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, destination: &str, text: &str) -> Result<(), DeliveryError> {
        if *self.fail.lock().unwrap() {
            return Err(DeliveryError::Rejected {
                status: 403,
                description: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((destination.to_string(), text.to_string()));
        Ok(())
    }
}

pub fn transfer(from: &str, to: &str, tx: &str, block: u64) -> TransferEvent {
    TransferEvent {
        from: from.to_string(),
        to: to.to_string(),
        value: U256::from(1_000u32) * U256::exp10(18),
        transaction_hash: tx.to_string(),
        block_number: block,
        log_index: 0,
    }
}
