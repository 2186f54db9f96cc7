use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Log entry as returned by `eth_getLogs`, with hex quantities already parsed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    pub block_number: u64,
    pub transaction_hash: String,
    pub log_index: u32,
}

/// Decoded ERC-20 `Transfer(address,address,uint256)` event.
///
/// Addresses are `0x`-prefixed lowercase hex; `value` is the full uint256 in
/// token base units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferEvent {
    pub from: String,
    pub to: String,
    pub value: U256,
    pub transaction_hash: String,
    pub block_number: u64,
    pub log_index: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: String,
    pub block_number: u64,
    /// `Some(true)` for success, `None` on pre-Byzantium receipts
    pub status: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockInfo {
    pub number: u64,
    /// Unix seconds
    pub timestamp: u64,
}
