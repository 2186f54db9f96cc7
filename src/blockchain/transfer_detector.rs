use primitive_types::U256;
use thiserror::Error;

use crate::models::{RawLog, TransferEvent};

#[derive(Error, Debug)]
pub enum TransferDetectionError {
    #[error("Invalid log format: {0}")]
    InvalidLog(String),
    #[error("Invalid address format: {0}")]
    InvalidAddress(String),
    #[error("Invalid amount format: {0}")]
    InvalidAmount(String),
}

/// ERC-20 Transfer event signature: Transfer(address indexed from, address indexed to, uint256 value)
pub const TRANSFER_EVENT_SIGNATURE: &str = "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

/// Conventional unspendable address used for burns
pub const DEAD_ADDRESS: &str = "0x000000000000000000000000000000000000dEaD";

/// Matches transfers from one source address to the burn address.
#[derive(Debug, Clone)]
pub struct BurnFilter {
    source_address: String,
    dead_address: String,
}

impl BurnFilter {
    pub fn new(source_address: &str, dead_address: &str) -> Self {
        Self {
            source_address: normalize_address(source_address),
            dead_address: normalize_address(dead_address),
        }
    }

    /// Case-insensitive match on both ends of the transfer
    pub fn matches(&self, event: &TransferEvent) -> bool {
        normalize_address(&event.from) == self.source_address
            && normalize_address(&event.to) == self.dead_address
    }
}

/// Decode an ERC-20 Transfer log into a `TransferEvent`
pub fn decode_transfer_log(log: &RawLog) -> Result<TransferEvent, TransferDetectionError> {
    // [signature, from, to]
    if log.topics.len() != 3 {
        return Err(TransferDetectionError::InvalidLog(
            format!("Expected 3 topics, got {}", log.topics.len())
        ));
    }

    if normalize_address(&log.topics[0]) != normalize_address(TRANSFER_EVENT_SIGNATURE) {
        return Err(TransferDetectionError::InvalidLog(
            format!("Unexpected event signature {}", log.topics[0])
        ));
    }

    let from = extract_address_from_topic(&log.topics[1])?;
    let to = extract_address_from_topic(&log.topics[2])?;
    let value = extract_amount_from_data(&log.data)?;

    Ok(TransferEvent {
        from: format!("0x{}", from),
        to: format!("0x{}", to),
        value,
        transaction_hash: log.transaction_hash.to_lowercase(),
        block_number: log.block_number,
        log_index: log.log_index,
    })
}

/// Normalize an Ethereum address to lowercase without 0x prefix
pub fn normalize_address(address: &str) -> String {
    let addr = address.trim();
    if addr.starts_with("0x") || addr.starts_with("0X") {
        addr[2..].to_lowercase()
    } else {
        addr.to_lowercase()
    }
}

/// Validate that an address is a valid Ethereum address format
pub fn validate_address(address: &str) -> Result<(), TransferDetectionError> {
    let normalized = normalize_address(address);

    if normalized.len() != 40 {
        return Err(TransferDetectionError::InvalidAddress(
            format!("Address must be 40 characters long, got {}", normalized.len())
        ));
    }

    if !normalized.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(TransferDetectionError::InvalidAddress(
            "Address contains non-hexadecimal characters".to_string()
        ));
    }

    Ok(())
}

/// Hex digits of a 32-byte word, without the `0x` prefix
fn hex_word<'a>(word: &'a str, what: &str) -> Result<&'a str, String> {
    let digits = word.trim();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);

    // Checked before any slicing so multi-byte input cannot split a char
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(format!("{} contains non-hexadecimal characters", what));
    }
    if digits.len() != 64 {
        return Err(format!("{} should be 64 characters, got {}", what, digits.len()));
    }
    Ok(digits)
}

/// Extract the address held in the low 20 bytes of a topic word
fn extract_address_from_topic(topic: &str) -> Result<String, TransferDetectionError> {
    let word = hex_word(topic, "Topic").map_err(TransferDetectionError::InvalidLog)?;

    // Address is in the last 40 characters (20 bytes)
    Ok(word[24..].to_lowercase())
}

/// Extract amount from the data field (32-byte big-endian uint256)
fn extract_amount_from_data(data: &str) -> Result<U256, TransferDetectionError> {
    let word = hex_word(data, "Data").map_err(TransferDetectionError::InvalidAmount)?;

    U256::from_str_radix(word, 16).map_err(|e| {
        TransferDetectionError::InvalidAmount(format!("Failed to parse amount: {:?}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "0xF977814e90dA44bFA03b6295A0616a897441aceC";

    fn transfer(from: &str, to: &str) -> TransferEvent {
        TransferEvent {
            from: from.to_string(),
            to: to.to_string(),
            value: U256::one(),
            transaction_hash: "0xabc".to_string(),
            block_number: 1,
            log_index: 0,
        }
    }

    fn raw_transfer_log(from_topic: &str, to_topic: &str, data: &str) -> RawLog {
        RawLog {
            address: "0x1234567890123456789012345678901234567890".to_string(),
            topics: vec![
                TRANSFER_EVENT_SIGNATURE.to_string(),
                from_topic.to_string(),
                to_topic.to_string(),
            ],
            data: data.to_string(),
            block_number: 12345,
            transaction_hash: "0xABC123DEF456".to_string(),
            log_index: 2,
        }
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address("0xF977814e90dA44bFA03b6295A0616a897441aceC"),
                   "f977814e90da44bfa03b6295a0616a897441acec");
        assert_eq!(normalize_address("F977814e90dA44bFA03b6295A0616a897441aceC"),
                   "f977814e90da44bfa03b6295a0616a897441acec");
        assert_eq!(normalize_address(" 0X000000000000000000000000000000000000DEAD "),
                   "000000000000000000000000000000000000dead");
    }

    #[test]
    fn test_validate_address() {
        assert!(validate_address("0xf977814e90da44bfa03b6295a0616a897441acec").is_ok());
        assert!(validate_address(DEAD_ADDRESS).is_ok());

        assert!(validate_address("0xf977814e90da44bfa03b6295a0616a897441ace").is_err()); // Too short
        assert!(validate_address("0xf977814e90da44bfa03b6295a0616a897441acecc").is_err()); // Too long
        assert!(validate_address("0xg977814e90da44bfa03b6295a0616a897441acec").is_err()); // Invalid hex
    }

    #[test]
    fn test_burn_filter_matches_ignoring_case() {
        let filter = BurnFilter::new(SOURCE, DEAD_ADDRESS);

        assert!(filter.matches(&transfer(
            "0xf977814e90da44bfa03b6295a0616a897441acec",
            "0x000000000000000000000000000000000000dead",
        )));
        assert!(filter.matches(&transfer(
            "0xF977814E90DA44BFA03B6295A0616A897441ACEC",
            "0x000000000000000000000000000000000000DEAD",
        )));
    }

    #[test]
    fn test_burn_filter_rejects_other_pairs() {
        let filter = BurnFilter::new(SOURCE, DEAD_ADDRESS);
        let other = "0x1234567890123456789012345678901234567890";

        assert!(!filter.matches(&transfer(other, DEAD_ADDRESS)));
        assert!(!filter.matches(&transfer(SOURCE, other)));
        // Reversed direction
        assert!(!filter.matches(&transfer(DEAD_ADDRESS, SOURCE)));
        // Differs in the last nibble only
        assert!(!filter.matches(&transfer(SOURCE, "0x000000000000000000000000000000000000deae")));
    }

    #[test]
    fn test_decode_transfer_log() {
        let log = raw_transfer_log(
            "0x000000000000000000000000f977814e90da44bfa03b6295a0616a897441acec",
            "0x000000000000000000000000000000000000000000000000000000000000dead",
            "0x0000000000000000000000000000000000000000000000000de0b6b3a7640000",
        );

        let event = decode_transfer_log(&log).unwrap();

        assert_eq!(event.from, "0xf977814e90da44bfa03b6295a0616a897441acec");
        assert_eq!(event.to, "0x000000000000000000000000000000000000dead");
        assert_eq!(event.value, U256::exp10(18));
        assert_eq!(event.transaction_hash, "0xabc123def456");
        assert_eq!(event.block_number, 12345);
        assert_eq!(event.log_index, 2);
    }

    #[test]
    fn test_decode_rejects_wrong_topic_count() {
        let mut log = raw_transfer_log(
            "0x000000000000000000000000f977814e90da44bfa03b6295a0616a897441acec",
            "0x000000000000000000000000000000000000000000000000000000000000dead",
            "0x0000000000000000000000000000000000000000000000000de0b6b3a7640000",
        );
        log.topics.truncate(1);

        assert!(matches!(decode_transfer_log(&log), Err(TransferDetectionError::InvalidLog(_))));
    }

    #[test]
    fn test_decode_rejects_other_event() {
        let mut log = raw_transfer_log(
            "0x000000000000000000000000f977814e90da44bfa03b6295a0616a897441acec",
            "0x000000000000000000000000000000000000000000000000000000000000dead",
            "0x0000000000000000000000000000000000000000000000000de0b6b3a7640000",
        );
        // Approval(address,address,uint256)
        log.topics[0] = "0x8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b925".to_string();

        assert!(decode_transfer_log(&log).is_err());
    }

    #[test]
    fn test_decode_accepts_full_width_amount() {
        let log = raw_transfer_log(
            "0x0000000000000000000000001234567890123456789012345678901234567890",
            "0x0000000000000000000000001234567890123456789012345678901234567891",
            "0x0000000000000000000000000000000100000000000000000000000000000000",
        );

        let event = decode_transfer_log(&log).unwrap();
        assert_eq!(event.value, U256::from(u128::MAX) + U256::one());

        let max = raw_transfer_log(
            "0x0000000000000000000000001234567890123456789012345678901234567890",
            "0x0000000000000000000000001234567890123456789012345678901234567891",
            "0xffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
        );
        assert_eq!(decode_transfer_log(&max).unwrap().value, U256::MAX);
    }

    #[test]
    fn test_decode_rejects_non_ascii_words() {
        // 64 bytes long, but 'é' is two bytes straddling the address boundary
        let topic = format!("0x{}é{}", "a".repeat(23), "a".repeat(39));
        assert_eq!(topic.len(), 66);
        let log = raw_transfer_log(
            &topic,
            "0x000000000000000000000000000000000000000000000000000000000000dead",
            "0x0000000000000000000000000000000000000000000000000de0b6b3a7640000",
        );
        assert!(matches!(decode_transfer_log(&log), Err(TransferDetectionError::InvalidLog(_))));

        let data = format!("0x{}é{}", "0".repeat(31), "0".repeat(31));
        let log = raw_transfer_log(
            "0x000000000000000000000000f977814e90da44bfa03b6295a0616a897441acec",
            "0x000000000000000000000000000000000000000000000000000000000000dead",
            &data,
        );
        assert!(matches!(decode_transfer_log(&log), Err(TransferDetectionError::InvalidAmount(_))));
    }

    #[test]
    fn test_extract_amount_from_data() {
        let data = "0x000000000000000000000000000000000000000000000000016345785d8a0000";
        assert_eq!(extract_amount_from_data(data).unwrap(), U256::from(100_000_000_000_000_000u64));

        let zero = "0x0000000000000000000000000000000000000000000000000000000000000000";
        assert!(extract_amount_from_data(zero).unwrap().is_zero());

        assert!(extract_amount_from_data("0x1234").is_err());
    }
}
