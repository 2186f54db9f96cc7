pub mod amount;
pub mod transfer;

pub use amount::format_token_amount;
pub use transfer::{BlockInfo, RawLog, Receipt, TransferEvent};
