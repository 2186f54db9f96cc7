pub mod message;
pub mod telegram;

use async_trait::async_trait;

use crate::error::DeliveryError;

pub use message::BurnNotification;
pub use telegram::TelegramNotifier;

/// Outbound channel for burn notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `text` to `destination`; fails if the destination is unreachable
    async fn send(&self, destination: &str, text: &str) -> Result<(), DeliveryError>;
}
