use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::config::TelegramConfig;
use crate::error::DeliveryError;
use crate::logging::LogContext;
use crate::notifier::Notifier;

const SEND_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}

/// Sends messages through `sendMessage`
pub struct TelegramNotifier {
    client: Client,
    send_url: String,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("send_url", &"<redacted>")
            .finish()
    }
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(SEND_TIMEOUT_SECS))
            .build()?;

        let send_url = format!(
            "{}/bot{}/sendMessage",
            config.api_base.trim_end_matches('/'),
            config.bot_token
        );

        Ok(Self { client, send_url })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, destination: &str, text: &str) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.send_url)
            .json(&json!({
                "chat_id": destination,
                "text": text,
                "parse_mode": "HTML",
                "disable_web_page_preview": true,
            }))
            .send()
            .await
            // reqwest errors carry the URL, which contains the bot token
            .map_err(|e| DeliveryError::Http(e.without_url()))?;

        let status = response.status();
        let body: Option<TelegramResponse> = response.json().await.ok();

        match body {
            Some(body) if status.is_success() && body.ok => {
                LogContext::new("telegram", "send")
                    .with_metadata("chat_id", json!(destination))
                    .debug("Message delivered");
                Ok(())
            }
            Some(body) => Err(DeliveryError::Rejected {
                status: status.as_u16(),
                description: body.description.unwrap_or_else(|| "no description".to_string()),
            }),
            None => Err(DeliveryError::Rejected {
                status: status.as_u16(),
                description: status.canonical_reason().unwrap_or("unreadable response").to_string(),
            }),
        }
    }
}
