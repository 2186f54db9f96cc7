use chrono::{TimeZone, Utc};

use crate::models::{format_token_amount, BlockInfo, Receipt, TransferEvent};

/// Everything needed to render one burn notification
#[derive(Debug, Clone)]
pub struct BurnNotification<'a> {
    pub event: &'a TransferEvent,
    pub receipt: &'a Receipt,
    pub block: &'a BlockInfo,
    pub token_symbol: &'a str,
    pub token_decimals: u8,
    pub explorer_tx_url: Option<&'a str>,
}

impl BurnNotification<'_> {
    pub fn formatted_amount(&self) -> String {
        format_token_amount(self.event.value, self.token_decimals)
    }

    /// UTC time of the including block
    pub fn formatted_time(&self) -> String {
        i64::try_from(self.block.timestamp)
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .map(|time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| format!("unix {}", self.block.timestamp))
    }

    /// HTML message body for the Telegram Bot API
    pub fn render(&self) -> String {
        let mut text = format!(
            "🔥 <b>{symbol} Burn Detected</b>\n\n\
            <b>Amount:</b> {amount} {symbol}\n\
            <b>From:</b> <code>{from}</code>\n\
            <b>To:</b> <code>{to}</code>\n\
            <b>Block:</b> {block}\n\
            <b>Time:</b> {time}\n\
            <b>Tx:</b> <code>{tx}</code>",
            symbol = escape_html(self.token_symbol),
            amount = self.formatted_amount(),
            from = self.event.from,
            to = self.event.to,
            block = self.receipt.block_number,
            time = self.formatted_time(),
            tx = self.event.transaction_hash,
        );

        if let Some(base) = self.explorer_tx_url {
            text.push_str(&format!(
                "\n\n<a href=\"{}{}\">View on explorer</a>",
                base, self.event.transaction_hash
            ));
        }

        text
    }
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
