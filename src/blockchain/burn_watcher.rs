use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::blockchain::client::{ChainClient, ChainConnector};
use crate::blockchain::transfer_detector::{BurnFilter, TRANSFER_EVENT_SIGNATURE};
use crate::cache::DedupCache;
use crate::config::AppConfig;
use crate::error::{RpcError, WatchError};
use crate::logging::{ErrorLogger, LogContext, MetricsLogger, PerformanceMonitor};
use crate::models::format_token_amount;
use crate::notifier::{BurnNotification, Notifier};
use crate::retry::{retry_until_success, ReconnectPolicy};

#[derive(Debug, Clone)]
pub struct BurnWatcherConfig {
    pub token_address: String,
    pub source_address: String,
    pub dead_address: String,
    /// Chat the notifications go to
    pub destination: String,
    pub token_symbol: String,
    pub token_decimals: u8,
    pub poll_interval: Duration,
    pub reconnect: ReconnectPolicy,
    /// 0 scans up to the chain head every cycle
    pub max_blocks_per_poll: u64,
    pub explorer_tx_url: Option<String>,
}

impl BurnWatcherConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            token_address: config.watch.token_address.clone(),
            source_address: config.watch.source_address.clone(),
            dead_address: config.watch.dead_address.clone(),
            destination: config.telegram.chat_id.clone(),
            token_symbol: config.watch.token_symbol.clone(),
            token_decimals: config.watch.token_decimals,
            poll_interval: config.watch.poll_interval(),
            reconnect: config.watch.reconnect_policy(),
            max_blocks_per_poll: config.watch.max_blocks_per_poll,
            explorer_tx_url: config.watch.explorer_tx_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// No client handle; the next tick reconnects
    Uninitialized,
    Connected,
}

/// Result of one successful poll cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Checkpoint was unset and has been set to `height` without scanning
    Armed { height: u64 },
    /// Chain head has not moved past the checkpoint
    UpToDate { height: u64 },
    Scanned(CycleReport),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub from_block: u64,
    pub to_block: u64,
    /// Transfer events returned for the range
    pub events: usize,
    /// Events passing the source/dead address filter
    pub matched: usize,
    pub notified: usize,
    pub already_seen: usize,
    pub failed_deliveries: usize,
}

/// Polls for burns from one address and notifies each new one once.
pub struct BurnWatcher<C: ChainConnector, N: Notifier> {
    connector: C,
    notifier: N,
    cache: DedupCache,
    filter: BurnFilter,
    config: BurnWatcherConfig,
    client: Option<C::Client>,
    checkpoint: Option<u64>,
}

impl<C: ChainConnector, N: Notifier> BurnWatcher<C, N> {
    pub fn new(connector: C, notifier: N, cache: DedupCache, config: BurnWatcherConfig) -> Self {
        let filter = BurnFilter::new(&config.source_address, &config.dead_address);
        Self {
            connector,
            notifier,
            cache,
            filter,
            config,
            client: None,
            checkpoint: None,
        }
    }

    pub fn state(&self) -> WatcherState {
        if self.client.is_some() {
            WatcherState::Connected
        } else {
            WatcherState::Uninitialized
        }
    }

    /// Last fully scanned block, `None` until the first successful poll
    pub fn checkpoint(&self) -> Option<u64> {
        self.checkpoint
    }

    pub fn cache(&self) -> &DedupCache {
        &self.cache
    }

    pub fn config(&self) -> &BurnWatcherConfig {
        &self.config
    }

    /// Replace the client handle with a freshly verified one
    pub async fn connect(&mut self) -> Result<(), RpcError> {
        self.client = None;
        let client = self.connector.connect().await?;
        self.client = Some(client);
        Ok(())
    }

    /// Run until `shutdown` turns true: connect (retrying without limit),
    /// poll once, then poll on every interval tick. Flushes the cache on exit.
    pub async fn start(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), WatchError> {
        info!(
            "Starting burn watcher: token={} source={} interval={}s",
            self.config.token_address,
            self.config.source_address,
            self.config.poll_interval.as_secs()
        );

        let connector = &self.connector;
        let client = retry_until_success("connect", &self.config.reconnect, &mut shutdown, || {
            connector.connect()
        })
        .await;

        match client {
            Some(client) => self.client = Some(client),
            None => return self.shutdown(),
        }

        self.tick().await;

        let period = self.config.poll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.shutdown()
    }

    /// One timer tick: reconnect if needed, then run a cycle. Errors drop the
    /// client handle and leave the checkpoint as it was.
    pub async fn tick(&mut self) -> Option<CycleOutcome> {
        if self.client.is_none() {
            if let Err(e) = self.connect().await {
                ErrorLogger::log_error(
                    &WatchError::from(e),
                    Some(LogContext::new("burn_watcher", "reconnect")),
                );
                return None;
            }
        }

        match self.poll_cycle().await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                self.client = None;
                let mut context = LogContext::new("burn_watcher", "poll_cycle");
                if let Some(checkpoint) = self.checkpoint {
                    context = context.with_metadata("checkpoint", serde_json::json!(checkpoint));
                }
                ErrorLogger::log_error(&e, Some(context));
                warn!("Dropped RPC connection, reconnecting on next tick");
                None
            }
        }
    }

    /// Scan blocks past the checkpoint and notify new burns.
    pub async fn poll_cycle(&mut self) -> Result<CycleOutcome, WatchError> {
        let monitor = PerformanceMonitor::new("poll_cycle");
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| RpcError::Connection("no active RPC connection".to_string()))?;

        let height = client.current_height().await?;

        let checkpoint = match self.checkpoint {
            Some(checkpoint) => checkpoint,
            None => {
                self.checkpoint = Some(height);
                LogContext::new("burn_watcher", "arm")
                    .with_block_number(height)
                    .info(&format!("Watching for burns after block {}", height));
                return Ok(CycleOutcome::Armed { height });
            }
        };

        if height <= checkpoint {
            debug!("No new blocks (head {}, checkpoint {})", height, checkpoint);
            return Ok(CycleOutcome::UpToDate { height });
        }

        let from_block = checkpoint + 1;
        let to_block = if self.config.max_blocks_per_poll > 0 {
            height.min(checkpoint.saturating_add(self.config.max_blocks_per_poll))
        } else {
            height
        };

        let events = client
            .fetch_events(&self.config.token_address, TRANSFER_EVENT_SIGNATURE, from_block, to_block)
            .await?;

        let mut report = CycleReport {
            from_block,
            to_block,
            events: events.len(),
            ..CycleReport::default()
        };

        for event in events.iter().filter(|event| self.filter.matches(event)) {
            report.matched += 1;

            if self.cache.contains(&event.transaction_hash) {
                report.already_seen += 1;
                LogContext::new("burn_watcher", "dedup")
                    .with_transaction_hash(&event.transaction_hash)
                    .debug("Burn already notified, skipping");
                continue;
            }

            let receipt = client.fetch_receipt(&event.transaction_hash).await?;
            let block = client.fetch_block(receipt.block_number).await?;

            let text = BurnNotification {
                event,
                receipt: &receipt,
                block: &block,
                token_symbol: &self.config.token_symbol,
                token_decimals: self.config.token_decimals,
                explorer_tx_url: self.config.explorer_tx_url.as_deref(),
            }
            .render();

            let context = LogContext::new("burn_watcher", "notify")
                .with_transaction_hash(&event.transaction_hash)
                .with_block_number(receipt.block_number)
                .with_amount(&format_token_amount(event.value, self.config.token_decimals));

            match self.notifier.send(&self.config.destination, &text).await {
                Ok(()) => {
                    report.notified += 1;
                    context.info("Burn notification sent");
                    if let Err(e) = self.cache.add(&event.transaction_hash) {
                        let cache_context = LogContext::new("burn_watcher", "cache_add")
                            .with_transaction_hash(&event.transaction_hash);
                        ErrorLogger::log_error(&WatchError::from(e), Some(cache_context));
                    }
                }
                Err(e) => {
                    report.failed_deliveries += 1;
                    context.warn(&format!("Notification failed, burn will not be retried: {}", e));
                }
            }
        }

        self.checkpoint = Some(to_block);
        MetricsLogger::log_cycle(from_block, to_block, report.matched, report.notified, monitor.elapsed_ms());

        Ok(CycleOutcome::Scanned(report))
    }

    fn shutdown(&mut self) -> Result<(), WatchError> {
        info!("Shutting down, flushing {} cached transactions", self.cache.len());
        self.cache.flush()?;
        Ok(())
    }
}
