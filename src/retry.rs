use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;

use crate::logging::{ErrorLogger, LogContext};

/// Delay schedule for reconnect attempts.
///
/// Attempts are unbounded; the policy only decides how long to wait between
/// them. A multiplier of 1.0 gives a fixed delay.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Delay after the first failed attempt, in seconds
    pub initial_delay_seconds: u64,
    /// Ceiling for the growing delay, in seconds
    pub max_delay_seconds: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Add ±5% jitter to each delay
    pub jitter: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay_seconds: 30,
            max_delay_seconds: 300,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }
}

impl ReconnectPolicy {
    /// Calculate delay after the given failed attempt (1-based)
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_delay = self.initial_delay_seconds as f64;
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let exponential_delay = base_delay * self.backoff_multiplier.powi(exponent);

        // Cap at max delay
        let capped_delay = exponential_delay.min(self.max_delay_seconds.max(self.initial_delay_seconds) as f64);

        let final_delay = if self.jitter {
            let jitter_factor = 0.1;
            let jitter = capped_delay * jitter_factor * (rand::random::<f64>() - 0.5);
            (capped_delay + jitter).max(0.0)
        } else {
            capped_delay
        };

        Duration::from_secs_f64(final_delay)
    }
}

/// Run `operation` until it succeeds, sleeping per `policy` between failures.
///
/// Returns `None` if `shutdown` flips to `true` before a success.
pub async fn retry_until_success<T, E, F, Fut>(
    operation_name: &str,
    policy: &ReconnectPolicy,
    shutdown: &mut watch::Receiver<bool>,
    mut operation: F,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt: u32 = 0;

    loop {
        if *shutdown.borrow() {
            return None;
        }

        attempt = attempt.saturating_add(1);
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    ErrorLogger::log_recovery_success(operation_name, attempt);
                }
                return Some(value);
            }
            Err(error) => {
                let delay = policy.calculate_delay(attempt);
                ErrorLogger::log_retry_attempt(operation_name, &error, attempt);
                LogContext::new("retry", operation_name)
                    .with_retry_count(attempt)
                    .with_metadata("delay_seconds", serde_json::json!(delay.as_secs()))
                    .info(&format!("Retrying in {} seconds", delay.as_secs()));

                tokio::select! {
                    _ = sleep(delay) => {}
                    changed = shutdown.changed() => {
                        // A dropped sender also ends the wait
                        if changed.is_err() || *shutdown.borrow() {
                            return None;
                        }
                    }
                }
            }
        }
    }
}
