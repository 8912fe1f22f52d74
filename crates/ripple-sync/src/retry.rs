//! Reconnect retry policy
//!
//! Bounded exponential backoff for re-attaching the push channel.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for reconnection behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of connect attempts before giving up
    pub max_attempts: u32,
    /// Base delay for exponential backoff in milliseconds
    pub base_delay_ms: u64,
    /// Maximum delay between attempts in milliseconds
    pub max_delay_ms: u64,
    /// Growth factor applied per failed attempt
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 30_000, // 30 seconds
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Backoff delay for an attempt (1-based)
    pub fn backoff_delay(&self, attempt_number: u32) -> Duration {
        let delay = self.base_delay_ms as f64
            * self
                .backoff_multiplier
                .powi(attempt_number.saturating_sub(1) as i32);
        Duration::from_millis((delay as u64).min(self.max_delay_ms))
    }
}
