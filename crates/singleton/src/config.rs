//! Proxy and executor configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration shared by the master executors and the proxies of one
/// mounted device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Upper bound on waiting for the single reply to a request
    pub ask_timeout: Duration,

    /// Stop a transaction executor that received no message for this long,
    /// cancelling its outstanding writes; `None` disables expiry
    pub write_tx_idle_timeout: Option<Duration>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            ask_timeout: Duration::from_secs(5),
            write_tx_idle_timeout: None,
        }
    }
}

impl ProxyConfig {
    /// Set the ask timeout
    pub fn with_ask_timeout(mut self, timeout: Duration) -> Self {
        self.ask_timeout = timeout;
        self
    }

    /// Set the executor idle timeout
    pub fn with_write_tx_idle_timeout(mut self, timeout: Duration) -> Self {
        self.write_tx_idle_timeout = Some(timeout);
        self
    }
}
