//! Keepalive configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing of keepalives and request deadlines for one device session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeepaliveConfig {
    /// Idle time after which a keepalive RPC is sent
    pub keepalive_delay: Duration,

    /// Deadline for every RPC, keepalives included
    pub request_timeout: Duration,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            keepalive_delay: Duration::from_secs(120),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl KeepaliveConfig {
    pub fn with_keepalive_delay(mut self, delay: Duration) -> Self {
        self.keepalive_delay = delay;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KeepaliveConfig::default();
        assert_eq!(config.keepalive_delay, Duration::from_secs(120));
        assert_eq!(config.request_timeout, Duration::from_secs(60));

        let config = config.with_request_timeout(Duration::from_millis(10));
        assert_eq!(config.request_timeout, Duration::from_millis(10));
    }
}
