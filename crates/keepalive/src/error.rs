//! Error types for device RPCs

use netmount_common::RemoteDeviceId;
use std::time::Duration;
use thiserror::Error;

/// RPC errors
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// No result within the request timeout
    #[error("{device}: RPC timed out after {timeout:?}")]
    TimedOut {
        device: RemoteDeviceId,
        timeout: Duration,
    },

    /// The master session holding the device could not be reached
    #[error("{device}: master session unreachable: {reason}")]
    Unreachable {
        device: RemoteDeviceId,
        reason: String,
    },

    /// The call did not reach the device or the session failed under it
    #[error("RPC failed: {0}")]
    Failed(String),
}

impl RpcError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RpcError::TimedOut { .. })
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, RpcError::Unreachable { .. })
    }
}

/// Result type for RPC operations
pub type Result<T> = std::result::Result<T, RpcError>;
