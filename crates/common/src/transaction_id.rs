//! Transaction identifier using UUIDv7
//!
//! Identifiers only serve logging and error reporting; routing always goes
//! through an executor handle.

use crate::RemoteDeviceId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of one transaction instance against one mounted device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId {
    device: RemoteDeviceId,
    id: Uuid,
}

impl TransactionId {
    /// Generate a fresh identifier for a transaction on `device`
    pub fn new(device: RemoteDeviceId) -> Self {
        Self {
            device,
            id: Uuid::now_v7(),
        }
    }

    /// Create from an existing UUID (for testing/deserialization)
    pub fn from_uuid(device: RemoteDeviceId, id: Uuid) -> Self {
        Self { device, id }
    }

    /// The device this transaction runs against
    pub fn device(&self) -> &RemoteDeviceId {
        &self.device
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.id
    }

    /// Parse the `device:uuid` form produced by `Display`
    pub fn parse(s: &str) -> Result<Self, String> {
        let (device, id) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("Invalid transaction ID: {}", s))?;
        let id = Uuid::parse_str(id).map_err(|e| format!("Invalid transaction ID: {}", e))?;
        Ok(Self {
            device: RemoteDeviceId::new(device),
            id,
        })
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.device.name(), self.id)
    }
}
