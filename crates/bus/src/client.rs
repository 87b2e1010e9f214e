//! Per-node client of the cluster bus

use crate::bus::{Envelope, Inbox, MessageBus};
use crate::{BusError, Message, Result};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Resolved reference to a remote endpoint
///
/// Resolved once and reused for every message sent during its owner's life.
#[derive(Clone)]
pub struct ExecutorHandle {
    name: Arc<str>,
    inbox: Inbox,
}

impl ExecutorHandle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for ExecutorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExecutorHandle").field(&self.name).finish()
    }
}

/// Client for interacting with the bus from one node
#[derive(Clone)]
pub struct BusClient {
    /// Node ID
    node_id: String,

    /// Reference to the shared bus
    bus: Arc<MessageBus>,
}

impl BusClient {
    /// Create a new client
    pub fn new(node_id: impl Into<String>, bus: Arc<MessageBus>) -> Self {
        Self {
            node_id: node_id.into(),
            bus,
        }
    }

    /// Get the node ID of this client
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    /// Resolve a named endpoint into a handle
    pub fn resolve(&self, name: &str) -> Result<ExecutorHandle> {
        let inbox = self
            .bus
            .inbox(name)
            .ok_or_else(|| BusError::EndpointNotFound(name.to_string()))?;
        Ok(ExecutorHandle {
            name: Arc::from(name),
            inbox,
        })
    }

    /// Send a message without waiting for a reply
    pub fn tell(&self, handle: &ExecutorHandle, message: Message) -> Result<()> {
        if self.bus.is_partitioned(handle.name()) {
            tracing::trace!("{}: dropping message to partitioned {}", self.node_id, handle.name());
            return Ok(());
        }

        handle
            .inbox
            .send(Envelope::new(self.node_id.clone(), message, None))
            .map_err(|_| BusError::ChannelClosed(handle.name().to_string()))
    }

    /// Send a request and wait for its single reply
    pub async fn ask(
        &self,
        handle: &ExecutorHandle,
        message: Message,
        timeout: Duration,
    ) -> Result<Message> {
        let (reply_tx, reply_rx) = oneshot::channel();

        if self.bus.is_partitioned(handle.name()) {
            // The request is lost; keep the reply slot open so the asker sees
            // silence rather than a closed channel
            let _lost = reply_tx;
            tokio::time::sleep(timeout).await;
            return Err(BusError::Timeout {
                endpoint: handle.name().to_string(),
                timeout,
            });
        }

        handle
            .inbox
            .send(Envelope::new(self.node_id.clone(), message, Some(reply_tx)))
            .map_err(|_| BusError::ChannelClosed(handle.name().to_string()))?;

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(BusError::ChannelClosed(handle.name().to_string())),
            Err(_) => Err(BusError::Timeout {
                endpoint: handle.name().to_string(),
                timeout,
            }),
        }
    }
}
