//! Process-local cluster bus
//!
//! Every endpoint owns a single unbounded queue, so messages from any one
//! sender are observed by the endpoint in the order they were sent.

use crate::{BusError, Message, Result};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use tokio::sync::{mpsc, oneshot};

pub(crate) type Inbox = mpsc::UnboundedSender<Envelope>;

/// Reply slot of an `ask`
pub struct ReplyTo(oneshot::Sender<Message>);

impl ReplyTo {
    /// Send the reply; returns false if the asker stopped waiting
    pub fn send(self, message: Message) -> bool {
        self.0.send(message).is_ok()
    }
}

/// A delivered message together with its optional reply slot
pub struct Envelope {
    /// Node that sent the message
    pub from: String,
    pub message: Message,
    reply_to: Option<ReplyTo>,
}

impl Envelope {
    pub(crate) fn new(from: String, message: Message, reply: Option<oneshot::Sender<Message>>) -> Self {
        Self {
            from,
            message,
            reply_to: reply.map(ReplyTo),
        }
    }

    /// Whether the sender waits for a reply
    pub fn expects_reply(&self) -> bool {
        self.reply_to.is_some()
    }

    /// Take the reply slot, leaving the envelope fire-and-forget
    pub fn take_reply(&mut self) -> Option<ReplyTo> {
        self.reply_to.take()
    }
}

/// Receiving side of a registered endpoint
pub struct Mailbox {
    name: String,
    receiver: mpsc::UnboundedReceiver<Envelope>,
}

impl Mailbox {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Receive the next envelope; `None` once every sender is gone
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.receiver.recv().await
    }

    /// Try to receive without blocking
    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.receiver.try_recv().ok()
    }
}

/// Registry of named endpoints shared by every node of the cluster
#[derive(Default)]
pub struct MessageBus {
    endpoints: DashMap<String, Inbox>,

    /// Endpoints whose traffic is silently dropped (simulated partition)
    partitioned: DashSet<String>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named endpoint
    pub fn register(&self, name: impl Into<String>) -> Result<Mailbox> {
        let name = name.into();
        let (tx, rx) = mpsc::unbounded_channel();

        match self.endpoints.entry(name.clone()) {
            Entry::Occupied(mut entry) => {
                if !entry.get().is_closed() {
                    return Err(BusError::EndpointExists(name));
                }
                entry.insert(tx);
            }
            Entry::Vacant(entry) => {
                entry.insert(tx);
            }
        }

        tracing::trace!("Registered endpoint {}", name);
        Ok(Mailbox { name, receiver: rx })
    }

    /// Remove a named endpoint; handles resolved earlier keep working until
    /// the mailbox is dropped
    pub fn unregister(&self, name: &str) {
        if self.endpoints.remove(name).is_some() {
            tracing::trace!("Unregistered endpoint {}", name);
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.endpoints
            .get(name)
            .is_some_and(|inbox| !inbox.is_closed())
    }

    /// Drop all traffic addressed to `name` until healed
    pub fn partition(&self, name: impl Into<String>) {
        self.partitioned.insert(name.into());
    }

    pub fn heal(&self, name: &str) {
        self.partitioned.remove(name);
    }

    pub(crate) fn is_partitioned(&self, name: &str) -> bool {
        self.partitioned.contains(name)
    }

    pub(crate) fn inbox(&self, name: &str) -> Option<Inbox> {
        self.endpoints
            .get(name)
            .map(|inbox| inbox.clone())
            .filter(|inbox| !inbox.is_closed())
    }

    /// Clean up endpoints whose mailbox was dropped
    pub fn cleanup(&self) {
        self.endpoints.retain(|_, inbox| !inbox.is_closed());
    }
}
