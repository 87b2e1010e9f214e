//! In-memory cluster message bus
//!
//! Provides location-transparent delivery to named endpoints: fire-and-forget
//! `tell` and request/reply `ask` with a bounded wait.

use std::time::Duration;
use thiserror::Error;

pub mod bus;
pub mod client;
pub mod message;

pub use bus::{Envelope, Mailbox, MessageBus, ReplyTo};
pub use client::{BusClient, ExecutorHandle};
pub use message::Message;

/// Bus errors
#[derive(Debug, Clone, Error)]
pub enum BusError {
    #[error("Endpoint not found: {0}")]
    EndpointNotFound(String),

    #[error("Endpoint already registered: {0}")]
    EndpointExists(String),

    #[error("No reply from {endpoint} within {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },

    #[error("Channel to {0} closed")]
    ChannelClosed(String),
}

pub type Result<T> = std::result::Result<T, BusError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_request_reply() {
        let bus = Arc::new(MessageBus::new());
        let client = BusClient::new("node-1", bus.clone());

        let mut mailbox = bus.register("echo").unwrap();
        tokio::spawn(async move {
            while let Some(mut envelope) = mailbox.recv().await {
                if let Some(reply) = envelope.take_reply() {
                    reply.send(Message::bare(envelope.message.body.clone()));
                }
            }
        });

        let handle = client.resolve("echo").unwrap();
        let reply = client
            .ask(&handle, Message::bare(b"ping".to_vec()), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(reply.body, b"ping");
    }

    #[tokio::test]
    async fn test_tell_preserves_order() {
        let bus = Arc::new(MessageBus::new());
        let client = BusClient::new("node-1", bus.clone());
        let mut mailbox = bus.register("sink").unwrap();
        let handle = client.resolve("sink").unwrap();

        for i in 0..10u8 {
            client.tell(&handle, Message::bare(vec![i])).unwrap();
        }

        for i in 0..10u8 {
            let envelope = mailbox.recv().await.unwrap();
            assert_eq!(envelope.message.body, vec![i]);
            assert_eq!(envelope.from, "node-1");
            assert!(!envelope.expects_reply());
        }
    }

    #[tokio::test]
    async fn test_ask_times_out_without_reply() {
        let bus = Arc::new(MessageBus::new());
        let client = BusClient::new("node-1", bus.clone());

        // Hold the mailbox but never answer
        let _mailbox = bus.register("silent").unwrap();
        let handle = client.resolve("silent").unwrap();

        let result = client
            .ask(&handle, Message::default(), Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(BusError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_partitioned_endpoint_times_out() {
        let bus = Arc::new(MessageBus::new());
        let client = BusClient::new("node-1", bus.clone());
        let mut mailbox = bus.register("remote").unwrap();
        let handle = client.resolve("remote").unwrap();

        bus.partition("remote");
        client.tell(&handle, Message::default()).unwrap();
        let result = client
            .ask(&handle, Message::default(), Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(BusError::Timeout { .. })));
        assert!(mailbox.try_recv().is_none());

        bus.heal("remote");
        client.tell(&handle, Message::default()).unwrap();
        assert!(mailbox.try_recv().is_some());
    }

    #[tokio::test]
    async fn test_dropped_mailbox_closes_channel() {
        let bus = Arc::new(MessageBus::new());
        let client = BusClient::new("node-1", bus.clone());

        let mailbox = bus.register("gone").unwrap();
        let handle = client.resolve("gone").unwrap();
        drop(mailbox);

        let result = client
            .ask(&handle, Message::default(), Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(BusError::ChannelClosed(_))));
        assert!(matches!(
            client.resolve("gone"),
            Err(BusError::EndpointNotFound(_))
        ));
    }

    #[test]
    fn test_register_rejects_live_duplicate() {
        let bus = MessageBus::new();
        let first = bus.register("dup").unwrap();
        assert!(matches!(bus.register("dup"), Err(BusError::EndpointExists(_))));

        drop(first);
        assert!(bus.register("dup").is_ok());
    }
}
