//! Protocol definitions for proxy-to-master communication, transactions and RPCs
//!
//! This crate defines typed message wrappers around the generic `Message` type
//! from netmount-bus. It provides type safety for the transaction protocol
//! without modifying the bus types.

pub mod messages;
pub mod responses;

pub use messages::{
    MasterMessage, MasterRequest, RpcMessage, TransactionKind, TxMessage, TxRequest,
};
pub use responses::{CauseKind, MasterReply, RemoteCause, RpcReply, TxReply};

use netmount_bus::Message;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Header carrying the transaction identifier
pub const TXN_ID_HEADER: &str = "txn_id";

/// Header naming the request or reply kind, for logging only
pub const KIND_HEADER: &str = "kind";

/// Errors that can occur when encoding or parsing messages
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("Invalid transaction ID: {0}")]
    InvalidTransactionId(String),

    #[error("Malformed body: {0}")]
    Body(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

pub(crate) fn encode<T: Serialize>(
    kind: &str,
    txn_id: Option<String>,
    payload: &T,
) -> Result<Message> {
    let mut headers = HashMap::new();
    headers.insert(KIND_HEADER.to_string(), kind.to_string());
    if let Some(txn_id) = txn_id {
        headers.insert(TXN_ID_HEADER.to_string(), txn_id);
    }
    Ok(Message::new(serde_json::to_vec(payload)?, headers))
}

pub(crate) fn decode<T: DeserializeOwned>(msg: &Message) -> Result<T> {
    Ok(serde_json::from_slice(&msg.body)?)
}
