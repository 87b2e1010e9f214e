//! Typed replies sent by the master

use crate::{Result, decode, encode};
use netmount_bus::Message;
use netmount_common::NormalizedNode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a failure reported across the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CauseKind {
    /// The device data backend rejected or failed the operation
    Backend,
    /// The operation is outside the transaction's capability set
    Unsupported,
    Unknown,
}

/// Serializable description of a failure on the master
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCause {
    pub kind: CauseKind,
    pub message: String,
}

impl RemoteCause {
    pub fn new(kind: CauseKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::new(CauseKind::Backend, message)
    }
}

impl fmt::Display for RemoteCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for RemoteCause {}

/// Replies of a transaction executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxReply {
    /// Read found data
    Value(NormalizedNode),
    /// Read found nothing at the path
    EmptyRead,
    /// Submit succeeded (`true`), or the outcome of a cancel
    Ack(bool),
    /// Exists outcome
    BoolResult(bool),
    SubmitFailed(RemoteCause),
    Failure(RemoteCause),
}

impl TxReply {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::EmptyRead => "empty-read",
            Self::Ack(_) => "ack",
            Self::BoolResult(_) => "bool-result",
            Self::SubmitFailed(_) => "submit-failed",
            Self::Failure(_) => "failure",
        }
    }

    pub fn into_message(self) -> Result<Message> {
        encode(self.kind(), None, &self)
    }

    pub fn from_message(msg: &Message) -> Result<Self> {
        decode(msg)
    }
}

/// Replies of the master session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MasterReply {
    /// Executor opened; `endpoint` names its bus endpoint
    TransactionOpened { endpoint: String },
    Failure(RemoteCause),
}

impl MasterReply {
    pub fn into_message(self) -> Result<Message> {
        let kind = match &self {
            Self::TransactionOpened { .. } => "transaction-opened",
            Self::Failure(_) => "failure",
        };
        encode(kind, None, &self)
    }

    pub fn from_message(msg: &Message) -> Result<Self> {
        decode(msg)
    }
}

/// Replies of the master to an invoked RPC
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpcReply {
    /// The device answered, possibly with errors
    Output {
        value: Option<NormalizedNode>,
        errors: Vec<String>,
    },
    /// The call failed on the master before the device answered
    Failure(RemoteCause),
}

impl RpcReply {
    pub fn into_message(self) -> Result<Message> {
        let kind = match &self {
            Self::Output { .. } => "rpc-output",
            Self::Failure(_) => "failure",
        };
        encode(kind, None, &self)
    }

    pub fn from_message(msg: &Message) -> Result<Self> {
        decode(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KIND_HEADER;

    #[test]
    fn test_failure_reply_keeps_cause() {
        let cause = RemoteCause::backend("lock denied");
        let msg = TxReply::SubmitFailed(cause.clone()).into_message().unwrap();
        assert_eq!(msg.header(KIND_HEADER), Some("submit-failed"));
        assert_eq!(TxReply::from_message(&msg).unwrap(), TxReply::SubmitFailed(cause));
    }

    #[test]
    fn test_cause_display() {
        let cause = RemoteCause::new(CauseKind::Unsupported, "put");
        assert_eq!(cause.to_string(), "Unsupported: put");
    }
}
