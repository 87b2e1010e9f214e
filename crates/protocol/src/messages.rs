//! Typed requests sent by proxies

use crate::{ProtocolError, Result, TXN_ID_HEADER, decode, encode};
use netmount_bus::Message;
use netmount_common::{Datastore, LocatedNode, NormalizedNode, Path, TransactionId};
use serde::{Deserialize, Serialize};

/// Requests a transaction executor accepts
///
/// `Put`, `Merge`, `Delete` and `Close` are fire-and-forget; every other
/// request expects exactly one `TxReply`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxRequest {
    Read { store: Datastore, path: Path },
    Exists { store: Datastore, path: Path },
    Put { store: Datastore, payload: LocatedNode },
    Merge { store: Datastore, payload: LocatedNode },
    Delete { store: Datastore, path: Path },
    Submit,
    Cancel,
    /// Release a read-only executor
    Close,
}

impl TxRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Read { .. } => "read",
            Self::Exists { .. } => "exists",
            Self::Put { .. } => "put",
            Self::Merge { .. } => "merge",
            Self::Delete { .. } => "delete",
            Self::Submit => "submit",
            Self::Cancel => "cancel",
            Self::Close => "close",
        }
    }

    /// Whether the sender waits for a reply
    pub fn expects_reply(&self) -> bool {
        !matches!(
            self,
            Self::Put { .. } | Self::Merge { .. } | Self::Delete { .. } | Self::Close
        )
    }
}

/// A request addressed to the executor of one transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxMessage {
    pub txn_id: TransactionId,
    pub request: TxRequest,
}

impl TxMessage {
    pub fn new(txn_id: TransactionId, request: TxRequest) -> Self {
        Self { txn_id, request }
    }

    /// Convert to a raw Message for sending
    pub fn into_message(self) -> Result<Message> {
        encode(
            self.request.kind(),
            Some(self.txn_id.to_string()),
            &self.request,
        )
    }

    /// Parse a Message into a typed request
    pub fn from_message(msg: &Message) -> Result<Self> {
        let txn_id_str = msg
            .header(TXN_ID_HEADER)
            .ok_or(ProtocolError::MissingHeader(TXN_ID_HEADER))?;
        let txn_id = TransactionId::parse(txn_id_str)
            .map_err(|_| ProtocolError::InvalidTransactionId(txn_id_str.to_string()))?;

        Ok(Self {
            txn_id,
            request: decode(msg)?,
        })
    }
}

/// Capability set of a transaction opened on the master
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// Requests served by the master session of a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MasterRequest {
    /// Open a transaction executor and reply with its endpoint
    NewTransaction { kind: TransactionKind },
}

/// A request addressed to the master session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterMessage {
    pub txn_id: TransactionId,
    pub request: MasterRequest,
}

impl MasterMessage {
    pub fn new(txn_id: TransactionId, request: MasterRequest) -> Self {
        Self { txn_id, request }
    }

    pub fn into_message(self) -> Result<Message> {
        encode("new-transaction", Some(self.txn_id.to_string()), &self.request)
    }

    pub fn from_message(msg: &Message) -> Result<Self> {
        let txn_id_str = msg
            .header(TXN_ID_HEADER)
            .ok_or(ProtocolError::MissingHeader(TXN_ID_HEADER))?;
        let txn_id = TransactionId::parse(txn_id_str)
            .map_err(|_| ProtocolError::InvalidTransactionId(txn_id_str.to_string()))?;

        Ok(Self {
            txn_id,
            request: decode(msg)?,
        })
    }
}

/// An RPC to invoke on the device through its master session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcMessage {
    pub name: String,
    pub input: NormalizedNode,
}

impl RpcMessage {
    pub fn new(name: impl Into<String>, input: NormalizedNode) -> Self {
        Self {
            name: name.into(),
            input,
        }
    }

    pub fn into_message(self) -> Result<Message> {
        encode("invoke-rpc", None, &self)
    }

    pub fn from_message(msg: &Message) -> Result<Self> {
        decode(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KIND_HEADER;
    use netmount_common::RemoteDeviceId;

    #[test]
    fn test_request_carries_headers() {
        let txn_id = TransactionId::new(RemoteDeviceId::new("r1"));
        let payload = LocatedNode::new("/a/b".parse().unwrap(), NormalizedNode::leaf(1));
        let msg = TxMessage::new(
            txn_id.clone(),
            TxRequest::Put {
                store: Datastore::Configuration,
                payload,
            },
        )
        .into_message()
        .unwrap();

        assert_eq!(msg.header(KIND_HEADER), Some("put"));
        assert_eq!(msg.header(TXN_ID_HEADER), Some(txn_id.to_string().as_str()));

        let parsed = TxMessage::from_message(&msg).unwrap();
        assert_eq!(parsed.txn_id, txn_id);
        assert!(!parsed.request.expects_reply());
    }

    #[test]
    fn test_missing_txn_id_is_rejected() {
        let msg = Message::bare(serde_json::to_vec(&TxRequest::Submit).unwrap());
        assert!(matches!(
            TxMessage::from_message(&msg),
            Err(ProtocolError::MissingHeader(TXN_ID_HEADER))
        ));
    }

    #[test]
    fn test_malformed_body_is_rejected() {
        let txn_id = TransactionId::new(RemoteDeviceId::new("r1"));
        let msg = Message::bare(b"{not json".to_vec())
            .with_header(TXN_ID_HEADER, txn_id.to_string());
        assert!(matches!(
            TxMessage::from_message(&msg),
            Err(ProtocolError::Body(_))
        ));
    }

    #[test]
    fn test_rpc_request_names_operation() {
        let msg = RpcMessage::new("get-config", NormalizedNode::leaf("running"))
            .into_message()
            .unwrap();
        assert_eq!(msg.header(KIND_HEADER), Some("invoke-rpc"));
        assert_eq!(msg.header(TXN_ID_HEADER), None);

        let parsed = RpcMessage::from_message(&msg).unwrap();
        assert_eq!(parsed.name, "get-config");
        assert_eq!(parsed.input, NormalizedNode::leaf("running"));
    }

    #[test]
    fn test_reply_expectations() {
        assert!(TxRequest::Submit.expects_reply());
        assert!(TxRequest::Cancel.expects_reply());
        assert!(!TxRequest::Close.expects_reply());
    }
}
