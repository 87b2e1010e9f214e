//! Error types for transactions against a mounted device

use netmount_bus::BusError;
use netmount_common::{Datastore, Path, TransactionId};
use netmount_protocol::RemoteCause;
use thiserror::Error;

/// Why an operation could not complete
#[derive(Debug, Clone, Error)]
pub enum FailureCause {
    /// No reply from the node holding the device session
    #[error("Master unreachable: {0}")]
    Unreachable(BusError),

    /// The master or its device backend reported a failure
    #[error("{0}")]
    Remote(RemoteCause),

    #[error("Unexpected reply: {0}")]
    UnexpectedReply(&'static str),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<BusError> for FailureCause {
    fn from(err: BusError) -> Self {
        FailureCause::Unreachable(err)
    }
}

impl From<RemoteCause> for FailureCause {
    fn from(cause: RemoteCause) -> Self {
        FailureCause::Remote(cause)
    }
}

impl From<netmount_protocol::ProtocolError> for FailureCause {
    fn from(err: netmount_protocol::ProtocolError) -> Self {
        FailureCause::Protocol(err.to_string())
    }
}

/// Transaction error types
#[derive(Debug, Clone, Error)]
pub enum TransactionError {
    #[error("{txn_id}: {operation} of {path} in {store} failed: {cause}")]
    ReadFailed {
        txn_id: TransactionId,
        operation: &'static str,
        store: Datastore,
        path: Path,
        cause: FailureCause,
    },

    #[error("{txn_id}: commit failed: {cause}")]
    CommitFailed {
        txn_id: TransactionId,
        cause: FailureCause,
    },

    /// The transaction was already cancelled or submitted
    #[error("{txn_id}: {operation} on a closed transaction")]
    IllegalState {
        txn_id: TransactionId,
        operation: &'static str,
    },

    #[error("{txn_id}: result dropped before completion")]
    Abandoned { txn_id: TransactionId },
}

impl TransactionError {
    /// The wrapped cause, if this failure carries one
    pub fn cause(&self) -> Option<&FailureCause> {
        match self {
            Self::ReadFailed { cause, .. } | Self::CommitFailed { cause, .. } => Some(cause),
            Self::IllegalState { .. } | Self::Abandoned { .. } => None,
        }
    }

    /// True when the master could not be reached, as opposed to a failure
    /// the device reported
    pub fn is_unreachable(&self) -> bool {
        matches!(self.cause(), Some(FailureCause::Unreachable(_)))
    }
}

/// Result type for transaction operations
pub type Result<T> = std::result::Result<T, TransactionError>;
