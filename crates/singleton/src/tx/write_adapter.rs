//! Write policy shared by every proxy shape

use super::Dispatcher;
use crate::error::{FailureCause, Result, TransactionError};
use netmount_common::{Datastore, LocatedNode, NormalizedNode, Path, TransactionId};
use netmount_protocol::{TxReply, TxRequest};
use std::sync::atomic::{AtomicBool, Ordering};

/// Translates write requests and owns the open/closed flag
///
/// The flag flips from open to closed exactly once, by whichever of
/// `cancel` and `commit` wins the compare-and-set.
pub(crate) struct ProxyWriteAdapter {
    dispatcher: Dispatcher,
    opened: AtomicBool,
}

impl ProxyWriteAdapter {
    pub(crate) fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            opened: AtomicBool::new(true),
        }
    }

    pub(crate) fn txn_id(&self) -> &TransactionId {
        self.dispatcher.txn_id()
    }

    pub(crate) fn is_open(&self) -> bool {
        self.opened.load(Ordering::Acquire)
    }

    pub(crate) fn put(&self, store: Datastore, path: Path, data: NormalizedNode) -> Result<()> {
        self.check_open("put")?;
        tracing::trace!("{}: put {} {}", self.txn_id(), store, path);
        self.dispatcher.tell(TxRequest::Put {
            store,
            payload: LocatedNode::new(path, data),
        });
        Ok(())
    }

    pub(crate) fn merge(&self, store: Datastore, path: Path, data: NormalizedNode) -> Result<()> {
        self.check_open("merge")?;
        tracing::trace!("{}: merge {} {}", self.txn_id(), store, path);
        self.dispatcher.tell(TxRequest::Merge {
            store,
            payload: LocatedNode::new(path, data),
        });
        Ok(())
    }

    pub(crate) fn delete(&self, store: Datastore, path: Path) -> Result<()> {
        self.check_open("delete")?;
        tracing::trace!("{}: delete {} {}", self.txn_id(), store, path);
        self.dispatcher.tell(TxRequest::Delete { store, path });
        Ok(())
    }

    pub(crate) async fn cancel(&self) -> bool {
        if !self.close() {
            tracing::debug!("{}: cancel on an already closed transaction", self.txn_id());
            return false;
        }

        tracing::trace!("{}: cancel", self.txn_id());
        match self.dispatcher.ask(TxRequest::Cancel).await {
            Ok(TxReply::Ack(cancelled)) => cancelled,
            Ok(other) => {
                tracing::warn!("{}: unexpected {} reply to cancel", self.txn_id(), other.kind());
                false
            }
            Err(e) => {
                tracing::warn!("{}: cancel failed: {}", self.txn_id(), e);
                false
            }
        }
    }

    pub(crate) async fn commit(&self) -> Result<()> {
        if !self.close() {
            return Err(TransactionError::IllegalState {
                txn_id: self.txn_id().clone(),
                operation: "commit",
            });
        }

        tracing::trace!("{}: commit", self.txn_id());
        let cause = match self.dispatcher.ask(TxRequest::Submit).await {
            Ok(TxReply::Ack(true)) => return Ok(()),
            Ok(TxReply::SubmitFailed(cause)) | Ok(TxReply::Failure(cause)) => cause.into(),
            Ok(other) => FailureCause::UnexpectedReply(other.kind()),
            Err(cause) => cause,
        };

        Err(TransactionError::CommitFailed {
            txn_id: self.txn_id().clone(),
            cause,
        })
    }

    /// Flip open to closed; false if someone else already did
    fn close(&self) -> bool {
        self.opened
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn check_open(&self, operation: &'static str) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(TransactionError::IllegalState {
                txn_id: self.txn_id().clone(),
                operation,
            })
        }
    }
}
