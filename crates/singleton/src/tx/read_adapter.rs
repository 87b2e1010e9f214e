//! Read policy shared by every proxy shape

use super::Dispatcher;
use crate::error::{FailureCause, Result, TransactionError};
use netmount_common::{Datastore, NormalizedNode, Path, TransactionId};
use netmount_protocol::{TxReply, TxRequest};

/// Translates read requests and their replies
pub(crate) struct ProxyReadAdapter {
    dispatcher: Dispatcher,
}

impl ProxyReadAdapter {
    pub(crate) fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub(crate) fn txn_id(&self) -> &TransactionId {
        self.dispatcher.txn_id()
    }

    pub(crate) async fn read(&self, store: Datastore, path: Path) -> Result<Option<NormalizedNode>> {
        tracing::trace!("{}: read {} {}", self.txn_id(), store, path);

        let request = TxRequest::Read {
            store,
            path: path.clone(),
        };
        match self.dispatcher.ask(request).await {
            Ok(TxReply::Value(node)) => Ok(Some(node)),
            Ok(TxReply::EmptyRead) => Ok(None),
            Ok(TxReply::Failure(cause)) => Err(self.failed("read", store, path, cause.into())),
            Ok(other) => Err(self.failed(
                "read",
                store,
                path,
                FailureCause::UnexpectedReply(other.kind()),
            )),
            Err(cause) => Err(self.failed("read", store, path, cause)),
        }
    }

    pub(crate) async fn exists(&self, store: Datastore, path: Path) -> Result<bool> {
        tracing::trace!("{}: exists {} {}", self.txn_id(), store, path);

        let request = TxRequest::Exists {
            store,
            path: path.clone(),
        };
        match self.dispatcher.ask(request).await {
            Ok(TxReply::BoolResult(found)) => Ok(found),
            Ok(TxReply::Failure(cause)) => Err(self.failed("exists", store, path, cause.into())),
            Ok(other) => Err(self.failed(
                "exists",
                store,
                path,
                FailureCause::UnexpectedReply(other.kind()),
            )),
            Err(cause) => Err(self.failed("exists", store, path, cause)),
        }
    }

    pub(crate) fn close(&self) {
        tracing::trace!("{}: close", self.txn_id());
        self.dispatcher.release();
    }

    fn failed(
        &self,
        operation: &'static str,
        store: Datastore,
        path: Path,
        cause: FailureCause,
    ) -> TransactionError {
        TransactionError::ReadFailed {
            txn_id: self.txn_id().clone(),
            operation,
            store,
            path,
            cause,
        }
    }
}
