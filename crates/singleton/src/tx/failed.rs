//! Stand-in for a transaction that could not be opened

use super::{ReadTransaction, TransactionHandle, WriteTransaction};
use crate::error::{FailureCause, Result, TransactionError};
use async_trait::async_trait;
use netmount_common::{Datastore, NormalizedNode, Path, TransactionId};

/// Answers every operation with the failure captured at construction
///
/// Reads and commits fail with the cause, cancel reports success and
/// mutations are accepted and dropped.
#[derive(Debug, Clone)]
pub struct FailedProxyTransaction {
    txn_id: TransactionId,
    cause: FailureCause,
}

impl FailedProxyTransaction {
    pub fn new(txn_id: TransactionId, cause: FailureCause) -> Self {
        tracing::warn!("{}: transaction unavailable: {}", txn_id, cause);
        Self { txn_id, cause }
    }

    pub(crate) fn txn_id(&self) -> &TransactionId {
        &self.txn_id
    }

    pub fn cause(&self) -> &FailureCause {
        &self.cause
    }

    pub(crate) fn read_failed(
        &self,
        operation: &'static str,
        store: Datastore,
        path: Path,
    ) -> TransactionError {
        TransactionError::ReadFailed {
            txn_id: self.txn_id.clone(),
            operation,
            store,
            path,
            cause: self.cause.clone(),
        }
    }

    pub(crate) fn commit_failed(&self) -> TransactionError {
        TransactionError::CommitFailed {
            txn_id: self.txn_id.clone(),
            cause: self.cause.clone(),
        }
    }

    pub(crate) fn ignore(&self, operation: &str, store: Datastore, path: &Path) {
        tracing::debug!("{}: {} {} {} ignored", self.txn_id, operation, store, path);
    }
}

impl TransactionHandle for FailedProxyTransaction {
    fn identifier(&self) -> &TransactionId {
        &self.txn_id
    }
}

#[async_trait]
impl ReadTransaction for FailedProxyTransaction {
    async fn read(&self, store: Datastore, path: Path) -> Result<Option<NormalizedNode>> {
        Err(self.read_failed("read", store, path))
    }

    async fn exists(&self, store: Datastore, path: Path) -> Result<bool> {
        Err(self.read_failed("exists", store, path))
    }
}

#[async_trait]
impl WriteTransaction for FailedProxyTransaction {
    fn put(&self, store: Datastore, path: Path, _data: NormalizedNode) -> Result<()> {
        self.ignore("put", store, &path);
        Ok(())
    }

    fn merge(&self, store: Datastore, path: Path, _data: NormalizedNode) -> Result<()> {
        self.ignore("merge", store, &path);
        Ok(())
    }

    fn delete(&self, store: Datastore, path: Path) -> Result<()> {
        self.ignore("delete", store, &path);
        Ok(())
    }

    async fn cancel(&self) -> bool {
        true
    }

    async fn commit(&self) -> Result<()> {
        Err(self.commit_failed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netmount_common::{RemoteDeviceId, Value};
    use netmount_protocol::RemoteCause;

    fn failed() -> FailedProxyTransaction {
        let txn_id = TransactionId::new(RemoteDeviceId::new("r1"));
        FailedProxyTransaction::new(txn_id, RemoteCause::backend("no master").into())
    }

    #[tokio::test]
    async fn test_every_operation_answers() {
        let tx = failed();
        let path: Path = "/a/b".parse().unwrap();

        let err = tx.read(Datastore::Operational, path.clone()).await.unwrap_err();
        assert!(matches!(err, TransactionError::ReadFailed { operation: "read", .. }));
        assert!(err.to_string().contains("no master"));

        let err = tx.exists(Datastore::Configuration, path.clone()).await.unwrap_err();
        assert!(matches!(err, TransactionError::ReadFailed { operation: "exists", .. }));

        tx.put(Datastore::Configuration, path.clone(), NormalizedNode::leaf(Value::Integer(1)))
            .unwrap();
        tx.merge(Datastore::Configuration, path.clone(), NormalizedNode::leaf(Value::Integer(2)))
            .unwrap();
        tx.delete(Datastore::Configuration, path).unwrap();

        assert!(tx.cancel().await);
        // Still answers after cancel
        assert!(tx.cancel().await);

        let err = tx.commit().await.unwrap_err();
        assert!(matches!(err, TransactionError::CommitFailed { .. }));
        assert!(!err.is_unreachable());
    }
}
