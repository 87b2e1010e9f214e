use super::{
    ProxyReadAdapter, ProxyWriteAdapter, ReadTransaction, TransactionHandle, WriteTransaction,
};
use crate::error::Result;
use async_trait::async_trait;
use netmount_common::{Datastore, NormalizedNode, Path, TransactionId};

/// Promise-style read-write proxy
///
/// Reads stay available after commit or cancel; only the write half is
/// single-use.
pub struct ProxyReadWriteTransaction {
    read: ProxyReadAdapter,
    write: ProxyWriteAdapter,
}

impl ProxyReadWriteTransaction {
    pub(crate) fn new(read: ProxyReadAdapter, write: ProxyWriteAdapter) -> Self {
        Self { read, write }
    }
}

impl TransactionHandle for ProxyReadWriteTransaction {
    fn identifier(&self) -> &TransactionId {
        self.read.txn_id()
    }
}

#[async_trait]
impl ReadTransaction for ProxyReadWriteTransaction {
    async fn read(&self, store: Datastore, path: Path) -> Result<Option<NormalizedNode>> {
        self.read.read(store, path).await
    }

    async fn exists(&self, store: Datastore, path: Path) -> Result<bool> {
        self.read.exists(store, path).await
    }

    fn close(&self) {
        // Closing an open read-write transaction would drop its writes
        if self.write.is_open() {
            tracing::debug!("{}: close ignored, writes still pending", self.read.txn_id());
            return;
        }
        self.read.close();
    }
}

#[async_trait]
impl WriteTransaction for ProxyReadWriteTransaction {
    fn put(&self, store: Datastore, path: Path, data: NormalizedNode) -> Result<()> {
        self.write.put(store, path, data)
    }

    fn merge(&self, store: Datastore, path: Path, data: NormalizedNode) -> Result<()> {
        self.write.merge(store, path, data)
    }

    fn delete(&self, store: Datastore, path: Path) -> Result<()> {
        self.write.delete(store, path)
    }

    async fn cancel(&self) -> bool {
        self.write.cancel().await
    }

    async fn commit(&self) -> Result<()> {
        self.write.commit().await
    }
}
