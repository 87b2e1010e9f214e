use super::{ProxyWriteAdapter, TransactionHandle, WriteTransaction};
use crate::error::Result;
use async_trait::async_trait;
use netmount_common::{Datastore, NormalizedNode, Path, TransactionId};

/// Promise-style write-only proxy
pub struct ProxyWriteTransaction {
    adapter: ProxyWriteAdapter,
}

impl ProxyWriteTransaction {
    pub(crate) fn new(adapter: ProxyWriteAdapter) -> Self {
        Self { adapter }
    }
}

impl TransactionHandle for ProxyWriteTransaction {
    fn identifier(&self) -> &TransactionId {
        self.adapter.txn_id()
    }
}

#[async_trait]
impl WriteTransaction for ProxyWriteTransaction {
    fn put(&self, store: Datastore, path: Path, data: NormalizedNode) -> Result<()> {
        self.adapter.put(store, path, data)
    }

    fn merge(&self, store: Datastore, path: Path, data: NormalizedNode) -> Result<()> {
        self.adapter.merge(store, path, data)
    }

    fn delete(&self, store: Datastore, path: Path) -> Result<()> {
        self.adapter.delete(store, path)
    }

    async fn cancel(&self) -> bool {
        self.adapter.cancel().await
    }

    async fn commit(&self) -> Result<()> {
        self.adapter.commit().await
    }
}
