use super::{ProxyReadAdapter, ReadTransaction, TransactionHandle};
use crate::error::Result;
use async_trait::async_trait;
use netmount_common::{Datastore, NormalizedNode, Path, TransactionId};

/// Promise-style read-only proxy
pub struct ProxyReadTransaction {
    adapter: ProxyReadAdapter,
}

impl ProxyReadTransaction {
    pub(crate) fn new(adapter: ProxyReadAdapter) -> Self {
        Self { adapter }
    }
}

impl TransactionHandle for ProxyReadTransaction {
    fn identifier(&self) -> &TransactionId {
        self.adapter.txn_id()
    }
}

#[async_trait]
impl ReadTransaction for ProxyReadTransaction {
    async fn read(&self, store: Datastore, path: Path) -> Result<Option<NormalizedNode>> {
        self.adapter.read(store, path).await
    }

    async fn exists(&self, store: Datastore, path: Path) -> Result<bool> {
        self.adapter.exists(store, path).await
    }

    fn close(&self) {
        self.adapter.close();
    }
}
