//! Transaction capability sets and their proxy implementations
//!
//! Two adapter shapes expose the same policy:
//! - Promise style: [`ProxyReadTransaction`], [`ProxyWriteTransaction`] and
//!   [`ProxyReadWriteTransaction`] return futures the caller awaits
//! - Callback style: [`ProxyTransactionFacade`] returns [`ResultHandle`]s
//!   settled by background tasks
//!
//! Both delegate to the same read and write adapters, so timeout, reply
//! translation and lifecycle rules are identical.

mod dispatch;
mod facade;
mod failed;
mod read_adapter;
mod read_only;
mod read_write;
mod write_adapter;
mod write_only;

pub(crate) use dispatch::Dispatcher;
pub use facade::{ProxyTransactionFacade, ResultHandle};
pub use failed::FailedProxyTransaction;
pub(crate) use read_adapter::ProxyReadAdapter;
pub use read_only::ProxyReadTransaction;
pub use read_write::ProxyReadWriteTransaction;
pub(crate) use write_adapter::ProxyWriteAdapter;
pub use write_only::ProxyWriteTransaction;

use crate::error::Result;
use async_trait::async_trait;
use netmount_common::{Datastore, NormalizedNode, Path, TransactionId};

/// Anything identified by a transaction identifier
pub trait TransactionHandle: Send + Sync {
    fn identifier(&self) -> &TransactionId;
}

/// Read capability set
#[async_trait]
pub trait ReadTransaction: TransactionHandle {
    /// Read the node at `path`; `None` when nothing is there
    async fn read(&self, store: Datastore, path: Path) -> Result<Option<NormalizedNode>>;

    async fn exists(&self, store: Datastore, path: Path) -> Result<bool>;

    /// Release the transaction; further reads are not expected
    fn close(&self) {}
}

/// Write capability set
///
/// Mutations are fire-and-forget: they only fail when the transaction is
/// already closed, and any other failure surfaces at `commit`.
#[async_trait]
pub trait WriteTransaction: TransactionHandle {
    fn put(&self, store: Datastore, path: Path, data: NormalizedNode) -> Result<()>;

    fn merge(&self, store: Datastore, path: Path, data: NormalizedNode) -> Result<()>;

    fn delete(&self, store: Datastore, path: Path) -> Result<()>;

    /// Close the transaction discarding its writes
    ///
    /// Resolves once the master answered or the ask timeout elapsed; false
    /// when the transaction was already closed or the cancel did not succeed.
    async fn cancel(&self) -> bool;

    /// Close the transaction applying its writes
    async fn commit(&self) -> Result<()>;
}

/// Combined read and write capability set
pub trait ReadWriteTransaction: ReadTransaction + WriteTransaction {}

impl<T: ReadTransaction + WriteTransaction> ReadWriteTransaction for T {}
