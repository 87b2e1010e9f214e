//! Callback-style transaction facade

use super::{FailedProxyTransaction, ProxyReadAdapter, ProxyWriteAdapter};
use crate::error::{Result, TransactionError};
use netmount_common::{Datastore, NormalizedNode, Path, TransactionId};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Pending result of a facade operation
///
/// Settled by a background task. Await it, poll it with
/// [`ResultHandle::try_take`], or hand it a callback with
/// [`ResultHandle::on_complete`].
pub struct ResultHandle<T> {
    txn_id: TransactionId,
    receiver: oneshot::Receiver<Result<T>>,
}

impl<T: Send + 'static> ResultHandle<T> {
    /// Run `work` in the background and settle the handle with its outcome
    fn settle<F>(txn_id: TransactionId, work: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        tokio::spawn(async move {
            let _ = sender.send(work.await);
        });
        Self { txn_id, receiver }
    }

    /// A handle that is already settled
    fn ready(txn_id: TransactionId, outcome: Result<T>) -> Self {
        let (sender, receiver) = oneshot::channel();
        let _ = sender.send(outcome);
        Self { txn_id, receiver }
    }

    /// Invoke `callback` once the outcome is known
    pub fn on_complete<F>(self, callback: F)
    where
        F: FnOnce(Result<T>) + Send + 'static,
    {
        tokio::spawn(async move {
            callback(self.await);
        });
    }

    /// Take the outcome if it is already known
    pub fn try_take(&mut self) -> Option<Result<T>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(self.abandoned())),
        }
    }

    fn abandoned(&self) -> TransactionError {
        TransactionError::Abandoned {
            txn_id: self.txn_id.clone(),
        }
    }
}

impl<T: Send + 'static> Future for ResultHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(self.abandoned())),
            Poll::Pending => Poll::Pending,
        }
    }
}

struct Proxy {
    read: ProxyReadAdapter,
    write: ProxyWriteAdapter,
}

enum Target {
    Proxy(Arc<Proxy>),
    Failed(FailedProxyTransaction),
}

/// Unified read-write transaction exposing results as [`ResultHandle`]s
///
/// Either proxies to a master executor or, when the transaction could not be
/// opened, answers from a [`FailedProxyTransaction`]. Must be used from
/// within a tokio runtime.
pub struct ProxyTransactionFacade {
    target: Target,
}

impl ProxyTransactionFacade {
    pub(crate) fn proxy(read: ProxyReadAdapter, write: ProxyWriteAdapter) -> Self {
        Self {
            target: Target::Proxy(Arc::new(Proxy { read, write })),
        }
    }

    pub fn failed(failed: FailedProxyTransaction) -> Self {
        Self {
            target: Target::Failed(failed),
        }
    }

    pub fn identifier(&self) -> &TransactionId {
        match &self.target {
            Target::Proxy(proxy) => proxy.read.txn_id(),
            Target::Failed(failed) => failed.txn_id(),
        }
    }

    /// True when this facade stands in for a transaction that could not
    /// be opened
    pub fn is_failed(&self) -> bool {
        matches!(self.target, Target::Failed(_))
    }

    pub fn read(&self, store: Datastore, path: Path) -> ResultHandle<Option<NormalizedNode>> {
        let txn_id = self.identifier().clone();
        match &self.target {
            Target::Proxy(proxy) => {
                let proxy = proxy.clone();
                ResultHandle::settle(txn_id, async move { proxy.read.read(store, path).await })
            }
            Target::Failed(failed) => {
                ResultHandle::ready(txn_id, Err(failed.read_failed("read", store, path)))
            }
        }
    }

    pub fn exists(&self, store: Datastore, path: Path) -> ResultHandle<bool> {
        let txn_id = self.identifier().clone();
        match &self.target {
            Target::Proxy(proxy) => {
                let proxy = proxy.clone();
                ResultHandle::settle(txn_id, async move { proxy.read.exists(store, path).await })
            }
            Target::Failed(failed) => {
                ResultHandle::ready(txn_id, Err(failed.read_failed("exists", store, path)))
            }
        }
    }

    pub fn put(&self, store: Datastore, path: Path, data: NormalizedNode) -> Result<()> {
        match &self.target {
            Target::Proxy(proxy) => proxy.write.put(store, path, data),
            Target::Failed(failed) => {
                failed.ignore("put", store, &path);
                Ok(())
            }
        }
    }

    pub fn merge(&self, store: Datastore, path: Path, data: NormalizedNode) -> Result<()> {
        match &self.target {
            Target::Proxy(proxy) => proxy.write.merge(store, path, data),
            Target::Failed(failed) => {
                failed.ignore("merge", store, &path);
                Ok(())
            }
        }
    }

    pub fn delete(&self, store: Datastore, path: Path) -> Result<()> {
        match &self.target {
            Target::Proxy(proxy) => proxy.write.delete(store, path),
            Target::Failed(failed) => {
                failed.ignore("delete", store, &path);
                Ok(())
            }
        }
    }

    /// Discard the transaction; settles false when it was already closed
    /// or the master did not confirm
    pub fn cancel(&self) -> ResultHandle<bool> {
        let txn_id = self.identifier().clone();
        match &self.target {
            Target::Proxy(proxy) => {
                let proxy = proxy.clone();
                ResultHandle::settle(txn_id, async move { Ok(proxy.write.cancel().await) })
            }
            Target::Failed(_) => ResultHandle::ready(txn_id, Ok(true)),
        }
    }

    pub fn commit(&self) -> ResultHandle<()> {
        let txn_id = self.identifier().clone();
        match &self.target {
            Target::Proxy(proxy) => {
                let proxy = proxy.clone();
                ResultHandle::settle(txn_id, async move { proxy.write.commit().await })
            }
            Target::Failed(failed) => ResultHandle::ready(txn_id, Err(failed.commit_failed())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureCause;
    use netmount_bus::BusError;
    use netmount_common::RemoteDeviceId;
    use std::time::Duration;

    fn unreachable_facade() -> ProxyTransactionFacade {
        let txn_id = TransactionId::new(RemoteDeviceId::new("r1"));
        let cause = FailureCause::Unreachable(BusError::EndpointNotFound("r1.master".into()));
        ProxyTransactionFacade::failed(FailedProxyTransaction::new(txn_id, cause))
    }

    #[tokio::test]
    async fn test_failed_facade_settles_immediately() {
        let facade = unreachable_facade();
        assert!(facade.is_failed());

        let mut read = facade.read(Datastore::Operational, Path::root());
        let err = read.try_take().unwrap().unwrap_err();
        assert!(err.is_unreachable());

        assert!(facade.cancel().await.unwrap());
        assert!(facade.commit().await.unwrap_err().is_unreachable());
    }

    #[tokio::test]
    async fn test_on_complete_receives_outcome() {
        let facade = unreachable_facade();
        let (tx, rx) = oneshot::channel();

        facade.exists(Datastore::Configuration, Path::root()).on_complete(move |outcome| {
            let _ = tx.send(outcome.is_err());
        });

        let failed = tokio::time::timeout(Duration::from_secs(1), rx).await.unwrap().unwrap();
        assert!(failed);
    }

    #[tokio::test]
    async fn test_dropped_work_reports_abandoned() {
        let txn_id = TransactionId::new(RemoteDeviceId::new("r1"));
        let (sender, receiver) = oneshot::channel::<Result<()>>();
        drop(sender);
        let handle = ResultHandle { txn_id, receiver };

        assert!(matches!(handle.await, Err(TransactionError::Abandoned { .. })));
    }
}
