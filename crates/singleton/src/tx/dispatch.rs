//! Request dispatch to a transaction executor

use crate::error::FailureCause;
use netmount_bus::{BusClient, BusError, ExecutorHandle};
use netmount_common::TransactionId;
use netmount_protocol::{TxMessage, TxReply, TxRequest};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Sends the requests of one transaction to its executor
///
/// Clones share one executor handle. The executor is told to close when the
/// last clone goes away, unless [`Dispatcher::release`] already did.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    txn_id: TransactionId,
    client: BusClient,
    handle: ExecutorHandle,
    ask_timeout: Duration,
    released: AtomicBool,
}

impl Dispatcher {
    pub(crate) fn new(
        txn_id: TransactionId,
        client: BusClient,
        handle: ExecutorHandle,
        ask_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                txn_id,
                client,
                handle,
                ask_timeout,
                released: AtomicBool::new(false),
            }),
        }
    }

    pub(crate) fn txn_id(&self) -> &TransactionId {
        &self.inner.txn_id
    }

    /// Send `request` and wait up to the ask timeout for its reply
    pub(crate) async fn ask(&self, request: TxRequest) -> Result<TxReply, FailureCause> {
        let inner = &self.inner;
        let kind = request.kind();
        let message = TxMessage::new(inner.txn_id.clone(), request).into_message()?;

        let reply = inner
            .client
            .ask(&inner.handle, message, inner.ask_timeout)
            .await
            .map_err(|e| {
                tracing::warn!("{}: {} to {} failed: {}", inner.txn_id, kind, inner.handle.name(), e);
                FailureCause::from(e)
            })?;

        Ok(TxReply::from_message(&reply)?)
    }

    /// Send `request` without waiting
    pub(crate) fn tell(&self, request: TxRequest) {
        self.inner.tell(request);
    }

    /// Tell the executor the transaction is finished with
    pub(crate) fn release(&self) {
        self.inner.release();
    }
}

impl Inner {
    // Delivery failures only get logged; they resurface at commit
    fn tell(&self, request: TxRequest) {
        let kind = request.kind();
        let result = TxMessage::new(self.txn_id.clone(), request)
            .into_message()
            .map_err(FailureCause::from)
            .and_then(|message| {
                self.client
                    .tell(&self.handle, message)
                    .map_err(FailureCause::from)
            });

        match result {
            Ok(()) => {}
            Err(FailureCause::Unreachable(BusError::ChannelClosed(endpoint))) => {
                tracing::debug!("{}: {} not delivered, {} is gone", self.txn_id, kind, endpoint);
            }
            Err(e) => {
                tracing::warn!("{}: {} to {} not delivered: {}", self.txn_id, kind, self.handle.name(), e);
            }
        }
    }

    fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            self.tell(TxRequest::Close);
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.release();
    }
}
