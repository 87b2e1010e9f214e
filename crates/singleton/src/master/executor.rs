//! Transaction executor running on the node that holds the device session

use netmount_bus::{Mailbox, MessageBus, ReplyTo};
use netmount_common::{Datastore, LocatedNode, Path, TransactionId};
use netmount_datastore::{DataBackend, ReadSession, WriteSession};
use netmount_protocol::{
    CauseKind, RemoteCause, TransactionKind, TxMessage, TxReply, TxRequest,
};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Executes the requests of one transaction against the real backend
///
/// Requests are handled one at a time in arrival order, so the write session
/// is never touched by two operations at once. Reads and commits run on
/// their own tasks and reply when the backend completes.
pub struct TransactionExecutor {
    txn_id: TransactionId,
    kind: TransactionKind,
    backend: Arc<dyn DataBackend>,

    /// Lazily opened on the first read
    read_session: Option<Arc<dyn ReadSession>>,

    /// Opened on the first mutation, discarded by submit and cancel
    write_session: Option<Box<dyn WriteSession>>,

    /// Failure opening a write session, reported at submit
    deferred_failure: Option<RemoteCause>,
}

impl TransactionExecutor {
    pub fn new(txn_id: TransactionId, kind: TransactionKind, backend: Arc<dyn DataBackend>) -> Self {
        Self {
            txn_id,
            kind,
            backend,
            read_session: None,
            write_session: None,
            deferred_failure: None,
        }
    }

    /// Serve `mailbox` until the transaction is closed, every proxy handle
    /// is gone, or the idle timeout expires
    pub fn spawn(
        self,
        mailbox: Mailbox,
        bus: Arc<MessageBus>,
        idle_timeout: Option<Duration>,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(mailbox, bus, idle_timeout))
    }

    async fn run(mut self, mut mailbox: Mailbox, bus: Arc<MessageBus>, idle_timeout: Option<Duration>) {
        tracing::debug!("{}: {:?} executor started on {}", self.txn_id, self.kind, mailbox.name());

        loop {
            let next = match idle_timeout {
                Some(idle) => match tokio::time::timeout(idle, mailbox.recv()).await {
                    Ok(next) => next,
                    Err(_) => {
                        tracing::warn!(
                            "{}: no message for {:?}, cancelling transaction",
                            self.txn_id,
                            idle
                        );
                        break;
                    }
                },
                None => mailbox.recv().await,
            };

            let Some(mut envelope) = next else {
                break;
            };
            let reply = envelope.take_reply();

            let request = match TxMessage::from_message(&envelope.message) {
                Ok(message) => message.request,
                Err(e) => {
                    tracing::warn!("{}: dropping malformed request: {}", self.txn_id, e);
                    if let Some(reply) = reply {
                        respond(
                            &self.txn_id,
                            reply,
                            TxReply::Failure(RemoteCause::new(CauseKind::Unknown, e.to_string())),
                        );
                    }
                    continue;
                }
            };

            if self.handle(request, reply).is_break() {
                break;
            }
        }

        if let Some(mut session) = self.write_session.take() {
            session.cancel();
        }
        bus.unregister(mailbox.name());
        tracing::debug!("{}: executor stopped", self.txn_id);
    }

    fn handle(&mut self, request: TxRequest, reply: Option<ReplyTo>) -> ControlFlow<()> {
        tracing::trace!("{}: handling {}", self.txn_id, request.kind());
        if request.expects_reply() && reply.is_none() {
            tracing::debug!("{}: {} arrived without a reply slot", self.txn_id, request.kind());
        }

        if let Some(refusal) = self.refusal(&request) {
            tracing::warn!("{}: {}", self.txn_id, refusal.message);
            if let Some(reply) = reply {
                respond(&self.txn_id, reply, TxReply::Failure(refusal));
            }
            return ControlFlow::Continue(());
        }

        match request {
            TxRequest::Read { store, path } => self.read(store, path, reply),
            TxRequest::Exists { store, path } => self.exists(store, path, reply),
            TxRequest::Put { store, payload } => self.put(store, payload),
            TxRequest::Merge { store, payload } => self.merge(store, payload),
            TxRequest::Delete { store, path } => self.delete(store, path),
            TxRequest::Submit => self.submit(reply),
            TxRequest::Cancel => {
                let cancelled = self.cancel();
                if let Some(reply) = reply {
                    respond(&self.txn_id, reply, TxReply::Ack(cancelled));
                }
            }
            TxRequest::Close => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Requests outside this transaction's capability set
    fn refusal(&self, request: &TxRequest) -> Option<RemoteCause> {
        let allowed = match request {
            TxRequest::Read { .. } | TxRequest::Exists { .. } => {
                self.kind != TransactionKind::WriteOnly
            }
            TxRequest::Close => true,
            _ => self.kind != TransactionKind::ReadOnly,
        };
        (!allowed).then(|| {
            RemoteCause::new(
                CauseKind::Unsupported,
                format!("{} not supported by {:?} transaction", request.kind(), self.kind),
            )
        })
    }

    fn read_session(&mut self) -> Result<Arc<dyn ReadSession>, RemoteCause> {
        if let Some(session) = &self.read_session {
            return Ok(session.clone());
        }
        let session = self
            .backend
            .open_read()
            .map_err(|e| RemoteCause::backend(e.to_string()))?;
        self.read_session = Some(session.clone());
        Ok(session)
    }

    fn write_session(&mut self) -> Option<&mut Box<dyn WriteSession>> {
        if self.write_session.is_none() {
            match self.backend.open_write() {
                Ok(session) => self.write_session = Some(session),
                Err(e) => {
                    tracing::warn!("{}: failed to open write session: {}", self.txn_id, e);
                    self.deferred_failure = Some(RemoteCause::backend(e.to_string()));
                }
            }
        }
        self.write_session.as_mut()
    }

    fn read(&mut self, store: Datastore, path: Path, reply: Option<ReplyTo>) {
        let Some(reply) = reply else {
            return;
        };
        let session = match self.read_session() {
            Ok(session) => session,
            Err(cause) => return respond(&self.txn_id, reply, TxReply::Failure(cause)),
        };

        let txn_id = self.txn_id.clone();
        tokio::spawn(async move {
            let outcome = match session.read(store, &path).await {
                Ok(Some(node)) => TxReply::Value(node),
                Ok(None) => TxReply::EmptyRead,
                Err(e) => TxReply::Failure(RemoteCause::backend(e.to_string())),
            };
            respond(&txn_id, reply, outcome);
        });
    }

    fn exists(&mut self, store: Datastore, path: Path, reply: Option<ReplyTo>) {
        let Some(reply) = reply else {
            return;
        };
        let session = match self.read_session() {
            Ok(session) => session,
            Err(cause) => return respond(&self.txn_id, reply, TxReply::Failure(cause)),
        };

        let txn_id = self.txn_id.clone();
        tokio::spawn(async move {
            let outcome = match session.exists(store, &path).await {
                Ok(found) => TxReply::BoolResult(found),
                Err(e) => TxReply::Failure(RemoteCause::backend(e.to_string())),
            };
            respond(&txn_id, reply, outcome);
        });
    }

    fn put(&mut self, store: Datastore, payload: LocatedNode) {
        if let Some(session) = self.write_session() {
            session.put(store, payload);
        }
    }

    fn merge(&mut self, store: Datastore, payload: LocatedNode) {
        if let Some(session) = self.write_session() {
            session.merge(store, payload);
        }
    }

    fn delete(&mut self, store: Datastore, path: Path) {
        if let Some(session) = self.write_session() {
            session.delete(store, path);
        }
    }

    fn cancel(&mut self) -> bool {
        self.deferred_failure = None;
        match self.write_session.take() {
            Some(mut session) => session.cancel(),
            // Nothing buffered, nothing to undo
            None => true,
        }
    }

    fn submit(&mut self, reply: Option<ReplyTo>) {
        if let Some(cause) = self.deferred_failure.take() {
            self.write_session = None;
            if let Some(reply) = reply {
                respond(&self.txn_id, reply, TxReply::SubmitFailed(cause));
            }
            return;
        }

        let session = match self.write_session.take() {
            Some(session) => Ok(session),
            None => self.backend.open_write(),
        };

        let txn_id = self.txn_id.clone();
        tokio::spawn(async move {
            let outcome = match session {
                Ok(mut session) => match session.commit().await {
                    Ok(()) => TxReply::Ack(true),
                    Err(e) => {
                        tracing::warn!("{}: commit failed: {}", txn_id, e);
                        TxReply::SubmitFailed(RemoteCause::backend(e.to_string()))
                    }
                },
                Err(e) => TxReply::SubmitFailed(RemoteCause::backend(e.to_string())),
            };
            if let Some(reply) = reply {
                respond(&txn_id, reply, outcome);
            }
        });
    }
}

fn respond(txn_id: &TransactionId, reply: ReplyTo, outcome: TxReply) {
    let kind = outcome.kind();
    match outcome.into_message() {
        Ok(message) => {
            if !reply.send(message) {
                tracing::debug!("{}: {} reply dropped, asker gave up", txn_id, kind);
            }
        }
        Err(e) => tracing::error!("{}: failed to encode {} reply: {}", txn_id, kind, e),
    }
}
