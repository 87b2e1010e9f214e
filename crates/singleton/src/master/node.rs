//! Master session endpoint

use super::TransactionExecutor;
use super::rpc_server::RpcServer;
use crate::config::ProxyConfig;
use netmount_bus::{BusClient, Mailbox, MessageBus, ReplyTo};
use netmount_common::{RemoteDeviceId, TransactionId};
use netmount_datastore::DataBackend;
use netmount_keepalive::NormalizedRpcService;
use netmount_protocol::{
    CauseKind, MasterMessage, MasterReply, MasterRequest, RemoteCause, TxMessage, TxRequest,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Serves `<device>.master`, opening a transaction executor per request
pub struct MasterNode {
    device_id: RemoteDeviceId,
    bus: Arc<MessageBus>,

    /// Background task serving the master endpoint
    task: Mutex<Option<JoinHandle<()>>>,

    /// Background task serving `<device>.rpc`, once started
    rpc_task: Mutex<Option<JoinHandle<()>>>,

    /// Executors spawned so far
    executors: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl MasterNode {
    /// Register the master endpoint of `device_id` and start serving it
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        bus: Arc<MessageBus>,
        device_id: RemoteDeviceId,
        backend: Arc<dyn DataBackend>,
        config: ProxyConfig,
    ) -> netmount_bus::Result<Self> {
        let mailbox = bus.register(device_id.master_endpoint())?;
        let executors = Arc::new(Mutex::new(Vec::new()));

        let server = MasterServer {
            device_id: device_id.clone(),
            bus: bus.clone(),
            client: BusClient::new(device_id.master_endpoint(), bus.clone()),
            backend,
            config,
            executors: executors.clone(),
        };
        let task = tokio::spawn(server.run(mailbox));

        tracing::info!("{}: master session started", device_id);
        Ok(Self {
            device_id,
            bus,
            task: Mutex::new(Some(task)),
            rpc_task: Mutex::new(None),
            executors,
        })
    }

    /// Serve RPCs on the device session to other nodes at `<device>.rpc`
    pub fn serve_rpcs(&self, service: Arc<dyn NormalizedRpcService>) -> netmount_bus::Result<()> {
        let mailbox = self.bus.register(self.device_id.rpc_endpoint())?;
        let server = RpcServer {
            device_id: self.device_id.clone(),
            service,
        };
        let task = tokio::spawn(server.run(mailbox));
        if let Some(previous) = self.rpc_task.lock().replace(task) {
            previous.abort();
        }

        tracing::info!("{}: serving RPCs", self.device_id);
        Ok(())
    }

    pub fn device_id(&self) -> &RemoteDeviceId {
        &self.device_id
    }

    /// Number of executors still running
    pub fn active_executors(&self) -> usize {
        let mut executors = self.executors.lock();
        executors.retain(|handle| !handle.is_finished());
        executors.len()
    }

    /// Stop serving the master endpoint and every executor it opened
    pub async fn shutdown(&self) {
        self.bus.unregister(&self.device_id.master_endpoint());
        self.bus.unregister(&self.device_id.rpc_endpoint());

        let tasks = [self.task.lock().take(), self.rpc_task.lock().take()];
        for task in tasks.into_iter().flatten() {
            task.abort();
            let _ = task.await;
        }

        let executors: Vec<_> = self.executors.lock().drain(..).collect();
        for executor in executors {
            executor.abort();
            let _ = executor.await;
        }
        tracing::info!("{}: master session stopped", self.device_id);
    }
}

impl Drop for MasterNode {
    fn drop(&mut self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        if let Some(task) = self.rpc_task.lock().take() {
            task.abort();
        }
        for executor in self.executors.lock().drain(..) {
            executor.abort();
        }
    }
}

struct MasterServer {
    device_id: RemoteDeviceId,
    bus: Arc<MessageBus>,
    client: BusClient,
    backend: Arc<dyn DataBackend>,
    config: ProxyConfig,
    executors: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl MasterServer {
    async fn run(self, mut mailbox: Mailbox) {
        while let Some(mut envelope) = mailbox.recv().await {
            let Some(reply) = envelope.take_reply() else {
                tracing::debug!("{}: ignoring message without reply slot", self.device_id);
                continue;
            };

            let message = match MasterMessage::from_message(&envelope.message) {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!("{}: malformed master request: {}", self.device_id, e);
                    let failure =
                        MasterReply::Failure(RemoteCause::new(CauseKind::Unknown, e.to_string()));
                    send(&self.device_id, reply, failure);
                    continue;
                }
            };

            tracing::debug!(
                "{}: {:?} requested by {}",
                message.txn_id,
                message.request,
                envelope.from
            );
            let txn_id = message.txn_id.clone();
            let outcome = self.open(message);
            let opened = match &outcome {
                MasterReply::TransactionOpened { endpoint } => Some(endpoint.clone()),
                MasterReply::Failure(_) => None,
            };

            // The asker gave up before we answered; nobody will ever close it
            if !send(&self.device_id, reply, outcome)
                && let Some(endpoint) = opened
            {
                self.close_unclaimed(txn_id, &endpoint);
            }
        }
    }

    fn close_unclaimed(&self, txn_id: TransactionId, endpoint: &str) {
        tracing::debug!("{}: closing unclaimed executor {}", txn_id, endpoint);
        let close = TxMessage::new(txn_id.clone(), TxRequest::Close)
            .into_message()
            .map_err(|e| e.to_string())
            .and_then(|message| {
                let handle = self.client.resolve(endpoint).map_err(|e| e.to_string())?;
                self.client.tell(&handle, message).map_err(|e| e.to_string())
            });
        if let Err(e) = close {
            tracing::warn!("{}: failed to close unclaimed executor: {}", txn_id, e);
        }
    }

    fn open(&self, message: MasterMessage) -> MasterReply {
        let MasterRequest::NewTransaction { kind } = message.request;
        let endpoint = executor_endpoint(&message.txn_id);

        let mailbox = match self.bus.register(endpoint.clone()) {
            Ok(mailbox) => mailbox,
            Err(e) => {
                tracing::warn!("{}: cannot open executor: {}", message.txn_id, e);
                return MasterReply::Failure(RemoteCause::new(CauseKind::Unknown, e.to_string()));
            }
        };

        let executor = TransactionExecutor::new(message.txn_id, kind, self.backend.clone());
        let handle = executor.spawn(mailbox, self.bus.clone(), self.config.write_tx_idle_timeout);

        let mut executors = self.executors.lock();
        executors.retain(|handle| !handle.is_finished());
        executors.push(handle);

        MasterReply::TransactionOpened { endpoint }
    }
}

fn executor_endpoint(txn_id: &TransactionId) -> String {
    format!("{}.tx.{}", txn_id.device().name(), txn_id.as_uuid())
}

/// Deliver `outcome`; false if the asker is gone
fn send(device_id: &RemoteDeviceId, reply: ReplyTo, outcome: MasterReply) -> bool {
    match outcome.into_message() {
        Ok(message) => reply.send(message),
        Err(e) => {
            tracing::error!("{}: failed to encode master reply: {}", device_id, e);
            false
        }
    }
}
