//! Entry point for transactions against a mounted device

use crate::config::ProxyConfig;
use crate::error::FailureCause;
use crate::rpc::ProxyRpcService;
use crate::tx::{
    Dispatcher, FailedProxyTransaction, ProxyReadAdapter, ProxyReadTransaction,
    ProxyReadWriteTransaction, ProxyTransactionFacade, ProxyWriteAdapter, ProxyWriteTransaction,
    ReadTransaction, ReadWriteTransaction, WriteTransaction,
};
use netmount_bus::BusClient;
use netmount_common::{RemoteDeviceId, TransactionId};
use netmount_keepalive::Rpcs;
use netmount_protocol::{MasterMessage, MasterReply, MasterRequest, TransactionKind};
use std::sync::Arc;

/// Opens proxy transactions against the master session of one device
///
/// A transaction that cannot be opened is still returned, as a
/// [`FailedProxyTransaction`] carrying the reason.
pub struct ProxyDataBroker {
    device_id: RemoteDeviceId,
    client: BusClient,
    config: ProxyConfig,
}

impl ProxyDataBroker {
    pub fn new(device_id: RemoteDeviceId, client: BusClient, config: ProxyConfig) -> Self {
        Self {
            device_id,
            client,
            config,
        }
    }

    pub fn device_id(&self) -> &RemoteDeviceId {
        &self.device_id
    }

    pub async fn new_read_only_transaction(&self) -> Box<dyn ReadTransaction> {
        let txn_id = TransactionId::new(self.device_id.clone());
        match self.open(&txn_id, TransactionKind::ReadOnly).await {
            Ok(dispatcher) => Box::new(ProxyReadTransaction::new(ProxyReadAdapter::new(dispatcher))),
            Err(cause) => Box::new(FailedProxyTransaction::new(txn_id, cause)),
        }
    }

    pub async fn new_write_only_transaction(&self) -> Box<dyn WriteTransaction> {
        let txn_id = TransactionId::new(self.device_id.clone());
        match self.open(&txn_id, TransactionKind::WriteOnly).await {
            Ok(dispatcher) => {
                Box::new(ProxyWriteTransaction::new(ProxyWriteAdapter::new(dispatcher)))
            }
            Err(cause) => Box::new(FailedProxyTransaction::new(txn_id, cause)),
        }
    }

    pub async fn new_read_write_transaction(&self) -> Box<dyn ReadWriteTransaction> {
        let txn_id = TransactionId::new(self.device_id.clone());
        match self.open(&txn_id, TransactionKind::ReadWrite).await {
            Ok(dispatcher) => Box::new(ProxyReadWriteTransaction::new(
                ProxyReadAdapter::new(dispatcher.clone()),
                ProxyWriteAdapter::new(dispatcher),
            )),
            Err(cause) => Box::new(FailedProxyTransaction::new(txn_id, cause)),
        }
    }

    /// Open a read-write transaction exposed through the callback-style facade
    pub async fn new_facade(&self) -> ProxyTransactionFacade {
        let txn_id = TransactionId::new(self.device_id.clone());
        match self.open(&txn_id, TransactionKind::ReadWrite).await {
            Ok(dispatcher) => ProxyTransactionFacade::proxy(
                ProxyReadAdapter::new(dispatcher.clone()),
                ProxyWriteAdapter::new(dispatcher),
            ),
            Err(cause) => {
                ProxyTransactionFacade::failed(FailedProxyTransaction::new(txn_id, cause))
            }
        }
    }

    /// RPCs of the device, forwarded to its master session
    pub fn rpcs(&self) -> Rpcs {
        Rpcs::Normalized(Arc::new(ProxyRpcService::new(
            self.device_id.clone(),
            self.client.clone(),
            self.config.ask_timeout,
        )))
    }

    /// Ask the master for an executor and resolve its handle
    async fn open(
        &self,
        txn_id: &TransactionId,
        kind: TransactionKind,
    ) -> Result<Dispatcher, FailureCause> {
        let master = self.client.resolve(&self.device_id.master_endpoint())?;

        let request = MasterMessage::new(txn_id.clone(), MasterRequest::NewTransaction { kind });
        let reply = self
            .client
            .ask(&master, request.into_message()?, self.config.ask_timeout)
            .await?;

        match MasterReply::from_message(&reply)? {
            MasterReply::TransactionOpened { endpoint } => {
                let handle = self.client.resolve(&endpoint)?;
                tracing::debug!("{}: {:?} transaction opened on {}", txn_id, kind, endpoint);
                Ok(Dispatcher::new(
                    txn_id.clone(),
                    self.client.clone(),
                    handle,
                    self.config.ask_timeout,
                ))
            }
            MasterReply::Failure(cause) => Err(cause.into()),
        }
    }
}
