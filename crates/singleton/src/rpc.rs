//! RPCs invoked on a device from a node that does not hold its session

use async_trait::async_trait;
use netmount_bus::{BusClient, BusError};
use netmount_common::{NormalizedNode, RemoteDeviceId};
use netmount_keepalive::{NormalizedRpcService, RpcError, RpcResult};
use netmount_protocol::{RpcMessage, RpcReply};
use std::time::Duration;

/// Forwards each RPC to the master session of the device
///
/// A call the master does not answer within the ask timeout fails as
/// [`RpcError::Unreachable`]; errors raised on the master come back as
/// [`RpcError::Failed`].
pub struct ProxyRpcService {
    device_id: RemoteDeviceId,
    client: BusClient,
    ask_timeout: Duration,
}

impl ProxyRpcService {
    pub fn new(device_id: RemoteDeviceId, client: BusClient, ask_timeout: Duration) -> Self {
        Self {
            device_id,
            client,
            ask_timeout,
        }
    }

    fn unreachable(&self, e: BusError) -> RpcError {
        RpcError::Unreachable {
            device: self.device_id.clone(),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl NormalizedRpcService for ProxyRpcService {
    async fn invoke_rpc(
        &self,
        name: &str,
        input: NormalizedNode,
    ) -> netmount_keepalive::Result<RpcResult> {
        let master = self
            .client
            .resolve(&self.device_id.rpc_endpoint())
            .map_err(|e| self.unreachable(e))?;

        let request = RpcMessage::new(name, input)
            .into_message()
            .map_err(|e| RpcError::Failed(e.to_string()))?;
        let reply = self
            .client
            .ask(&master, request, self.ask_timeout)
            .await
            .map_err(|e| {
                tracing::warn!("{}: RPC {} not answered: {}", self.device_id, name, e);
                self.unreachable(e)
            })?;

        match RpcReply::from_message(&reply).map_err(|e| RpcError::Failed(e.to_string()))? {
            RpcReply::Output { value, errors } => Ok(RpcResult { value, errors }),
            RpcReply::Failure(cause) => Err(RpcError::Failed(cause.to_string())),
        }
    }
}
