//! Serves RPCs proxied from other nodes

use netmount_bus::{Mailbox, ReplyTo};
use netmount_common::RemoteDeviceId;
use netmount_keepalive::NormalizedRpcService;
use netmount_protocol::{CauseKind, RemoteCause, RpcMessage, RpcReply};
use std::sync::Arc;

/// Invokes each request on the device session and answers with its outcome
pub(super) struct RpcServer {
    pub(super) device_id: RemoteDeviceId,
    pub(super) service: Arc<dyn NormalizedRpcService>,
}

impl RpcServer {
    pub(super) async fn run(self, mut mailbox: Mailbox) {
        while let Some(mut envelope) = mailbox.recv().await {
            let Some(reply) = envelope.take_reply() else {
                tracing::debug!("{}: ignoring RPC without reply slot", self.device_id);
                continue;
            };

            let request = match RpcMessage::from_message(&envelope.message) {
                Ok(request) => request,
                Err(e) => {
                    tracing::warn!("{}: malformed RPC request: {}", self.device_id, e);
                    let failure =
                        RpcReply::Failure(RemoteCause::new(CauseKind::Unknown, e.to_string()));
                    send(&self.device_id, reply, failure);
                    continue;
                }
            };

            tracing::debug!(
                "{}: RPC {} requested by {}",
                self.device_id,
                request.name,
                envelope.from
            );

            // Device calls may be slow; keep serving while one is in flight
            let device_id = self.device_id.clone();
            let service = self.service.clone();
            tokio::spawn(async move {
                let outcome = match service.invoke_rpc(&request.name, request.input).await {
                    Ok(result) => RpcReply::Output {
                        value: result.value,
                        errors: result.errors,
                    },
                    Err(e) => {
                        tracing::warn!("{}: RPC {} failed: {}", device_id, request.name, e);
                        RpcReply::Failure(RemoteCause::backend(e.to_string()))
                    }
                };
                if !send(&device_id, reply, outcome) {
                    tracing::debug!("{}: RPC {} answered too late", device_id, request.name);
                }
            });
        }
    }
}

fn send(device_id: &RemoteDeviceId, reply: ReplyTo, outcome: RpcReply) -> bool {
    match outcome.into_message() {
        Ok(message) => reply.send(message),
        Err(e) => {
            tracing::error!("{}: failed to encode RPC reply: {}", device_id, e);
            false
        }
    }
}
