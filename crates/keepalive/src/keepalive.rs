//! Keepalive probing of an idle device session

use crate::recovery::RecoveryGuard;
use crate::rpc::Rpcs;
use crate::timeout::{Activity, RequestTimeout};
use netmount_common::{NormalizedNode, RemoteDeviceId, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Operation sent as keepalive
pub(crate) const KEEPALIVE_RPC: &str = "get-config";

/// `get-config` of the running datastore with an empty filter
pub(crate) fn keepalive_payload() -> NormalizedNode {
    NormalizedNode::container([
        (
            "source",
            NormalizedNode::container([("running", NormalizedNode::leaf(Value::Empty))]),
        ),
        ("filter", NormalizedNode::Container(BTreeMap::new())),
    ])
}

/// Start the keepalive task
///
/// Probes the session once it has been idle for `delay`. Any answer keeps
/// the session; an empty reply or a failed keepalive recovers it and ends the
/// task.
pub(crate) fn start(
    device: RemoteDeviceId,
    rpcs: Rpcs,
    timeout: RequestTimeout,
    activity: Arc<Activity>,
    guard: Arc<RecoveryGuard>,
    delay: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::trace!("{}: scheduling keepalives every {:?}", device, delay);

        loop {
            let wait = activity.idle_in(delay);
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
                continue;
            }

            if guard.is_triggered() {
                tracing::debug!("{}: session is recovering, stopping keepalives", device);
                break;
            }

            if activity.in_flight() > 0 {
                tracing::debug!("{}: skipping keepalive while requests are in flight", device);
                tokio::time::sleep(delay).await;
                continue;
            }

            tracing::trace!("{}: invoking keepalive RPC", device);
            let request = rpcs.invoke_netconf(KEEPALIVE_RPC, keepalive_payload());
            match timeout.schedule(request).await {
                Ok(result) if result.value.is_some() => {}
                Ok(result) if !result.errors.is_empty() => {
                    // An rpc-error is still an answer from the device
                    tracing::warn!("{}: keepalive RPC failed with error: {:?}", device, result.errors);
                }
                Ok(_) => {
                    tracing::warn!("{}: keepalive RPC returned an empty reply, reconnecting session", device);
                    guard.trigger();
                    break;
                }
                // Already logged and recovered
                Err(_) => break,
            }
        }
    })
}
