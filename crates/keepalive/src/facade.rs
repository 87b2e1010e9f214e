//! Device session handler adding keepalives and request timeouts

use crate::config::KeepaliveConfig;
use crate::error::RpcError;
use crate::keepalive;
use crate::recovery::{RecoveryGuard, SessionRecovery};
use crate::rpc::{self, Rpcs};
use crate::timeout::{Activity, RequestTimeout};
use netmount_common::{NormalizedNode, RemoteDeviceId};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Receives the lifecycle of a device session
pub trait RemoteDeviceHandler: Send + Sync {
    /// The session is up and `rpcs` can be invoked
    fn on_device_connected(&self, rpcs: Rpcs);

    fn on_device_disconnected(&self);

    fn on_device_failed(&self, _error: &RpcError) {}

    fn on_notification(&self, _notification: NormalizedNode) {}

    fn close(&self) {}
}

/// Handler decorator that bounds every RPC of a session with the request
/// timeout, reconnects the session on failure, and sends keepalives while
/// it is idle
///
/// Callbacks must be delivered from within a tokio runtime.
pub struct KeepaliveFacade {
    device: RemoteDeviceId,
    config: KeepaliveConfig,
    downstream: Arc<dyn RemoteDeviceHandler>,
    guard: Arc<RecoveryGuard>,
    activity: Arc<Activity>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl KeepaliveFacade {
    pub fn new(
        device: RemoteDeviceId,
        downstream: Arc<dyn RemoteDeviceHandler>,
        recovery: Arc<dyn SessionRecovery>,
        config: KeepaliveConfig,
    ) -> Self {
        let guard = Arc::new(RecoveryGuard::new(device.clone(), recovery));
        Self {
            device,
            config,
            downstream,
            guard,
            activity: Arc::new(Activity::new()),
            task: Mutex::new(None),
        }
    }

    pub fn device(&self) -> &RemoteDeviceId {
        &self.device
    }

    pub fn recovery_guard(&self) -> &Arc<RecoveryGuard> {
        &self.guard
    }

    /// True while a keepalive task is running
    pub fn keepalive_active(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    fn request_timeout(&self) -> RequestTimeout {
        RequestTimeout::with_activity(
            self.device.clone(),
            self.config.request_timeout,
            self.guard.clone(),
            self.activity.clone(),
        )
    }

    fn stop_keepalives(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

impl RemoteDeviceHandler for KeepaliveFacade {
    fn on_device_connected(&self, rpcs: Rpcs) {
        self.stop_keepalives();
        self.guard.reset();
        self.activity.record();

        let timeout = self.request_timeout();
        self.downstream
            .on_device_connected(rpc::decorate(&rpcs, timeout.clone()));

        tracing::debug!("{}: session initiated, starting keepalives", self.device);
        let task = keepalive::start(
            self.device.clone(),
            rpcs,
            timeout,
            self.activity.clone(),
            self.guard.clone(),
            self.config.keepalive_delay,
        );
        *self.task.lock() = Some(task);
    }

    fn on_device_disconnected(&self) {
        self.stop_keepalives();
        self.downstream.on_device_disconnected();
    }

    fn on_device_failed(&self, error: &RpcError) {
        self.stop_keepalives();
        self.downstream.on_device_failed(error);
    }

    fn on_notification(&self, notification: NormalizedNode) {
        self.activity.record();
        self.downstream.on_notification(notification);
    }

    fn close(&self) {
        self.stop_keepalives();
        self.downstream.close();
    }
}

impl Drop for KeepaliveFacade {
    fn drop(&mut self) {
        self.stop_keepalives();
    }
}
