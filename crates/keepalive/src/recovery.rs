//! Session recovery

use netmount_common::RemoteDeviceId;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Tears the device session down so it reconnects
pub trait SessionRecovery: Send + Sync {
    fn reconnect(&self);
}

/// Runs recovery at most once per connected session
///
/// The first trigger reconnects; later triggers are ignored until
/// [`RecoveryGuard::reset`] is called for a fresh session.
pub struct RecoveryGuard {
    device: RemoteDeviceId,
    recovery: Arc<dyn SessionRecovery>,
    triggered: AtomicBool,
    recoveries: AtomicUsize,
}

impl RecoveryGuard {
    pub fn new(device: RemoteDeviceId, recovery: Arc<dyn SessionRecovery>) -> Self {
        Self {
            device,
            recovery,
            triggered: AtomicBool::new(false),
            recoveries: AtomicUsize::new(0),
        }
    }

    /// Reconnect unless already done for this session; true if this call did
    pub fn trigger(&self) -> bool {
        if self
            .triggered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("{}: recovery already in progress", self.device);
            return false;
        }

        tracing::info!("{}: reconnecting inactive session", self.device);
        self.recoveries.fetch_add(1, Ordering::Relaxed);
        self.recovery.reconnect();
        true
    }

    /// Arm the guard for a newly connected session
    pub fn reset(&self) {
        self.triggered.store(false, Ordering::Release);
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Reconnects performed over the guard's lifetime
    pub fn recoveries(&self) -> usize {
        self.recoveries.load(Ordering::Relaxed)
    }
}
