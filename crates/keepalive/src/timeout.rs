//! Request deadlines and session activity

use crate::error::{Result, RpcError};
use crate::recovery::RecoveryGuard;
use netmount_common::RemoteDeviceId;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Traffic seen on a device session
#[derive(Debug)]
pub(crate) struct Activity {
    in_flight: AtomicUsize,
    last: Mutex<Instant>,
}

impl Activity {
    pub(crate) fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            last: Mutex::new(Instant::now()),
        }
    }

    pub(crate) fn record(&self) {
        *self.last.lock() = Instant::now();
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Time left before the session counts as idle for `delay`
    pub(crate) fn idle_in(&self, delay: Duration) -> Duration {
        delay.saturating_sub(self.last.lock().elapsed())
    }

    fn begin(self: &Arc<Self>) -> InFlight {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        InFlight {
            activity: self.clone(),
        }
    }
}

/// One outstanding request; settling it counts as activity
struct InFlight {
    activity: Arc<Activity>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.activity.record();
        self.activity.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Bounds single-shot requests with a deadline and recovers the session
/// when one fails
#[derive(Clone)]
pub struct RequestTimeout {
    device: RemoteDeviceId,
    timeout: Duration,
    guard: Arc<RecoveryGuard>,
    activity: Arc<Activity>,
}

impl RequestTimeout {
    pub fn new(device: RemoteDeviceId, timeout: Duration, guard: Arc<RecoveryGuard>) -> Self {
        Self::with_activity(device, timeout, guard, Arc::new(Activity::new()))
    }

    pub(crate) fn with_activity(
        device: RemoteDeviceId,
        timeout: Duration,
        guard: Arc<RecoveryGuard>,
        activity: Arc<Activity>,
    ) -> Self {
        Self {
            device,
            timeout,
            guard,
            activity,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Await `call` for at most the configured timeout
    ///
    /// A call still pending at the deadline is dropped. A failure or a
    /// timeout triggers recovery before being returned to the caller.
    pub async fn schedule<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let _in_flight = self.activity.begin();

        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!("{}: RPC failure detected, reconnecting session: {}", self.device, e);
                self.guard.trigger();
                Err(e)
            }
            Err(_) => {
                tracing::warn!(
                    "{}: RPC timed out after {:?}, reconnecting session",
                    self.device,
                    self.timeout
                );
                self.guard.trigger();
                Err(RpcError::TimedOut {
                    device: self.device.clone(),
                    timeout: self.timeout,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recovery::SessionRecovery;

    struct Counter(AtomicUsize);

    impl SessionRecovery for Counter {
        fn reconnect(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn request_timeout(timeout: Duration) -> (RequestTimeout, Arc<Counter>) {
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let device = RemoteDeviceId::new("r1");
        let guard = Arc::new(RecoveryGuard::new(device.clone(), counter.clone()));
        (RequestTimeout::new(device, timeout, guard), counter)
    }

    #[tokio::test]
    async fn test_success_is_forwarded() {
        let (timeout, counter) = request_timeout(Duration::from_secs(1));

        let value = timeout.schedule(async { Ok(42) }).await.unwrap();
        assert_eq!(value, 42);
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
        assert_eq!(timeout.activity.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_deadline_drops_pending_call() {
        let (timeout, counter) = request_timeout(Duration::from_millis(50));

        let err = timeout
            .schedule(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_propagated_unchanged() {
        let (timeout, counter) = request_timeout(Duration::from_secs(1));

        let err = timeout
            .schedule(async { Err::<(), _>(RpcError::Failed("session dropped".into())) })
            .await
            .unwrap_err();

        assert!(matches!(err, RpcError::Failed(ref msg) if msg == "session dropped"));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_in_flight_tracked() {
        let (timeout, _) = request_timeout(Duration::from_secs(1));
        let (release, wait) = tokio::sync::oneshot::channel::<()>();

        let pending = {
            let timeout = timeout.clone();
            tokio::spawn(async move {
                timeout
                    .schedule(async move {
                        let _ = wait.await;
                        Ok(())
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(timeout.activity.in_flight(), 1);

        release.send(()).unwrap();
        pending.await.unwrap().unwrap();
        assert_eq!(timeout.activity.in_flight(), 0);
    }
}
