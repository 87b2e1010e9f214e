//! Request timeouts, recovery and keepalives against a scripted device

use async_trait::async_trait;
use futures::future::join_all;
use netmount_common::{NormalizedNode, RemoteDeviceId};
use netmount_keepalive::{
    KeepaliveConfig, KeepaliveFacade, NormalizedRpcService, RemoteDeviceHandler, RpcError,
    RpcResult, Rpcs, SchemalessRpcService, SessionRecovery,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
enum Behavior {
    Reply,
    Empty,
    RpcErrors,
    Fail,
    Hang,
}

/// Device answering every RPC according to its current behavior
struct ScriptedDevice {
    behavior: Mutex<Behavior>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedDevice {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(behavior),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn set(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    fn calls_to(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == name).count()
    }

    async fn answer(&self, name: &str) -> Result<RpcResult, RpcError> {
        self.calls.lock().unwrap().push(name.to_string());
        if name == "slow" {
            tokio::time::sleep(Duration::from_millis(300)).await;
            return Ok(RpcResult::with_value(NormalizedNode::leaf("done")));
        }

        let behavior = *self.behavior.lock().unwrap();
        match behavior {
            Behavior::Reply => Ok(RpcResult::with_value(NormalizedNode::leaf(name))),
            Behavior::Empty => Ok(RpcResult::default()),
            Behavior::RpcErrors => Ok(RpcResult::with_errors(vec!["access-denied".into()])),
            Behavior::Fail => Err(RpcError::Failed("session dropped".into())),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(RpcResult::default())
            }
        }
    }
}

#[async_trait]
impl NormalizedRpcService for ScriptedDevice {
    async fn invoke_rpc(&self, name: &str, _input: NormalizedNode) -> Result<RpcResult, RpcError> {
        self.answer(name).await
    }
}

#[async_trait]
impl SchemalessRpcService for ScriptedDevice {
    async fn invoke_netconf(
        &self,
        name: &str,
        _input: NormalizedNode,
    ) -> Result<RpcResult, RpcError> {
        self.answer(name).await
    }

    async fn invoke_rpc(&self, name: &str, input: String) -> Result<String, RpcError> {
        self.answer(name).await?;
        Ok(format!("<{name}>{input}</{name}>"))
    }
}

#[derive(Default)]
struct Reconnects(AtomicUsize);

impl Reconnects {
    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl SessionRecovery for Reconnects {
    fn reconnect(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Downstream {
    rpcs: Mutex<Option<Rpcs>>,
    disconnected: AtomicBool,
    notifications: AtomicUsize,
}

impl Downstream {
    fn rpcs(&self) -> Rpcs {
        self.rpcs.lock().unwrap().clone().unwrap()
    }
}

impl RemoteDeviceHandler for Downstream {
    fn on_device_connected(&self, rpcs: Rpcs) {
        *self.rpcs.lock().unwrap() = Some(rpcs);
    }

    fn on_device_disconnected(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }

    fn on_notification(&self, _notification: NormalizedNode) {
        self.notifications.fetch_add(1, Ordering::SeqCst);
    }
}

struct Session {
    device: Arc<ScriptedDevice>,
    reconnects: Arc<Reconnects>,
    downstream: Arc<Downstream>,
    facade: KeepaliveFacade,
}

fn session(behavior: Behavior, config: KeepaliveConfig, schemaless: bool) -> Session {
    let device = ScriptedDevice::new(behavior);
    let reconnects = Arc::new(Reconnects::default());
    let downstream = Arc::new(Downstream::default());
    let facade = KeepaliveFacade::new(
        RemoteDeviceId::new("router-1"),
        downstream.clone(),
        reconnects.clone(),
        config,
    );

    let rpcs = if schemaless {
        Rpcs::Schemaless(device.clone())
    } else {
        Rpcs::Normalized(device.clone())
    };
    facade.on_device_connected(rpcs);

    Session {
        device,
        reconnects,
        downstream,
        facade,
    }
}

fn short_timeout() -> KeepaliveConfig {
    KeepaliveConfig::default().with_request_timeout(Duration::from_millis(50))
}

async fn invoke(rpcs: &Rpcs, name: &str) -> Result<RpcResult, RpcError> {
    match rpcs {
        Rpcs::Normalized(service) => service.invoke_rpc(name, NormalizedNode::leaf(true)).await,
        Rpcs::Schemaless(service) => {
            service.invoke_netconf(name, NormalizedNode::leaf(true)).await
        }
    }
}

#[tokio::test]
async fn test_success_forwarded_without_recovery() {
    let session = session(Behavior::Reply, short_timeout(), false);

    let result = invoke(&session.downstream.rpcs(), "get-interfaces")
        .await
        .unwrap();
    assert_eq!(result.value, Some(NormalizedNode::leaf("get-interfaces")));
    assert_eq!(session.reconnects.count(), 0);
}

#[tokio::test]
async fn test_timeout_recovers_session() {
    let session = session(Behavior::Hang, short_timeout(), false);

    let err = invoke(&session.downstream.rpcs(), "get-interfaces")
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(session.reconnects.count(), 1);
    assert!(session.facade.recovery_guard().is_triggered());
}

#[tokio::test]
async fn test_concurrent_timeouts_recover_once() {
    let session = session(Behavior::Hang, short_timeout(), false);
    let rpcs = session.downstream.rpcs();

    let outcomes = join_all((0..10).map(|i| {
        let rpcs = rpcs.clone();
        async move { invoke(&rpcs, &format!("rpc-{i}")).await }
    }))
    .await;

    assert!(outcomes.iter().all(|o| matches!(o, Err(e) if e.is_timeout())));
    assert_eq!(session.reconnects.count(), 1);
}

#[tokio::test]
async fn test_failure_propagated_and_recovers() {
    let session = session(Behavior::Fail, short_timeout(), false);

    let err = invoke(&session.downstream.rpcs(), "edit-config")
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::Failed(ref msg) if msg == "session dropped"));
    assert_eq!(session.reconnects.count(), 1);
}

#[tokio::test]
async fn test_rpc_errors_are_an_answer() {
    let session = session(Behavior::RpcErrors, short_timeout(), false);

    let result = invoke(&session.downstream.rpcs(), "edit-config")
        .await
        .unwrap();
    assert_eq!(result.errors, vec!["access-denied".to_string()]);
    assert_eq!(session.reconnects.count(), 0);
}

#[tokio::test]
async fn test_schemaless_variant_preserved() {
    let session = session(Behavior::Reply, short_timeout(), true);

    let rpcs = session.downstream.rpcs();
    assert!(rpcs.is_schemaless());

    let Rpcs::Schemaless(service) = &rpcs else {
        panic!("expected schemaless rpcs");
    };
    let reply = service
        .invoke_rpc("lock", "<running/>".to_string())
        .await
        .unwrap();
    assert_eq!(reply, "<lock><running/></lock>");

    session.device.set(Behavior::Hang);
    assert!(service
        .invoke_rpc("lock", String::new())
        .await
        .unwrap_err()
        .is_timeout());
    assert_eq!(session.reconnects.count(), 1);
}

#[tokio::test]
async fn test_reconnected_session_recovers_again() {
    let session = session(Behavior::Hang, short_timeout(), false);

    assert!(invoke(&session.downstream.rpcs(), "a").await.is_err());
    assert!(invoke(&session.downstream.rpcs(), "b").await.is_err());
    assert_eq!(session.reconnects.count(), 1);

    session.facade.on_device_disconnected();
    session
        .facade
        .on_device_connected(Rpcs::Normalized(session.device.clone()));

    assert!(invoke(&session.downstream.rpcs(), "c").await.is_err());
    assert_eq!(session.reconnects.count(), 2);
}

#[tokio::test]
async fn test_keepalive_checks_idle_session() {
    let config = short_timeout().with_keepalive_delay(Duration::from_millis(50));
    let session = session(Behavior::Reply, config, false);

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(session.device.calls_to("get-config") >= 2);
    assert_eq!(session.reconnects.count(), 0);
    assert!(session.facade.keepalive_active());
}

#[tokio::test]
async fn test_empty_keepalive_reply_reconnects() {
    let config = short_timeout().with_keepalive_delay(Duration::from_millis(50));
    let session = session(Behavior::Empty, config, true);

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(session.device.calls_to("get-config"), 1);
    assert_eq!(session.reconnects.count(), 1);
    assert!(!session.facade.keepalive_active());
}

#[tokio::test]
async fn test_keepalive_rpc_error_keeps_session() {
    let config = short_timeout().with_keepalive_delay(Duration::from_millis(50));
    let session = session(Behavior::RpcErrors, config, false);

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(session.device.calls_to("get-config") >= 1);
    assert_eq!(session.reconnects.count(), 0);
    assert!(session.facade.keepalive_active());
}

#[tokio::test]
async fn test_keepalive_timeout_reconnects() {
    let config = short_timeout().with_keepalive_delay(Duration::from_millis(50));
    let session = session(Behavior::Hang, config, false);

    tokio::time::sleep(Duration::from_millis(250)).await;

    assert_eq!(session.device.calls_to("get-config"), 1);
    assert_eq!(session.reconnects.count(), 1);
}

#[tokio::test]
async fn test_in_flight_requests_suppress_keepalive() {
    let config = KeepaliveConfig::default()
        .with_request_timeout(Duration::from_secs(1))
        .with_keepalive_delay(Duration::from_millis(50));
    let session = session(Behavior::Reply, config, false);
    let rpcs = session.downstream.rpcs();

    let slow = tokio::spawn(async move { invoke(&rpcs, "slow").await });
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(session.device.calls_to("get-config"), 0);

    slow.await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(session.device.calls_to("get-config") >= 1);
}

#[tokio::test]
async fn test_disconnect_stops_keepalives() {
    let config = short_timeout().with_keepalive_delay(Duration::from_millis(50));
    let session = session(Behavior::Reply, config, false);

    session.facade.on_device_disconnected();
    assert!(session.downstream.disconnected.load(Ordering::SeqCst));

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(session.device.calls_to("get-config"), 0);
    assert!(!session.facade.keepalive_active());
}

#[tokio::test]
async fn test_notifications_count_as_activity() {
    let config = short_timeout().with_keepalive_delay(Duration::from_millis(100));
    let session = session(Behavior::Reply, config, false);

    for _ in 0..4 {
        tokio::time::sleep(Duration::from_millis(40)).await;
        session.facade.on_notification(NormalizedNode::leaf("link-up"));
    }

    assert_eq!(session.device.calls_to("get-config"), 0);
    assert_eq!(session.downstream.notifications.load(Ordering::SeqCst), 4);
}
