//! Request timeout, session recovery and keepalives for a mounted device
//!
//! Every RPC issued against the device session is bounded by a deadline.
//! A call that fails or misses its deadline tears the session down so it
//! can reconnect; recovery runs once no matter how many calls fail
//! together. While the session is idle a keepalive RPC checks it.

mod config;
mod error;
mod facade;
mod keepalive;
mod recovery;
mod rpc;
mod timeout;

pub use config::KeepaliveConfig;
pub use error::{Result, RpcError};
pub use facade::{KeepaliveFacade, RemoteDeviceHandler};
pub use recovery::{RecoveryGuard, SessionRecovery};
pub use rpc::{NormalizedRpcService, RpcResult, Rpcs, SchemalessRpcService};
pub use timeout::RequestTimeout;
