//! Transactions against a mounted remote device from any cluster node
//!
//! One node holds the live device session and runs a [`MasterNode`]. It
//! opens a [`TransactionExecutor`] per transaction. Every other node reaches
//! the device through a [`ProxyDataBroker`], whose proxy transactions send
//! each operation to the executor over the bus and translate the reply, or
//! its absence, into a result. RPCs reach the device the same way through a
//! [`ProxyRpcService`].

pub mod broker;
pub mod config;
pub mod error;
pub mod master;
pub mod rpc;
pub mod tx;

pub use broker::ProxyDataBroker;
pub use config::ProxyConfig;
pub use error::{FailureCause, Result, TransactionError};
pub use master::{MasterNode, TransactionExecutor};
pub use rpc::ProxyRpcService;
pub use tx::{
    FailedProxyTransaction, ProxyReadTransaction, ProxyReadWriteTransaction,
    ProxyTransactionFacade, ProxyWriteTransaction, ReadTransaction, ReadWriteTransaction,
    ResultHandle, TransactionHandle, WriteTransaction,
};
