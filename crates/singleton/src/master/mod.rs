//! Master side of a mounted device
//!
//! The master node holds the live device session and opens one
//! [`TransactionExecutor`] per proxy transaction. It can also serve RPCs
//! on the device session to the other nodes.

mod executor;
mod node;
mod rpc_server;

pub use executor::TransactionExecutor;
pub use node::MasterNode;
