//! Common types for mounted devices
//!
//! This crate defines:
//! - Transaction identifiers (UUIDv7-based, scoped to a device)
//! - Remote device identifiers
//! - Datastore selectors and hierarchical paths into a device data tree
//! - Immutable payload nodes and located values

mod datastore;
mod device_id;
mod node;
mod path;
mod transaction_id;

pub use datastore::Datastore;
pub use device_id::RemoteDeviceId;
pub use node::{LocatedNode, NormalizedNode, Value};
pub use path::{Path, PathError};
pub use transaction_id::TransactionId;
