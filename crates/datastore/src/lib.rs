//! Device data backend
//!
//! The interface the master executor drives to reach the live device
//! session, and an in-memory implementation used by tests and demos.

mod memory;

pub use memory::{InMemoryBackend, JournalEntry};

use async_trait::async_trait;
use netmount_common::{Datastore, LocatedNode, NormalizedNode, Path};
use std::sync::Arc;
use thiserror::Error;

/// Backend errors
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Commit failed: {0}")]
    CommitFailed(String),

    #[error("Write session already closed")]
    SessionClosed,

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, BackendError>;

/// Read access to the device data
#[async_trait]
pub trait ReadSession: Send + Sync {
    async fn read(&self, store: Datastore, path: &Path) -> Result<Option<NormalizedNode>>;

    async fn exists(&self, store: Datastore, path: &Path) -> Result<bool>;
}

/// Buffered write access to the device data
///
/// Mutations are only buffered; their errors surface at `commit`.
#[async_trait]
pub trait WriteSession: Send {
    fn put(&mut self, store: Datastore, payload: LocatedNode);

    fn merge(&mut self, store: Datastore, payload: LocatedNode);

    fn delete(&mut self, store: Datastore, path: Path);

    /// Discard buffered writes; false if the session was already finished
    fn cancel(&mut self) -> bool;

    async fn commit(&mut self) -> Result<()>;
}

/// Factory of read and write sessions against one device
pub trait DataBackend: Send + Sync {
    fn open_read(&self) -> Result<Arc<dyn ReadSession>>;

    fn open_write(&self) -> Result<Box<dyn WriteSession>>;
}
