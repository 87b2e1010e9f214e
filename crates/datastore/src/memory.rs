//! In-memory data backend

use crate::{BackendError, DataBackend, ReadSession, Result, WriteSession};
use async_trait::async_trait;
use netmount_common::{Datastore, LocatedNode, NormalizedNode, Path};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

/// Operation observed by the backend, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    Put { store: Datastore, path: Path },
    Merge { store: Datastore, path: Path },
    Delete { store: Datastore, path: Path },
    Commit,
    Cancel,
}

#[derive(Debug, Clone)]
enum WriteOp {
    Put(Datastore, LocatedNode),
    Merge(Datastore, LocatedNode),
    Delete(Datastore, Path),
}

#[derive(Default)]
struct Faults {
    read_failure: Option<String>,
    commit_failure: Option<String>,
    read_delay: Option<Duration>,
    commit_delay: Option<Duration>,
}

struct Shared {
    trees: RwLock<HashMap<Datastore, NormalizedNode>>,
    journal: Mutex<Vec<JournalEntry>>,
    faults: Mutex<Faults>,
}

impl Shared {
    fn record(&self, entry: JournalEntry) {
        self.journal.lock().push(entry);
    }
}

/// Backend keeping both datastores in memory
#[derive(Clone)]
pub struct InMemoryBackend {
    shared: Arc<Shared>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                trees: RwLock::new(HashMap::new()),
                journal: Mutex::new(Vec::new()),
                faults: Mutex::new(Faults::default()),
            }),
        }
    }

    /// Operations seen so far, in arrival order
    pub fn journal(&self) -> Vec<JournalEntry> {
        self.shared.journal.lock().clone()
    }

    /// Make every read fail with `message` (or stop failing with `None`)
    pub fn fail_reads(&self, message: Option<&str>) {
        self.shared.faults.lock().read_failure = message.map(str::to_string);
    }

    /// Make every commit fail with `message` (or stop failing with `None`)
    pub fn fail_commits(&self, message: Option<&str>) {
        self.shared.faults.lock().commit_failure = message.map(str::to_string);
    }

    /// Delay every read, simulating a slow device
    pub fn delay_reads(&self, delay: Option<Duration>) {
        self.shared.faults.lock().read_delay = delay;
    }

    /// Delay every commit, simulating a slow device
    pub fn delay_commits(&self, delay: Option<Duration>) {
        self.shared.faults.lock().commit_delay = delay;
    }

    /// Read committed data directly, bypassing sessions
    pub fn snapshot(&self, store: Datastore, path: &Path) -> Option<NormalizedNode> {
        let trees = self.shared.trees.read();
        trees
            .get(&store)
            .and_then(|root| lookup(root, path.segments()))
            .filter(|node| !is_empty_container(node))
            .cloned()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DataBackend for InMemoryBackend {
    fn open_read(&self) -> Result<Arc<dyn ReadSession>> {
        Ok(Arc::new(MemoryReadSession {
            shared: self.shared.clone(),
        }))
    }

    fn open_write(&self) -> Result<Box<dyn WriteSession>> {
        Ok(Box::new(MemoryWriteSession {
            shared: self.shared.clone(),
            buffered: Vec::new(),
            open: true,
        }))
    }
}

struct MemoryReadSession {
    shared: Arc<Shared>,
}

impl MemoryReadSession {
    async fn check_faults(&self) -> Result<()> {
        let (delay, failure) = {
            let faults = self.shared.faults.lock();
            (faults.read_delay, faults.read_failure.clone())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(message) => Err(BackendError::ReadFailed(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ReadSession for MemoryReadSession {
    async fn read(&self, store: Datastore, path: &Path) -> Result<Option<NormalizedNode>> {
        self.check_faults().await?;
        let trees = self.shared.trees.read();
        Ok(trees
            .get(&store)
            .and_then(|root| lookup(root, path.segments()))
            .filter(|node| !is_empty_container(node))
            .cloned())
    }

    async fn exists(&self, store: Datastore, path: &Path) -> Result<bool> {
        Ok(self.read(store, path).await?.is_some())
    }
}

struct MemoryWriteSession {
    shared: Arc<Shared>,
    buffered: Vec<WriteOp>,
    open: bool,
}

#[async_trait]
impl WriteSession for MemoryWriteSession {
    fn put(&mut self, store: Datastore, payload: LocatedNode) {
        self.shared.record(JournalEntry::Put {
            store,
            path: payload.path.clone(),
        });
        if self.open {
            self.buffered.push(WriteOp::Put(store, payload));
        }
    }

    fn merge(&mut self, store: Datastore, payload: LocatedNode) {
        self.shared.record(JournalEntry::Merge {
            store,
            path: payload.path.clone(),
        });
        if self.open {
            self.buffered.push(WriteOp::Merge(store, payload));
        }
    }

    fn delete(&mut self, store: Datastore, path: Path) {
        self.shared.record(JournalEntry::Delete {
            store,
            path: path.clone(),
        });
        if self.open {
            self.buffered.push(WriteOp::Delete(store, path));
        }
    }

    fn cancel(&mut self) -> bool {
        if !self.open {
            return false;
        }
        self.open = false;
        self.buffered.clear();
        self.shared.record(JournalEntry::Cancel);
        true
    }

    async fn commit(&mut self) -> Result<()> {
        if !self.open {
            return Err(BackendError::SessionClosed);
        }
        self.open = false;
        self.shared.record(JournalEntry::Commit);

        let (delay, failure) = {
            let faults = self.shared.faults.lock();
            (faults.commit_delay, faults.commit_failure.clone())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = failure {
            tracing::debug!("failing commit of {} buffered ops: {}", self.buffered.len(), message);
            self.buffered.clear();
            return Err(BackendError::CommitFailed(message));
        }
        tracing::trace!("applying {} buffered ops", self.buffered.len());

        let mut trees = self.shared.trees.write();
        for op in self.buffered.drain(..) {
            match op {
                WriteOp::Put(store, payload) => {
                    let root = trees.entry(store).or_insert_with(empty_container);
                    store_at(root, payload.path.segments(), payload.node, false);
                }
                WriteOp::Merge(store, payload) => {
                    let root = trees.entry(store).or_insert_with(empty_container);
                    store_at(root, payload.path.segments(), payload.node, true);
                }
                WriteOp::Delete(store, path) => {
                    if let Some(root) = trees.get_mut(&store) {
                        remove_at(root, path.segments());
                    }
                }
            }
        }
        Ok(())
    }
}

fn empty_container() -> NormalizedNode {
    NormalizedNode::Container(BTreeMap::new())
}

fn is_empty_container(node: &NormalizedNode) -> bool {
    matches!(node, NormalizedNode::Container(children) if children.is_empty())
}

fn lookup<'a>(node: &'a NormalizedNode, segments: &[String]) -> Option<&'a NormalizedNode> {
    match segments.split_first() {
        None => Some(node),
        Some((first, rest)) => lookup(node.child(first)?, rest),
    }
}

fn store_at(node: &mut NormalizedNode, segments: &[String], value: NormalizedNode, merge: bool) {
    let Some((first, rest)) = segments.split_first() else {
        let current = std::mem::replace(node, empty_container());
        *node = if merge { current.merge(value) } else { value };
        return;
    };

    if !matches!(node, NormalizedNode::Container(_)) {
        *node = empty_container();
    }
    if let NormalizedNode::Container(children) = node {
        let child = children.entry(first.clone()).or_insert_with(empty_container);
        store_at(child, rest, value, merge);
    }
}

fn remove_at(node: &mut NormalizedNode, segments: &[String]) {
    match segments {
        [] => *node = empty_container(),
        [last] => {
            if let NormalizedNode::Container(children) = node {
                children.remove(last);
            }
        }
        [first, rest @ ..] => {
            if let NormalizedNode::Container(children) = node
                && let Some(child) = children.get_mut(first)
            {
                remove_at(child, rest);
            }
        }
    }
}
