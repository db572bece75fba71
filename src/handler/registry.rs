//! Worker registries keyed by command addressing.
//!
//! Two tables drive dispatch. Command workers serve inbound commands and are
//! keyed by `(device_id, command_id, node)`, where `node` is the source node
//! a worker is bound to and `None` is the wildcard tried when no exact match
//! exists. Response correlators complete outbound calls and are keyed by
//! `(device_id, command_id, seq)`; they live only while the call is
//! outstanding.
//!
//! Registration is exclusive per key. Removing an absent key is a no-op, so
//! cleanup paths never have to care whether a worker was already gone.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::{Result, RovercomError};
use crate::protocol::{ErrorCode, Message};

/// Boxed future returned by workers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a command worker hands back: the outcome code to report and the
/// encoded response body (empty when there is nothing to say).
pub type CommandOutcome = (ErrorCode, Bytes);

/// Async callback serving one inbound command.
pub trait CommandWorker: Send + Sync + 'static {
    /// Process a command message and produce its outcome.
    fn call(&self, msg: Message) -> BoxFuture<'static, Result<CommandOutcome>>;
}

impl<F, Fut> CommandWorker for F
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<CommandOutcome>> + Send + 'static,
{
    fn call(&self, msg: Message) -> BoxFuture<'static, Result<CommandOutcome>> {
        Box::pin((self)(msg))
    }
}

/// Async callback completing one pending outbound call.
pub trait ResponseWorker: Send + Sync + 'static {
    /// Consume the response message for the call this correlator belongs to.
    fn call(&self, msg: Message) -> BoxFuture<'static, ()>;
}

impl<F, Fut> ResponseWorker for F
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn call(&self, msg: Message) -> BoxFuture<'static, ()> {
        Box::pin((self)(msg))
    }
}

/// Key for command workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandKey {
    pub device_id: u8,
    pub command_id: u8,
    /// Source node this worker is bound to; `None` is the wildcard.
    pub node: Option<u8>,
}

impl CommandKey {
    pub fn new(device_id: u8, command_id: u8, node: Option<u8>) -> Self {
        Self {
            device_id,
            command_id,
            node,
        }
    }
}

impl fmt::Display for CommandKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "did {:#04x} cid {:#04x} node ",
            self.device_id, self.command_id
        )?;
        match self.node {
            Some(node) => write!(f, "{:#04x}", node),
            None => write!(f, "*"),
        }
    }
}

/// Key for response correlators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResponseKey {
    pub device_id: u8,
    pub command_id: u8,
    pub seq: u8,
}

impl ResponseKey {
    pub fn new(device_id: u8, command_id: u8, seq: u8) -> Self {
        Self {
            device_id,
            command_id,
            seq,
        }
    }
}

impl fmt::Display for ResponseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "did {:#04x} cid {:#04x} seq {}",
            self.device_id, self.command_id, self.seq
        )
    }
}

/// Keyed worker map with exclusive registration.
pub struct WorkerTable<K, W: ?Sized> {
    workers: Mutex<HashMap<K, Arc<W>>>,
}

impl<K, W> WorkerTable<K, W>
where
    K: Eq + Hash + Copy + fmt::Display,
    W: ?Sized,
{
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Bind a worker to `key`. Fails if the key is already bound.
    pub fn register(&self, key: K, worker: Arc<W>) -> Result<()> {
        let mut workers = self.workers.lock();
        match workers.entry(key) {
            Entry::Occupied(_) => Err(RovercomError::DuplicateWorker(key.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(worker);
                Ok(())
            }
        }
    }

    /// Unbind whatever is at `key`. Absent keys are a silent no-op.
    pub fn unregister(&self, key: K) {
        self.workers.lock().remove(&key);
    }

    /// Clone out the worker bound to `key`, if any.
    pub fn lookup(&self, key: K) -> Option<Arc<W>> {
        self.workers.lock().get(&key).cloned()
    }

    /// Number of bound workers.
    pub fn len(&self) -> usize {
        self.workers.lock().len()
    }

    /// True when no workers are bound.
    pub fn is_empty(&self) -> bool {
        self.workers.lock().is_empty()
    }
}

impl<K, W> Default for WorkerTable<K, W>
where
    K: Eq + Hash + Copy + fmt::Display,
    W: ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}
