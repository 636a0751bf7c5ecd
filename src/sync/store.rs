//! Remote document store: path-addressable get / set / update-merge / subscribe, last write
//! wins per leaf, no transactions across keys.

use crate::sync::path;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::mpsc;

/// Remote store failures. All of them are transient from the session's point of view.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum StoreError {
    #[error("Remote store unavailable")]
    Unavailable,
    #[error("Remote store rejected the request: {0}")]
    Rejected(String),
}

/// Live channel on one path. Every change at, above or below the path delivers the path's
/// full current value (`null` once deleted). Dropping the handle unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    path: String,
    receiver: mpsc::UnboundedReceiver<Value>,
}

impl Subscription {
    pub fn new(path: impl Into<String>, receiver: mpsc::UnboundedReceiver<Value>) -> Self {
        Self {
            path: path.into(),
            receiver,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Next pushed value; `None` once the store has dropped the channel.
    pub async fn recv(&mut self) -> Option<Value> {
        self.receiver.recv().await
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// Value at `path`, `None` if absent.
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Replace the value at `path` (`null` deletes it).
    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError>;

    /// Multi-path merge: each key of `patch` is a path relative to `path`, written as one batch.
    async fn update(&self, path: &str, patch: Map<String, Value>) -> Result<(), StoreError>;

    fn subscribe(&self, path: &str) -> Subscription;
}

struct Watcher {
    path: String,
    sender: mpsc::UnboundedSender<Value>,
}

struct Inner {
    root: RwLock<Value>,
    watchers: Mutex<Vec<Watcher>>,
    available: AtomicBool,
    writes: AtomicUsize,
}

/// In-process store. Cloning shares the same data, so several sessions (or the HTTP server
/// and its sessions) can talk to one store.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                root: RwLock::new(Value::Object(Map::new())),
                watchers: Mutex::new(Vec::new()),
                available: AtomicBool::new(true),
                writes: AtomicUsize::new(0),
            }),
        }
    }

    /// Simulate an outage: while unavailable every request fails with [`StoreError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    /// Successful `set` / `update` calls so far.
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Subscriptions whose handle is still alive.
    pub fn live_subscriptions(&self) -> usize {
        let mut watchers = self.inner.watchers.lock().unwrap_or_else(PoisonError::into_inner);
        watchers.retain(|w| !w.sender.is_closed());
        watchers.len()
    }

    /// Keys of the object at `path` (empty if absent or not an object).
    pub fn child_keys(&self, path: &str) -> Vec<String> {
        let root = self.inner.root.read().unwrap_or_else(PoisonError::into_inner);
        match path::get(&root, path) {
            Some(Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.inner.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }

    fn write(&self, writes: Vec<(String, Value)>) {
        let written: Vec<String> = writes.iter().map(|(p, _)| p.clone()).collect();
        {
            let mut root = self.inner.root.write().unwrap_or_else(PoisonError::into_inner);
            for (p, value) in writes {
                path::set(&mut root, &p, value);
            }
        }
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        self.notify(&written);
    }

    fn notify(&self, written: &[String]) {
        let root = self.inner.root.read().unwrap_or_else(PoisonError::into_inner);
        let mut watchers = self.inner.watchers.lock().unwrap_or_else(PoisonError::into_inner);
        watchers.retain(|w| {
            if !written.iter().any(|p| path::related(p, &w.path)) {
                return !w.sender.is_closed();
            }
            let value = path::get(&root, &w.path).cloned().unwrap_or(Value::Null);
            w.sender.send(value).is_ok()
        });
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, p: &str) -> Result<Option<Value>, StoreError> {
        self.check()?;
        let root = self.inner.root.read().unwrap_or_else(PoisonError::into_inner);
        Ok(path::get(&root, p).filter(|v| !v.is_null()).cloned())
    }

    async fn set(&self, p: &str, value: Value) -> Result<(), StoreError> {
        self.check()?;
        self.write(vec![(p.to_string(), value)]);
        Ok(())
    }

    async fn update(&self, p: &str, patch: Map<String, Value>) -> Result<(), StoreError> {
        self.check()?;
        let writes = patch
            .into_iter()
            .map(|(rel, value)| (path::join(p, &rel), value))
            .collect();
        self.write(writes);
        Ok(())
    }

    fn subscribe(&self, p: &str) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let current = {
            let root = self.inner.root.read().unwrap_or_else(PoisonError::into_inner);
            path::get(&root, p).cloned().unwrap_or(Value::Null)
        };
        let _ = sender.send(current);
        self.inner
            .watchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Watcher {
                path: p.to_string(),
                sender,
            });
        Subscription::new(p, receiver)
    }
}
