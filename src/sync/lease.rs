//! Per-key edit leases. While the local user edits a key, remote values for it are held
//! back instead of overwriting the half-typed input; the latest one is handed back on release.

use serde_json::Value;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct Leases {
    held: HashSet<String>,
    queued: HashMap<String, Value>,
}

impl Leases {
    pub fn acquire(&mut self, key: impl Into<String>) {
        self.held.insert(key.into());
    }

    /// Release `key`, returning the most recent remote value that arrived while it was held.
    pub fn release(&mut self, key: &str) -> Option<Value> {
        if self.held.remove(key) {
            self.queued.remove(key)
        } else {
            None
        }
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held.contains(key)
    }

    /// Hold back a remote value for a leased key (later values replace earlier ones).
    pub fn queue(&mut self, key: &str, value: Value) {
        if self.held.contains(key) {
            self.queued.insert(key.to_string(), value);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.held.iter()
    }
}
