//! Keeping a session consistent with the shared remote store: push for organisers, pull for
//! viewers, debounced batched writes, idle disconnect and reconnect.

mod engine;
mod lease;
pub mod path;
mod store;
mod timer;

pub use engine::{create_tournament, SessionHandle, SessionView, SyncEngine, SyncMode};
pub use lease::Leases;
pub use store::{MemoryStore, RemoteStore, StoreError, Subscription};
pub use timer::{Deadline, Ticker};
