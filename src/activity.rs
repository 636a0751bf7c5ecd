//! Last-access times per tournament, for removing documents nobody uses any more.

use crate::models::TournamentId;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Default)]
pub struct ActivityLog {
    last: HashMap<TournamentId, Instant>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an access to `id` now.
    pub fn touch(&mut self, id: TournamentId) {
        self.last.insert(id, Instant::now());
    }

    /// Remove and return every id not touched for at least `timeout`.
    pub fn take_expired(&mut self, timeout: Duration) -> Vec<TournamentId> {
        let expired: Vec<TournamentId> = self
            .last
            .iter()
            .filter(|(_, at)| at.elapsed() >= timeout)
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            self.last.remove(id);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}
