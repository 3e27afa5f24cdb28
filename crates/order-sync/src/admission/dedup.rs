//! Idempotency-key memory of one tenant desk.

use crate::model::{ComandaId, OrderId};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// What a key resolved to the first time it was seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Order(OrderId),
    Comanda(ComandaId),
}

/// Keys are remembered for `window` after the write that introduced them.
///
/// Owned by a single desk, so no locking. Expired entries are dropped lazily on lookup and in
/// bulk by [`DedupTable::purge_expired`].
#[derive(Debug)]
pub struct DedupTable {
    window: Duration,
    entries: HashMap<String, (Recorded, Instant)>,
}

impl DedupTable {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: HashMap::new(),
        }
    }

    pub fn lookup(&mut self, key: &str, now: Instant) -> Option<Recorded> {
        let expired = match self.entries.get(key) {
            Some((recorded, at)) if now.saturating_duration_since(*at) <= self.window => {
                return Some(recorded.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    pub fn record(&mut self, key: String, recorded: Recorded, now: Instant) {
        self.entries.insert(key, (recorded, now));
    }

    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let window = self.window;
        self.entries
            .retain(|_, (_, at)| now.saturating_duration_since(*at) <= window);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
