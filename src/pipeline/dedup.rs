use crate::models::{EpisodeKey, Release};
use std::collections::HashSet;
use std::sync::Mutex;

/// Keeps the first release of every episode, preserving order.
#[must_use]
pub fn dedup_batch(releases: Vec<Release>) -> Vec<Release> {
    let mut seen = HashSet::new();
    releases
        .into_iter()
        .filter(|release| seen.insert(release.key()))
        .collect()
}

/// Episodes claimed by any feed task of the running cycle.
#[derive(Debug, Default)]
pub struct CycleLedger {
    claimed: Mutex<HashSet<EpisodeKey>>,
}

impl CycleLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` for the first caller with this key.
    pub fn claim(&self, key: &EpisodeKey) -> bool {
        self.claimed
            .lock()
            .map_or(false, |mut claimed| claimed.insert(key.clone()))
    }

    /// Gives a key back so a later feed may retry it after a failed emit.
    pub fn release(&self, key: &EpisodeKey) {
        if let Ok(mut claimed) = self.claimed.lock() {
            claimed.remove(key);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.claimed.lock().map_or(0, |claimed| claimed.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
