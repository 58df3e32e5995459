use crate::constants::limits::RECENT_DOWNLOADS_CAPACITY;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Most-recent-first file names queued in the last few cycles.
#[derive(Debug)]
pub struct RecentDownloads {
    names: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl Default for RecentDownloads {
    fn default() -> Self {
        Self::with_capacity(RECENT_DOWNLOADS_CAPACITY)
    }
}

impl RecentDownloads {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            names: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Puts a batch in front, in emission order, and drops the overflow.
    ///
    /// The last name of the batch ends up first.
    pub fn record<I>(&self, batch: I)
    where
        I: IntoIterator<Item = String>,
    {
        let Ok(mut names) = self.names.lock() else {
            return;
        };

        for name in batch {
            names.push_front(name);
        }
        names.truncate(self.capacity);
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.names
            .lock()
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names
            .lock()
            .is_ok_and(|names| names.iter().any(|n| n == name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.lock().map_or(0, |names| names.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
