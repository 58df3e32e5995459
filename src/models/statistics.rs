use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadEvent {
    pub date: DateTime<Utc>,

    pub tracker: String,
}

/// Download history of one show, oldest event first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowStatistics {
    pub name: String,

    pub downloads: Vec<DownloadEvent>,
}

impl ShowStatistics {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            downloads: Vec::new(),
        }
    }

    pub fn add(&mut self, event: DownloadEvent) {
        self.downloads.push(event);
    }

    #[must_use]
    pub fn last_download(&self) -> Option<&DownloadEvent> {
        self.downloads.last()
    }
}
