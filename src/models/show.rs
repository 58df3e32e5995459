use crate::constants::ANY_TRACKER;
use crate::models::statistics::DownloadEvent;
use crate::parser::normalize_title;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Show {
    pub name: String,

    /// Where completed downloads for this show get copied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_destination: Option<PathBuf>,

    /// Reduced tracker domain (`tracker` for `tracker.org`) or `*` for any.
    #[serde(default = "default_tracker")]
    pub tracker: String,
}

fn default_tracker() -> String {
    ANY_TRACKER.to_string()
}

impl Show {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: normalize_title(name),
            copy_destination: None,
            tracker: default_tracker(),
        }
    }

    /// Same show with its name in canonical form.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.name = normalize_title(&self.name);
        if self.tracker.trim().is_empty() {
            self.tracker = default_tracker();
        }
        self
    }
}

/// A show joined with its download history, as listed to callers.
#[derive(Debug, Clone, Serialize)]
pub struct ShowSummary {
    #[serde(flatten)]
    pub show: Show,

    pub downloads: Vec<DownloadEvent>,
}
