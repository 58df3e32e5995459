//! Notification events emitted by the watchlist, feed cycle and completion hook.

use crate::domain::CycleId;
use serde::Serialize;

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum NotificationEvent {
    ShowsAdded {
        names: Vec<String>,
        /// Where the request came from (CLI, config import, restore).
        source: Option<String>,
    },
    ShowRemoved {
        name: String,
    },
    ShowRestored {
        name: String,
    },

    CycleStarted {
        cycle_id: CycleId,
        feeds: usize,
    },
    CycleFinished {
        cycle_id: CycleId,
        emitted: usize,
        failed_feeds: usize,
    },

    DownloadQueued {
        show: String,
        title: String,
        tracker: String,
    },

    TransferCopied {
        show: String,
        release: String,
        destination: String,
    },
    TransferCopyFailed {
        release: String,
        error: String,
    },
}

impl NotificationEvent {
    /// One-line human summary used by the log sink.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::ShowsAdded { names, source } => match source {
                Some(source) => format!("Added {} from {source}", names.join(", ")),
                None => format!("Added {}", names.join(", ")),
            },
            Self::ShowRemoved { name } => format!("Removed {name}"),
            Self::ShowRestored { name } => format!("Restored {name}"),
            Self::CycleStarted { feeds, .. } => format!("Checking {feeds} feeds"),
            Self::CycleFinished {
                emitted,
                failed_feeds,
                ..
            } => format!("Cycle done: {emitted} downloads, {failed_feeds} failed feeds"),
            Self::DownloadQueued { title, tracker, .. } => format!("Queued {title} from {tracker}"),
            Self::TransferCopied {
                release,
                destination,
                ..
            } => format!("Copied {release} to {destination}"),
            Self::TransferCopyFailed { release, error } => {
                format!("Copy of {release} failed: {error}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_tagged() {
        let event = NotificationEvent::ShowRemoved {
            name: "show a".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ShowRemoved");
        assert_eq!(json["payload"]["name"], "show a");
    }

    #[test]
    fn test_summary_cites_source() {
        let event = NotificationEvent::ShowsAdded {
            names: vec!["show a".to_string()],
            source: Some("cli".to_string()),
        };
        assert_eq!(event.summary(), "Added show a from cli");
    }
}
