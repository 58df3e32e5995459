use crate::db::Store;
use crate::models::{DownloadEvent, ShowStatistics};
use anyhow::Result;
use chrono::Utc;
use tracing::warn;

/// Durable per-show download history.
#[derive(Clone)]
pub struct StatisticsRecorder {
    store: Store,
}

impl StatisticsRecorder {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Appends a download of `show_name` from `tracker`, stamped now.
    ///
    /// Failures are logged and swallowed.
    pub async fn record(&self, show_name: &str, tracker: &str) -> Option<DownloadEvent> {
        let event = DownloadEvent {
            date: Utc::now(),
            tracker: tracker.to_string(),
        };

        match self.store.append_download_event(show_name, &event).await {
            Ok(()) => Some(event),
            Err(e) => {
                warn!(
                    event = "statistics_write_failed",
                    show = %show_name,
                    error = %e,
                    "Failed to persist download event"
                );
                None
            }
        }
    }

    pub async fn for_show(&self, show_name: &str) -> Result<ShowStatistics> {
        let downloads = self.store.download_events_for(show_name).await?;
        Ok(ShowStatistics {
            name: show_name.to_string(),
            downloads,
        })
    }

    pub async fn all(&self) -> Result<Vec<ShowStatistics>> {
        self.store.all_statistics().await
    }
}
