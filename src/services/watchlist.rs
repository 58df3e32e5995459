//! Tracked and removed shows.
//!
//! The in-memory lists are authoritative. Every mutation is persisted through a
//! [`WatchlistPersistence`]; write failures are logged and never undo the
//! change.

use crate::config::Config;
use crate::db::Store;
use crate::domain::events::NotificationEvent;
use crate::models::{Show, ShowSummary};
use crate::parser::normalize_title;
use crate::services::notify::NotificationSink;
use crate::services::statistics::StatisticsRecorder;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WatchlistError {
    #[error("show name is empty")]
    EmptyName,

    #[error("'{0}' is already watched")]
    AlreadyWatched(String),

    #[error("'{0}' was removed; restore it instead")]
    AlreadyRemoved(String),

    #[error("'{0}' appears more than once in the request")]
    DuplicateInRequest(String),

    #[error("'{0}' is not in the removed list")]
    NotRemoved(String),
}

#[async_trait]
pub trait WatchlistPersistence: Send + Sync {
    async fn save_watched(&self, shows: &[Show]) -> Result<()>;

    async fn upsert_removed(&self, show: &Show) -> Result<()>;

    async fn delete_removed(&self, name: &str) -> Result<()>;
}

/// Watched shows go to the config file, removed shows to the database.
pub struct StorePersistence {
    store: Store,
    config: Mutex<Config>,
    config_path: PathBuf,
}

impl StorePersistence {
    #[must_use]
    pub fn new(store: Store, config: Config, config_path: PathBuf) -> Self {
        Self {
            store,
            config: Mutex::new(config),
            config_path,
        }
    }
}

#[async_trait]
impl WatchlistPersistence for StorePersistence {
    async fn save_watched(&self, shows: &[Show]) -> Result<()> {
        let mut config = self.config.lock().await;
        config.shows = shows.to_vec();

        let snapshot = config.clone();
        let path = self.config_path.clone();
        tokio::task::spawn_blocking(move || snapshot.save_to_path(&path)).await??;
        Ok(())
    }

    async fn upsert_removed(&self, show: &Show) -> Result<()> {
        self.store.upsert_removed_show(show).await
    }

    async fn delete_removed(&self, name: &str) -> Result<()> {
        self.store.delete_removed_show(name).await.map(|_| ())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Watchlist {
    pub watched: Vec<Show>,
    pub removed: Vec<Show>,
}

impl Watchlist {
    fn is_watched(&self, name: &str) -> bool {
        self.watched.iter().any(|s| s.name == name)
    }

    fn is_removed(&self, name: &str) -> bool {
        self.removed.iter().any(|s| s.name == name)
    }
}

#[derive(Debug, Default)]
pub struct AddOutcome {
    pub added: Vec<Show>,
    pub rejected: Vec<(String, WatchlistError)>,
}

pub struct WatchlistManager {
    state: RwLock<Watchlist>,
    persistence: Arc<dyn WatchlistPersistence>,
    statistics: StatisticsRecorder,
    notifier: Arc<dyn NotificationSink>,
}

impl WatchlistManager {
    /// Builds the manager from the configured watched shows and the
    /// persisted removed list. Shows present in both stay removed.
    #[must_use]
    pub fn new(
        watched: Vec<Show>,
        removed: Vec<Show>,
        persistence: Arc<dyn WatchlistPersistence>,
        statistics: StatisticsRecorder,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let removed: Vec<Show> = removed.into_iter().map(Show::normalized).collect();
        let removed_names: HashSet<String> = removed.iter().map(|s| s.name.clone()).collect();

        let mut seen = HashSet::new();
        let watched = watched
            .into_iter()
            .map(Show::normalized)
            .filter(|s| !s.name.is_empty())
            .filter(|s| !removed_names.contains(&s.name))
            .filter(|s| seen.insert(s.name.clone()))
            .collect();

        Self {
            state: RwLock::new(Watchlist { watched, removed }),
            persistence,
            statistics,
            notifier,
        }
    }

    pub async fn snapshot(&self) -> Watchlist {
        self.state.read().await.clone()
    }

    pub async fn watched(&self) -> Vec<Show> {
        self.state.read().await.watched.clone()
    }

    pub async fn find_watched(&self, name: &str) -> Option<Show> {
        let name = normalize_title(name);
        self.state
            .read()
            .await
            .watched
            .iter()
            .find(|s| s.name == name)
            .cloned()
    }

    pub async fn add_show_names<I, S>(&self, names: I, source: Option<&str>) -> AddOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.add_shows(names.into_iter().map(|n| Show::new(n.as_ref())), source)
            .await
    }

    /// Adds every show that is new, not removed and not repeated in the request.
    pub async fn add_shows<I>(&self, shows: I, source: Option<&str>) -> AddOutcome
    where
        I: IntoIterator<Item = Show>,
    {
        let mut state = self.state.write().await;
        let mut outcome = AddOutcome::default();
        let mut requested = HashSet::new();

        for show in shows.into_iter().map(Show::normalized) {
            let name = show.name.clone();
            let rejection = if name.is_empty() {
                Some(WatchlistError::EmptyName)
            } else if !requested.insert(name.clone()) {
                Some(WatchlistError::DuplicateInRequest(name.clone()))
            } else if state.is_watched(&name) {
                Some(WatchlistError::AlreadyWatched(name.clone()))
            } else if state.is_removed(&name) {
                Some(WatchlistError::AlreadyRemoved(name.clone()))
            } else {
                None
            };

            match rejection {
                Some(error) => outcome.rejected.push((name, error)),
                None => outcome.added.push(show),
            }
        }

        if outcome.added.is_empty() {
            return outcome;
        }

        state.watched.extend(outcome.added.iter().cloned());
        self.persist_watched(&state.watched).await;
        drop(state);

        let names: Vec<String> = outcome.added.iter().map(|s| s.name.clone()).collect();
        info!(
            event = "shows_added",
            count = names.len(),
            source = source.unwrap_or("unspecified"),
            "Added shows to watchlist"
        );
        self.notifier.notify(NotificationEvent::ShowsAdded {
            names,
            source: source.map(String::from),
        });

        outcome
    }

    /// Moves a watched show to the removed list. Returns whether it was watched.
    pub async fn remove_show(&self, name: &str) -> bool {
        let name = normalize_title(name);
        let mut state = self.state.write().await;

        let Some(pos) = state.watched.iter().position(|s| s.name == name) else {
            return false;
        };

        let show = state.watched.remove(pos);
        if !state.is_removed(&name) {
            state.removed.push(show.clone());
        }

        self.persist_watched(&state.watched).await;
        if let Err(e) = self.persistence.upsert_removed(&show).await {
            warn!(event = "watchlist_write_failed", show = %name, error = %e, "Failed to persist removed show");
        }
        drop(state);

        info!(event = "show_removed", show = %name, "Removed show from watchlist");
        self.notifier.notify(NotificationEvent::ShowRemoved { name });
        true
    }

    /// Removes each name in turn; returns how many were watched.
    pub async fn remove_shows<I, S>(&self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut removed = 0;
        for name in names {
            if self.remove_show(name.as_ref()).await {
                removed += 1;
            }
        }
        removed
    }

    /// Takes a show out of the removed list and adds it back.
    ///
    /// # Errors
    /// Fails when the show is not in the removed list.
    pub async fn restore_show(&self, name: &str) -> Result<Show, WatchlistError> {
        let name = normalize_title(name);

        let show = {
            let mut state = self.state.write().await;
            let Some(pos) = state.removed.iter().position(|s| s.name == name) else {
                return Err(WatchlistError::NotRemoved(name));
            };
            let show = state.removed.remove(pos);

            if let Err(e) = self.persistence.delete_removed(&name).await {
                warn!(event = "watchlist_write_failed", show = %name, error = %e, "Failed to persist restored show");
            }
            show
        };

        let outcome = self.add_shows([show.clone()], Some("restore")).await;
        if let Some((_, error)) = outcome.rejected.into_iter().next() {
            // Already watched again through another path; nothing left to add.
            warn!(event = "show_restore_skipped", show = %name, reason = %error, "Restore did not add show");
        }

        self.notifier.notify(NotificationEvent::ShowRestored { name });
        Ok(show)
    }

    pub async fn list_shows(&self) -> Vec<ShowSummary> {
        let shows = self.watched().await;
        self.summarize(shows).await
    }

    pub async fn list_removed_shows(&self) -> Vec<ShowSummary> {
        let shows = self.state.read().await.removed.clone();
        self.summarize(shows).await
    }

    async fn summarize(&self, shows: Vec<Show>) -> Vec<ShowSummary> {
        let mut summaries = Vec::with_capacity(shows.len());
        for show in shows {
            let downloads = match self.statistics.for_show(&show.name).await {
                Ok(stats) => stats.downloads,
                Err(e) => {
                    warn!(show = %show.name, error = %e, "Failed to load download history");
                    Vec::new()
                }
            };
            summaries.push(ShowSummary { show, downloads });
        }
        summaries
    }

    async fn persist_watched(&self, watched: &[Show]) {
        if let Err(e) = self.persistence.save_watched(watched).await {
            warn!(event = "watchlist_write_failed", error = %e, "Failed to persist watched shows");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::notify::LogNotifier;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingPersistence {
        watched: StdMutex<Vec<String>>,
        removed: StdMutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl WatchlistPersistence for RecordingPersistence {
        async fn save_watched(&self, shows: &[Show]) -> Result<()> {
            if self.fail {
                anyhow::bail!("disk full");
            }
            *self.watched.lock().unwrap() = shows.iter().map(|s| s.name.clone()).collect();
            Ok(())
        }

        async fn upsert_removed(&self, show: &Show) -> Result<()> {
            if self.fail {
                anyhow::bail!("disk full");
            }
            let mut removed = self.removed.lock().unwrap();
            if !removed.contains(&show.name) {
                removed.push(show.name.clone());
            }
            Ok(())
        }

        async fn delete_removed(&self, name: &str) -> Result<()> {
            self.removed.lock().unwrap().retain(|n| n != name);
            Ok(())
        }
    }

    async fn manager(persistence: Arc<RecordingPersistence>) -> WatchlistManager {
        let store = Store::in_memory().await.unwrap();
        WatchlistManager::new(
            vec![],
            vec![],
            persistence,
            StatisticsRecorder::new(store),
            Arc::new(LogNotifier),
        )
    }

    #[tokio::test]
    async fn test_add_rejects_empty_duplicate_and_known() {
        let persistence = Arc::new(RecordingPersistence::default());
        let manager = manager(persistence.clone()).await;

        let outcome = manager
            .add_show_names(["Show A", "  ", "show a", "Show B"], Some("cli"))
            .await;
        assert_eq!(outcome.added.len(), 2);
        assert_eq!(outcome.rejected.len(), 2);
        assert_eq!(outcome.rejected[0].1, WatchlistError::EmptyName);
        assert_eq!(
            outcome.rejected[1].1,
            WatchlistError::DuplicateInRequest("show a".to_string())
        );

        let again = manager.add_show_names(["SHOW A"], None).await;
        assert!(again.added.is_empty());
        assert_eq!(
            again.rejected[0].1,
            WatchlistError::AlreadyWatched("show a".to_string())
        );

        assert_eq!(*persistence.watched.lock().unwrap(), vec!["show a", "show b"]);
    }

    #[tokio::test]
    async fn test_add_remove_restore_cycle() {
        let persistence = Arc::new(RecordingPersistence::default());
        let manager = manager(persistence.clone()).await;

        manager.add_show_names(["X"], None).await;
        assert!(manager.remove_show("X").await);
        assert!(!manager.remove_show("X").await);

        let rejected = manager.add_show_names(["X"], None).await;
        assert_eq!(
            rejected.rejected[0].1,
            WatchlistError::AlreadyRemoved("x".to_string())
        );

        manager.restore_show("X").await.unwrap();

        let state = manager.snapshot().await;
        assert_eq!(state.watched.len(), 1);
        assert_eq!(state.watched[0].name, "x");
        assert!(state.removed.is_empty());
        assert!(persistence.removed.lock().unwrap().is_empty());
        assert_eq!(*persistence.watched.lock().unwrap(), vec!["x"]);
    }

    #[tokio::test]
    async fn test_restore_unknown_show() {
        let manager = manager(Arc::new(RecordingPersistence::default())).await;
        assert_eq!(
            manager.restore_show("nope").await,
            Err(WatchlistError::NotRemoved("nope".to_string()))
        );
    }

    #[tokio::test]
    async fn test_bulk_remove() {
        let manager = manager(Arc::new(RecordingPersistence::default())).await;
        manager.add_show_names(["A", "B", "C"], None).await;

        assert_eq!(manager.remove_shows(["a", "c", "missing"]).await, 2);

        let state = manager.snapshot().await;
        assert_eq!(state.watched.len(), 1);
        assert_eq!(state.removed.len(), 2);
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_memory() {
        let persistence = Arc::new(RecordingPersistence {
            fail: true,
            ..Default::default()
        });
        let manager = manager(persistence).await;

        assert_eq!(manager.add_show_names(["A"], None).await.added.len(), 1);
        assert!(manager.remove_show("A").await);
        assert_eq!(manager.snapshot().await.removed.len(), 1);
    }

    #[tokio::test]
    async fn test_removed_wins_over_configured() {
        let store = Store::in_memory().await.unwrap();
        let manager = WatchlistManager::new(
            vec![Show::new("A"), Show::new("B"), Show::new("b")],
            vec![Show::new("A")],
            Arc::new(RecordingPersistence::default()),
            StatisticsRecorder::new(store),
            Arc::new(LogNotifier),
        );

        let state = manager.snapshot().await;
        assert_eq!(state.watched.len(), 1);
        assert_eq!(state.watched[0].name, "b");
        assert_eq!(state.removed.len(), 1);
    }

    #[tokio::test]
    async fn test_list_shows_joins_history() {
        let store = Store::in_memory().await.unwrap();
        let statistics = StatisticsRecorder::new(store);
        statistics.record("show a", "tracker").await.unwrap();

        let manager = WatchlistManager::new(
            vec![Show::new("Show A")],
            vec![],
            Arc::new(RecordingPersistence::default()),
            statistics,
            Arc::new(LogNotifier),
        );

        let shows = manager.list_shows().await;
        assert_eq!(shows[0].downloads.len(), 1);
        assert_eq!(shows[0].downloads[0].tracker, "tracker");
        assert!(manager.list_removed_shows().await.is_empty());
    }
}
