use crate::models::{Release, Show};
use crate::parser::tracker_allows;
use std::collections::{HashMap, HashSet};

/// Snapshot of the watchlist and recent downloads taken at the start of a
/// feed's pass.
#[derive(Debug, Clone)]
pub struct WatchlistMatcher {
    shows: HashMap<String, Show>,
    recent: HashSet<String>,
    feed_domain: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched,
    RecentlyDownloaded,
    NotWatched,
    TrackerMismatch,
}

impl WatchlistMatcher {
    #[must_use]
    pub fn new(
        shows: impl IntoIterator<Item = Show>,
        recent: impl IntoIterator<Item = String>,
        feed_domain: Option<String>,
    ) -> Self {
        Self {
            shows: shows.into_iter().map(|s| (s.name.clone(), s)).collect(),
            recent: recent.into_iter().collect(),
            feed_domain,
        }
    }

    #[must_use]
    pub fn feed_domain(&self) -> Option<&str> {
        self.feed_domain.as_deref()
    }

    #[must_use]
    pub fn check(&self, release: &Release) -> MatchOutcome {
        if self.recent.contains(&release.file_base_name) {
            return MatchOutcome::RecentlyDownloaded;
        }

        let Some(show) = self.shows.get(&release.normalized_title) else {
            return MatchOutcome::NotWatched;
        };

        if tracker_allows(&show.tracker, self.feed_domain.as_deref()) {
            MatchOutcome::Matched
        } else {
            MatchOutcome::TrackerMismatch
        }
    }

    #[must_use]
    pub fn matches(&self, release: &Release) -> bool {
        self.check(release) == MatchOutcome::Matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::release;

    fn show(name: &str, tracker: &str) -> Show {
        Show {
            tracker: tracker.to_string(),
            ..Show::new(name)
        }
    }

    #[test]
    fn test_matches_watched_show_on_any_tracker() {
        let matcher = WatchlistMatcher::new([show("Show A", "*")], [], Some("tracker".into()));
        assert!(matcher.matches(&release("Show.A.S02E05.1080p.WEB")));
    }

    #[test]
    fn test_unwatched_title() {
        let matcher = WatchlistMatcher::new([show("Show A", "*")], [], Some("tracker".into()));
        assert_eq!(
            matcher.check(&release("Show.B.S01E01.1080p.WEB")),
            MatchOutcome::NotWatched
        );
    }

    #[test]
    fn test_tracker_restriction() {
        let matcher =
            WatchlistMatcher::new([show("Show A", "Other")], [], Some("tracker".into()));
        assert_eq!(
            matcher.check(&release("Show.A.S02E05.1080p.WEB")),
            MatchOutcome::TrackerMismatch
        );

        let matcher =
            WatchlistMatcher::new([show("Show A", "TRACKER")], [], Some("tracker".into()));
        assert!(matcher.matches(&release("Show.A.S02E05.1080p.WEB")));
    }

    #[test]
    fn test_recent_download_suppressed() {
        let candidate = release("Show.A.S02E05.1080p.WEB");
        let matcher = WatchlistMatcher::new(
            [show("Show A", "*")],
            [candidate.file_base_name.clone()],
            None,
        );
        assert_eq!(matcher.check(&candidate), MatchOutcome::RecentlyDownloaded);
    }
}
