/// Extensions stripped from local file names before title parsing.
pub const KNOWN_EXTENSIONS: &[&str] = &[
    "torrent", "mkv", "mp4", "avi", "webm", "mov", "wmv", "flv", "m4v", "ts", "nfo", "srt",
];

/// Extension appended to every release's file base name.
pub const TORRENT_EXTENSION: &str = "torrent";

/// Tracker restriction that accepts every feed.
pub const ANY_TRACKER: &str = "*";

/// Category marking non-English releases on most trackers.
pub const FOREIGN_CATEGORY: &str = "Foreign";

pub mod limits {
    pub const RECENT_DOWNLOADS_CAPACITY: usize = 20;

    pub const DEFAULT_HISTORY_LIMIT: usize = 10;
}

pub mod intervals {
    use std::time::Duration;

    pub const COMPLETION_POLL: Duration = Duration::from_secs(60);
}
