use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::SystemTime;

/// One candidate episode offered by a feed during a cycle.
///
/// Built once by the normalizer and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Title exactly as the feed delivered it.
    pub raw_title: String,

    /// Show title as parsed, original casing.
    pub title: String,

    pub normalized_title: String,

    pub season: Option<u32>,

    pub episode: Option<u32>,

    pub resolution: Option<String>,

    pub source: Option<String>,

    pub proper: bool,

    pub repack: bool,

    pub categories: BTreeSet<String>,

    pub file_base_name: String,

    pub source_link: String,

    pub save_path: PathBuf,

    pub published_at: Option<DateTime<Utc>>,
}

impl Release {
    #[must_use]
    pub fn key(&self) -> EpisodeKey {
        EpisodeKey {
            title: self.normalized_title.clone(),
            season: self.season,
            episode: self.episode,
        }
    }

    /// Full path the downloaded `.torrent` lands at.
    #[must_use]
    pub fn target_path(&self) -> PathBuf {
        self.save_path.join(&self.file_base_name)
    }

    #[must_use]
    pub fn is_pack(&self) -> bool {
        self.episode.is_none()
    }
}

/// Identity of an episode across feeds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EpisodeKey {
    pub title: String,

    pub season: Option<u32>,

    pub episode: Option<u32>,
}

/// A file already present in a show's save directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileRecord {
    pub file_name: String,

    pub normalized_title: String,

    pub season: Option<u32>,

    pub episode: Option<u32>,

    pub source: Option<String>,

    pub proper: bool,

    pub repack: bool,

    pub modified_at: SystemTime,
}
