use crate::clients::feed::FeedEntry;
use crate::constants::TORRENT_EXTENSION;
use crate::models::Release;
use crate::parser::{MetadataExtractor, normalize_title};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Builds canonical releases out of raw feed entries.
#[derive(Clone)]
pub struct ReleaseNormalizer {
    extractor: Arc<dyn MetadataExtractor>,
    save_root: PathBuf,
    sort_into_subdirectories: bool,
    strip_trailing_periods: bool,
}

impl ReleaseNormalizer {
    #[must_use]
    pub fn new(
        extractor: Arc<dyn MetadataExtractor>,
        save_root: impl Into<PathBuf>,
        sort_into_subdirectories: bool,
        strip_trailing_periods: bool,
    ) -> Self {
        Self {
            extractor,
            save_root: save_root.into(),
            sort_into_subdirectories,
            strip_trailing_periods,
        }
    }

    /// Returns `None` when no title can be recovered from the entry.
    #[must_use]
    pub fn normalize(&self, entry: &FeedEntry) -> Option<Release> {
        let Some(parsed) = self.extractor.parse(&entry.title) else {
            debug!(event = "entry_unparseable", title = %entry.title, "Dropping feed entry");
            return None;
        };

        let normalized_title = normalize_title(&parsed.title);
        if normalized_title.is_empty() {
            debug!(event = "entry_unparseable", title = %entry.title, "Dropping feed entry");
            return None;
        }

        let save_path = self.save_path_for(&parsed.title, &normalized_title);

        Some(Release {
            raw_title: entry.title.clone(),
            file_base_name: file_base_name(&entry.title),
            title: parsed.title,
            normalized_title,
            season: parsed.season,
            episode: parsed.episode,
            resolution: parsed.resolution,
            source: parsed.source,
            proper: parsed.proper,
            repack: parsed.repack,
            categories: entry.categories.iter().cloned().collect(),
            source_link: entry.link.clone(),
            save_path,
            published_at: entry.published_at,
        })
    }

    /// Normalizes a whole feed, oldest entry first.
    ///
    /// Feeds list newest first, so undated entries keep reversed delivery
    /// order and go before every dated one.
    #[must_use]
    pub fn normalize_feed(&self, entries: &[FeedEntry]) -> Vec<Release> {
        let mut releases: Vec<Release> = entries
            .iter()
            .rev()
            .filter_map(|entry| self.normalize(entry))
            .collect();

        // Stable: equal timestamps keep reversed delivery order.
        releases.sort_by_key(|release| release.published_at);
        releases
    }

    fn save_path_for(&self, title: &str, normalized_title: &str) -> PathBuf {
        let path = if self.sort_into_subdirectories {
            self.save_root.join(directory_segment(title, normalized_title))
        } else {
            self.save_root.clone()
        };

        if self.strip_trailing_periods {
            strip_trailing_illegal(&path)
        } else {
            path
        }
    }
}

/// Show directory name under the save root. Never contains a separator.
fn directory_segment(title: &str, normalized_title: &str) -> String {
    let segment: String = title
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let segment = segment.split_whitespace().collect::<Vec<_>>().join(" ");

    if segment.chars().all(|c| c == '.') {
        normalized_title.to_string()
    } else {
        segment
    }
}

/// Release title turned into a single path segment ending in `.torrent`.
///
/// Every whitespace or separator character becomes one `.`.
#[must_use]
pub fn file_base_name(raw_title: &str) -> String {
    let mut name: String = raw_title
        .chars()
        .map(|c| {
            if c.is_whitespace() || c == '/' || c == '\\' {
                '.'
            } else {
                c
            }
        })
        .collect();

    name.push('.');
    name.push_str(TORRENT_EXTENSION);
    name
}

fn strip_trailing_illegal(path: &std::path::Path) -> PathBuf {
    path.components()
        .map(|component| {
            let part = component.as_os_str().to_string_lossy();
            let trimmed = part.trim_end_matches(['.', ' ']);
            // Keep `.`/`..` and root components intact.
            if trimmed.is_empty() || !matches!(component, std::path::Component::Normal(_)) {
                component.as_os_str().to_os_string()
            } else {
                std::ffi::OsString::from(trimmed)
            }
        })
        .collect()
}
