//! End-to-end reconciliation cycles against fake feeds and a temp library.

use async_trait::async_trait;
use showfeed::clients::feed::{FeedEntry, FeedError, FeedSource};
use showfeed::config::LocalFileOrder;
use showfeed::db::Store;
use showfeed::models::{Release, Show};
use showfeed::parser::{MetadataExtractor, SceneParser};
use showfeed::pipeline::{LocalFs, LocalStateReconciler, QualityFilter, ReleaseNormalizer};
use showfeed::services::{
    CycleComponents, CycleRunner, DownloadEmitter, EmitError, FeedCycleService, LogNotifier,
    RecentDownloads, StatisticsRecorder, WatchlistManager, WatchlistPersistence,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

struct StaticFeeds {
    feeds: HashMap<String, Option<Vec<FeedEntry>>>,
}

impl StaticFeeds {
    fn new() -> Self {
        Self {
            feeds: HashMap::new(),
        }
    }

    fn with(mut self, url: &str, titles: &[&str]) -> Self {
        let entries = titles
            .iter()
            .map(|title| FeedEntry {
                title: (*title).to_string(),
                link: format!("{url}/download/{}", title.replace(' ', ".")),
                published_at: None,
                categories: vec!["TV".to_string()],
            })
            .collect();
        self.feeds.insert(url.to_string(), Some(entries));
        self
    }

    fn broken(mut self, url: &str) -> Self {
        self.feeds.insert(url.to_string(), None);
        self
    }

    fn urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.feeds.keys().cloned().collect();
        urls.sort();
        urls
    }
}

#[async_trait]
impl FeedSource for StaticFeeds {
    async fn fetch(&self, url: &str) -> Result<Vec<FeedEntry>, FeedError> {
        match self.feeds.get(url) {
            Some(Some(entries)) => Ok(entries.clone()),
            _ => Err(FeedError::Parse(format!("no feed at {url}"))),
        }
    }
}

#[derive(Default)]
struct RecordingEmitter {
    emitted: Mutex<Vec<Release>>,
}

impl RecordingEmitter {
    fn titles(&self) -> Vec<String> {
        self.emitted
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.raw_title.clone())
            .collect()
    }
}

#[async_trait]
impl DownloadEmitter for RecordingEmitter {
    async fn emit(&self, release: &Release) -> Result<(), EmitError> {
        self.emitted.lock().unwrap().push(release.clone());
        Ok(())
    }
}

struct NoPersistence;

#[async_trait]
impl WatchlistPersistence for NoPersistence {
    async fn save_watched(&self, _shows: &[Show]) -> anyhow::Result<()> {
        Ok(())
    }

    async fn upsert_removed(&self, _show: &Show) -> anyhow::Result<()> {
        Ok(())
    }

    async fn delete_removed(&self, _name: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

struct Harness {
    cycle: FeedCycleService,
    emitter: Arc<RecordingEmitter>,
    statistics: StatisticsRecorder,
    recent: Arc<RecentDownloads>,
    root: PathBuf,
}

struct Options {
    allow_upgrade: bool,
    skip_packs: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            allow_upgrade: true,
            skip_packs: true,
        }
    }
}

async fn harness(feeds: StaticFeeds, shows: &[&str], options: Options) -> Harness {
    let root = std::env::temp_dir().join(format!("showfeed-cycle-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&root).unwrap();

    let store = Store::in_memory().await.unwrap();
    let statistics = StatisticsRecorder::new(store);
    let notifier = Arc::new(LogNotifier);
    let watchlist = Arc::new(WatchlistManager::new(
        shows.iter().map(|name| Show::new(name)).collect(),
        vec![],
        Arc::new(NoPersistence),
        statistics.clone(),
        notifier.clone(),
    ));

    let extractor: Arc<dyn MetadataExtractor> = Arc::new(SceneParser);
    let emitter = Arc::new(RecordingEmitter::default());
    let recent = Arc::new(RecentDownloads::default());

    let cycle = FeedCycleService::new(CycleComponents {
        feeds: feeds.urls(),
        source: Arc::new(feeds),
        normalizer: ReleaseNormalizer::new(extractor.clone(), &root, true, false),
        quality: QualityFilter::new("1080p", "", true, options.skip_packs),
        reconciler: LocalStateReconciler::new(
            Arc::new(LocalFs),
            extractor,
            LocalFileOrder::Modified,
            options.allow_upgrade,
        ),
        watchlist,
        recent: recent.clone(),
        statistics: statistics.clone(),
        emitter: emitter.clone(),
        notifier,
    });

    Harness {
        cycle,
        emitter,
        statistics,
        recent,
        root,
    }
}

fn touch(dir: &Path, name: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(name), b"").unwrap();
}

#[tokio::test]
async fn test_new_episode_is_downloaded_once() {
    let feeds = StaticFeeds::new().with(
        "https://tracker.org/rss",
        &["Show A S01E02 1080p WEB h264-GRP", "Show Z S01E01 1080p WEB"],
    );
    let h = harness(feeds, &["Show A"], Options::default()).await;

    let report = h.cycle.run_cycle().await;

    assert_eq!(report.emitted(), 1);
    assert_eq!(h.emitter.titles(), vec!["Show A S01E02 1080p WEB h264-GRP"]);
    assert!(h.recent.contains("Show.A.S01E02.1080p.WEB.h264-GRP.torrent"));

    let stats = h.statistics.for_show("show a").await.unwrap();
    assert_eq!(stats.downloads.len(), 1);
    assert_eq!(stats.downloads[0].tracker, "tracker");

    // The same feed on the next cycle is suppressed by recent memory.
    let report = h.cycle.run_cycle().await;
    assert_eq!(report.emitted(), 0);

    std::fs::remove_dir_all(h.root).ok();
}

#[tokio::test]
async fn test_proper_skipped_without_upgrade() {
    let feeds = StaticFeeds::new().with(
        "https://tracker.org/rss",
        &["Show A S01E01 PROPER 1080p WEB h264-GRP"],
    );
    let h = harness(
        feeds,
        &["Show A"],
        Options {
            allow_upgrade: false,
            ..Default::default()
        },
    )
    .await;
    touch(&h.root.join("Show A"), "Show.A.S01E01.1080p.WEB.h264-OTHER.torrent");

    let report = h.cycle.run_cycle().await;

    assert_eq!(report.emitted(), 0);
    assert_eq!(report.feeds[0].matched, 1);
    std::fs::remove_dir_all(h.root).ok();
}

#[tokio::test]
async fn test_proper_downloaded_as_upgrade() {
    let feeds = StaticFeeds::new().with(
        "https://tracker.org/rss",
        &["Show A S01E01 PROPER 1080p WEB h264-GRP"],
    );
    let h = harness(feeds, &["Show A"], Options::default()).await;
    touch(&h.root.join("Show A"), "Show.A.S01E01.1080p.WEB.h264-OTHER.torrent");

    let report = h.cycle.run_cycle().await;

    assert_eq!(report.emitted(), 1);
    std::fs::remove_dir_all(h.root).ok();
}

#[tokio::test]
async fn test_older_episode_than_local_is_skipped() {
    let feeds = StaticFeeds::new().with("https://tracker.org/rss", &["Show A S01E03 1080p WEB"]);
    let h = harness(feeds, &["Show A"], Options::default()).await;
    touch(&h.root.join("Show A"), "Show.A.S01E04.1080p.WEB.torrent");

    assert_eq!(h.cycle.run_cycle().await.emitted(), 0);
    std::fs::remove_dir_all(h.root).ok();
}

#[tokio::test]
async fn test_same_episode_on_two_feeds_downloads_once() {
    let feeds = StaticFeeds::new()
        .with("https://one.example.org/rss", &["Show B S01E01 1080p WEB h264-GRP"])
        .with("https://two.example.net/rss", &["Show B S01E01 1080p WEB h264-GRP"]);
    let h = harness(feeds, &["Show B"], Options::default()).await;

    let report = h.cycle.run_cycle().await;

    assert_eq!(report.emitted(), 1);
    assert_eq!(h.emitter.titles().len(), 1);
    let stats = h.statistics.for_show("show b").await.unwrap();
    assert_eq!(stats.downloads.len(), 1);
    std::fs::remove_dir_all(h.root).ok();
}

#[tokio::test]
async fn test_packs_and_other_resolutions_filtered() {
    let feeds = StaticFeeds::new().with(
        "https://tracker.org/rss",
        &[
            "Show C S03 1080p BluRay x264-GRP",
            "Show C S03E01 720p HDTV x264-GRP",
        ],
    );
    let h = harness(feeds, &["Show C"], Options::default()).await;

    let report = h.cycle.run_cycle().await;

    assert_eq!(report.feeds[0].matched, 2);
    assert_eq!(report.emitted(), 0);
    std::fs::remove_dir_all(h.root).ok();
}

#[tokio::test]
async fn test_pack_allowed_when_not_skipped() {
    let feeds = StaticFeeds::new().with("https://tracker.org/rss", &["Show C S03 1080p BluRay x264-GRP"]);
    let h = harness(
        feeds,
        &["Show C"],
        Options {
            skip_packs: false,
            ..Default::default()
        },
    )
    .await;

    assert_eq!(h.cycle.run_cycle().await.emitted(), 1);
    std::fs::remove_dir_all(h.root).ok();
}

#[tokio::test]
async fn test_failed_feed_does_not_stop_others() {
    let feeds = StaticFeeds::new()
        .broken("https://down.example.org/rss")
        .with("https://tracker.org/rss", &["Show A S01E01 1080p WEB"]);
    let h = harness(feeds, &["Show A"], Options::default()).await;

    let report = h.cycle.run_cycle().await;

    assert_eq!(report.failed_feeds(), 1);
    assert_eq!(report.emitted(), 1);
    std::fs::remove_dir_all(h.root).ok();
}

#[tokio::test]
async fn test_duplicate_entries_in_one_feed_emit_once() {
    let feeds = StaticFeeds::new().with(
        "https://tracker.org/rss",
        &["Show A S01E05 1080p WEB h264-GRP", "Show A S01E05 1080p WEB h264-GRP"],
    );
    let h = harness(feeds, &["Show A"], Options::default()).await;

    assert_eq!(h.cycle.run_cycle().await.emitted(), 1);
    std::fs::remove_dir_all(h.root).ok();
}
