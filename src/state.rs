use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::clients::feed::RssFeedClient;
use crate::clients::qbittorrent::QBitClient;
use crate::config::{Config, DownloadClientKind};
use crate::db::Store;
use crate::domain::events::NotificationEvent;
use crate::parser::{MetadataExtractor, SceneParser};
use crate::pipeline::{LocalFs, LocalStateReconciler, QualityFilter, ReleaseNormalizer};
use crate::services::{
    CompletionService, CycleComponents, DownloadEmitter, FeedCycleService, LogNotifier,
    MultiNotifier, NotificationSink, QBitEmitter, RecentDownloads, StatisticsRecorder,
    StorePersistence, TorrentFileEmitter, WatchlistManager,
};

const EVENT_BUS_CAPACITY: usize = 64;

/// Long-lived services wired from one configuration.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub qbit: Option<Arc<QBitClient>>,

    pub watchlist: Arc<WatchlistManager>,

    pub statistics: StatisticsRecorder,

    pub recent: Arc<RecentDownloads>,

    pub cycle: FeedCycleService,

    pub completion: Arc<CompletionService>,

    pub event_bus: broadcast::Sender<NotificationEvent>,
}

impl SharedState {
    pub async fn new(config: Config, config_path: PathBuf) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Self::with_store(config, config_path, store).await
    }

    pub async fn with_store(
        config: Config,
        config_path: PathBuf,
        store: Store,
    ) -> anyhow::Result<Self> {
        let (event_bus, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        let notifier: Arc<dyn NotificationSink> =
            Arc::new(MultiNotifier::new().with(LogNotifier).with(event_bus.clone()));
        let extractor: Arc<dyn MetadataExtractor> = Arc::new(SceneParser);

        let qbit = if config.qbittorrent.enabled {
            Some(Arc::new(QBitClient::new((&config.qbittorrent).into())?))
        } else {
            None
        };

        let statistics = StatisticsRecorder::new(store.clone());
        let removed = store.list_removed_shows().await?;
        let persistence = Arc::new(StorePersistence::new(
            store.clone(),
            config.clone(),
            config_path,
        ));
        let watchlist = Arc::new(WatchlistManager::new(
            config.shows.clone(),
            removed,
            persistence,
            statistics.clone(),
            notifier.clone(),
        ));

        let timeout = Duration::from_secs(config.feeds.request_timeout_seconds.into());
        let emitter: Arc<dyn DownloadEmitter> = match config.downloads.client {
            DownloadClientKind::TorrentFile => Arc::new(TorrentFileEmitter::with_timeout(timeout)?),
            DownloadClientKind::Qbittorrent => {
                let client = qbit.clone().ok_or_else(|| {
                    anyhow::anyhow!("qBittorrent download client selected but not enabled")
                })?;
                Arc::new(QBitEmitter::new(client, &config.qbittorrent.category))
            }
        };

        let recent = Arc::new(RecentDownloads::default());
        let cycle = FeedCycleService::new(CycleComponents {
            feeds: config.feeds.urls.clone(),
            source: Arc::new(RssFeedClient::with_timeout(timeout)?),
            normalizer: ReleaseNormalizer::new(
                extractor.clone(),
                &config.downloads.save_root,
                config.downloads.sort_into_subdirectories,
                config.downloads.strip_trailing_periods,
            ),
            quality: QualityFilter::from_config(&config.filters),
            reconciler: LocalStateReconciler::new(
                Arc::new(LocalFs),
                extractor.clone(),
                config.downloads.local_file_order,
                config.filters.allow_proper_repack_redownload,
            ),
            watchlist: watchlist.clone(),
            recent: recent.clone(),
            statistics: statistics.clone(),
            emitter,
            notifier: notifier.clone(),
        });

        let completion = Arc::new(CompletionService::new(
            extractor,
            watchlist.clone(),
            notifier,
        ));

        Ok(Self {
            config: Arc::new(config),
            store,
            qbit,
            watchlist,
            statistics,
            recent,
            cycle,
            completion,
            event_bus,
        })
    }
}
