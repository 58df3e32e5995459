//! One reconciliation cycle over every configured feed.

use crate::clients::feed::FeedSource;
use crate::domain::CycleId;
use crate::domain::events::NotificationEvent;
use crate::models::Release;
use crate::parser::root_domain;
use crate::pipeline::{
    CycleLedger, LocalStateReconciler, MatchOutcome, QualityFilter, ReleaseNormalizer,
    WatchlistMatcher, dedup_batch,
};
use crate::services::emitter::DownloadEmitter;
use crate::services::notify::NotificationSink;
use crate::services::recent::RecentDownloads;
use crate::services::statistics::StatisticsRecorder;
use crate::services::watchlist::WatchlistManager;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};

/// Tracker name recorded when a feed URL has no usable host.
const UNKNOWN_TRACKER: &str = "unknown";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedReport {
    pub url: String,
    pub entries: usize,
    pub matched: usize,
    pub emitted: usize,
    pub failures: usize,
    pub fetch_failed: bool,
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_id: CycleId,
    pub feeds: Vec<FeedReport>,
}

impl CycleReport {
    #[must_use]
    pub fn emitted(&self) -> usize {
        self.feeds.iter().map(|f| f.emitted).sum()
    }

    #[must_use]
    pub fn failed_feeds(&self) -> usize {
        self.feeds.iter().filter(|f| f.fetch_failed).count()
    }
}

#[async_trait]
pub trait CycleRunner: Send + Sync {
    async fn run_cycle(&self) -> CycleReport;
}

/// Everything a cycle needs, injected once at startup.
pub struct CycleComponents {
    pub feeds: Vec<String>,
    pub source: Arc<dyn FeedSource>,
    pub normalizer: ReleaseNormalizer,
    pub quality: QualityFilter,
    pub reconciler: LocalStateReconciler,
    pub watchlist: Arc<WatchlistManager>,
    pub recent: Arc<RecentDownloads>,
    pub statistics: StatisticsRecorder,
    pub emitter: Arc<dyn DownloadEmitter>,
    pub notifier: Arc<dyn NotificationSink>,
}

#[derive(Clone)]
pub struct FeedCycleService {
    inner: Arc<CycleComponents>,
}

impl FeedCycleService {
    #[must_use]
    pub fn new(components: CycleComponents) -> Self {
        Self {
            inner: Arc::new(components),
        }
    }

    #[must_use]
    pub fn feeds(&self) -> &[String] {
        &self.inner.feeds
    }
}

#[async_trait]
impl CycleRunner for FeedCycleService {
    async fn run_cycle(&self) -> CycleReport {
        let cycle_id = CycleId::new();
        let span = info_span!("cycle", cycle_id = %cycle_id);
        let inner = Arc::clone(&self.inner);

        async move {
            let start = Instant::now();
            let ledger = Arc::new(CycleLedger::new());

            inner.notifier.notify(NotificationEvent::CycleStarted {
                cycle_id,
                feeds: inner.feeds.len(),
            });
            info!(event = "cycle_started", feeds = inner.feeds.len(), "Checking feeds");

            let handles: Vec<_> = inner
                .feeds
                .iter()
                .cloned()
                .map(|url| {
                    let inner = Arc::clone(&inner);
                    let ledger = Arc::clone(&ledger);
                    let span = info_span!("feed", url = %url);
                    tokio::spawn(
                        async move { process_feed(&inner, &url, &ledger).await }.instrument(span),
                    )
                })
                .collect();

            let mut feeds = Vec::with_capacity(handles.len());
            for (handle, url) in futures::future::join_all(handles)
                .await
                .into_iter()
                .zip(inner.feeds.iter())
            {
                match handle {
                    Ok(report) => feeds.push(report),
                    Err(e) => {
                        warn!(event = "feed_task_failed", url = %url, error = %e, "Feed task aborted");
                        feeds.push(FeedReport {
                            url: url.clone(),
                            fetch_failed: true,
                            ..Default::default()
                        });
                    }
                }
            }

            let report = CycleReport { cycle_id, feeds };
            let elapsed = start.elapsed();
            metrics::histogram!("showfeed_cycle_duration_seconds").record(elapsed.as_secs_f64());

            inner.notifier.notify(NotificationEvent::CycleFinished {
                cycle_id,
                emitted: report.emitted(),
                failed_feeds: report.failed_feeds(),
            });
            info!(
                event = "cycle_finished",
                feeds = report.feeds.len(),
                emitted = report.emitted(),
                failed_feeds = report.failed_feeds(),
                duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                "Feed cycle completed"
            );

            report
        }
        .instrument(span)
        .await
    }
}

async fn process_feed(inner: &CycleComponents, url: &str, ledger: &CycleLedger) -> FeedReport {
    let mut report = FeedReport {
        url: url.to_string(),
        ..Default::default()
    };

    let entries = match inner.source.fetch(url).await {
        Ok(entries) => entries,
        Err(e) => {
            metrics::counter!("showfeed_feed_fetch_failures_total").increment(1);
            warn!(event = "feed_fetch_failed", error = %e, "Skipping feed this cycle");
            report.fetch_failed = true;
            return report;
        }
    };
    report.entries = entries.len();

    let domain = root_domain(url);
    let tracker = domain.clone().unwrap_or_else(|| UNKNOWN_TRACKER.to_string());
    let matcher = WatchlistMatcher::new(
        inner.watchlist.watched().await,
        inner.recent.snapshot(),
        domain,
    );

    let mut candidates = Vec::new();
    for release in inner.normalizer.normalize_feed(&entries) {
        if let Some(release) = screen(inner, &matcher, release, &mut report).await {
            candidates.push(release);
        }
    }

    let mut emitted_names = Vec::new();
    for release in dedup_batch(candidates) {
        let key = release.key();
        if !ledger.claim(&key) {
            debug!(event = "release_claimed_elsewhere", release = %release.raw_title, "Already taken this cycle");
            continue;
        }

        if let Err(e) = inner.emitter.emit(&release).await {
            warn!(event = "release_emit_failed", release = %release.raw_title, error = %e, "Download failed");
            ledger.release(&key);
            report.failures += 1;
            continue;
        }

        metrics::counter!("showfeed_releases_emitted_total").increment(1);
        info!(
            event = "release_queued",
            show = %release.normalized_title,
            release = %release.raw_title,
            path = %release.target_path().display(),
            "Queued download"
        );

        inner.statistics.record(&release.normalized_title, &tracker).await;
        inner.notifier.notify(NotificationEvent::DownloadQueued {
            show: release.normalized_title.clone(),
            title: release.raw_title.clone(),
            tracker: tracker.clone(),
        });

        emitted_names.push(release.file_base_name);
        report.emitted += 1;
    }

    inner.recent.record(emitted_names);

    info!(
        event = "feed_checked",
        entries = report.entries,
        matched = report.matched,
        emitted = report.emitted,
        failures = report.failures,
        "Feed check complete"
    );

    report
}

/// Runs one release through the watchlist, quality and local state checks.
async fn screen(
    inner: &CycleComponents,
    matcher: &WatchlistMatcher,
    release: Release,
    report: &mut FeedReport,
) -> Option<Release> {
    match matcher.check(&release) {
        MatchOutcome::Matched => {}
        MatchOutcome::NotWatched => return None,
        outcome => {
            debug!(release = %release.raw_title, outcome = ?outcome, "Release not matched");
            return None;
        }
    }
    report.matched += 1;

    if let Err(reason) = inner.quality.check(&release) {
        debug!(event = "release_rejected", release = %release.raw_title, reason = %reason, "Quality filter");
        return None;
    }

    match inner.reconciler.should_download(&release).await {
        Ok(true) => Some(release),
        Ok(false) => None,
        Err(e) => {
            warn!(event = "local_state_failed", release = %release.raw_title, error = %e, "Skipping release");
            report.failures += 1;
            None
        }
    }
}
