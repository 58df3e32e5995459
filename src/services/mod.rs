pub mod completion;
pub use completion::{
    CompletionHookSource, CompletionService, CopyError, CopyOutcome, QBitCompletionSource,
    TransferComplete,
};

pub mod emitter;
pub use emitter::{DownloadEmitter, EmitError, QBitEmitter, TorrentFileEmitter};

pub mod notify;
pub use notify::{LogNotifier, MultiNotifier, NotificationSink};

pub mod recent;
pub use recent::RecentDownloads;

pub mod rss;
pub use rss::{CycleComponents, CycleReport, CycleRunner, FeedCycleService, FeedReport};

pub mod statistics;
pub use statistics::StatisticsRecorder;

pub mod watchlist;
pub use watchlist::{
    AddOutcome, StorePersistence, Watchlist, WatchlistError, WatchlistManager,
    WatchlistPersistence,
};
