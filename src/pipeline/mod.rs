//! Per-release decision stages, in the order a feed's entries flow through them.

pub mod dedup;
pub mod normalize;
pub mod quality;
pub mod reconcile;
pub mod watchlist;

pub use dedup::{CycleLedger, dedup_batch};
pub use normalize::{ReleaseNormalizer, file_base_name};
pub use quality::{QualityFilter, Rejection};
pub use reconcile::{LibraryFs, LocalFs, LocalStateError, LocalStateReconciler, should_keep};
pub use watchlist::{MatchOutcome, WatchlistMatcher};
