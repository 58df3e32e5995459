pub mod release;
pub mod show;
pub mod statistics;

pub use release::{EpisodeKey, LocalFileRecord, Release};
pub use show::{Show, ShowSummary};
pub use statistics::{DownloadEvent, ShowStatistics};
