pub use super::download_events::Entity as DownloadEvents;
pub use super::removed_shows::Entity as RemovedShows;
