pub mod prelude;

pub mod download_events;
pub mod removed_shows;
