pub mod domain;
pub mod filename;

pub use domain::{root_domain, tracker_allows};
pub use filename::{MetadataExtractor, ParsedTitle, SceneParser, normalize_title};
