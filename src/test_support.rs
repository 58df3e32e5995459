use crate::clients::feed::FeedEntry;
use crate::models::Release;
use crate::parser::SceneParser;
use crate::pipeline::ReleaseNormalizer;
use std::sync::Arc;

pub fn release(title: &str) -> Release {
    release_in(title, &[])
}

pub fn release_in(title: &str, categories: &[&str]) -> Release {
    ReleaseNormalizer::new(Arc::new(SceneParser), "/data/tv", true, false)
        .normalize(&FeedEntry {
            title: title.to_string(),
            link: format!("https://tracker.org/download/{title}"),
            published_at: None,
            categories: categories.iter().map(ToString::to_string).collect(),
        })
        .unwrap()
}
