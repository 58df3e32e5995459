use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// One item as delivered by a feed, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,

    pub link: String,

    pub published_at: Option<DateTime<Utc>>,

    pub categories: Vec<String>,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("feed returned HTTP {0}")]
    Status(StatusCode),

    #[error("feed parse error: {0}")]
    Parse(String),
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetches the current entries of a feed, in the order the feed lists them.
    async fn fetch(&self, url: &str) -> Result<Vec<FeedEntry>, FeedError>;
}

#[derive(Clone)]
pub struct RssFeedClient {
    client: Client,
}

impl RssFeedClient {
    /// Creates a client whose requests give up after `timeout`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_timeout(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("showfeed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FeedSource for RssFeedClient {
    async fn fetch(&self, url: &str) -> Result<Vec<FeedEntry>, FeedError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status));
        }

        let body = response.text().await?;
        parse_rss(&body)
    }
}

/// Parses an RSS 2.0 document into entries.
///
/// Items without a title or without any link are skipped.
pub fn parse_rss(xml: &str) -> Result<Vec<FeedEntry>, FeedError> {
    let envelope: RssEnvelope = from_str(xml).map_err(|e| FeedError::Parse(e.to_string()))?;

    Ok(envelope
        .channel
        .items
        .into_iter()
        .filter_map(RawItem::into_entry)
        .collect())
}

fn parse_pub_date(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?.trim();

    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

fn decode(text: &str) -> String {
    html_escape::decode_html_entities(text.trim()).to_string()
}

#[derive(Debug, Deserialize)]
struct RssEnvelope {
    channel: RawChannel,
}

#[derive(Debug, Deserialize)]
struct RawChannel {
    #[serde(rename = "item", default)]
    items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    title: Option<String>,

    link: Option<String>,

    enclosure: Option<RawEnclosure>,

    #[serde(rename = "pubDate")]
    pub_date: Option<String>,

    #[serde(rename = "category", default)]
    categories: Vec<RawText>,
}

#[derive(Debug, Deserialize)]
struct RawEnclosure {
    #[serde(rename = "@url")]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawText {
    #[serde(rename = "$text", default)]
    value: String,
}

impl RawItem {
    fn into_entry(self) -> Option<FeedEntry> {
        let title = decode(self.title.as_deref()?);
        if title.is_empty() {
            return None;
        }

        let link = self
            .link
            .filter(|link| !link.trim().is_empty())
            .or_else(|| self.enclosure.and_then(|e| e.url))
            .map(|link| decode(&link))?;

        Some(FeedEntry {
            title,
            link,
            published_at: parse_pub_date(self.pub_date.as_deref()),
            categories: self
                .categories
                .into_iter()
                .map(|c| decode(&c.value))
                .filter(|c| !c.is_empty())
                .collect(),
        })
    }
}
