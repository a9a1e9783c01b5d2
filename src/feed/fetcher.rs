use std::time::Duration;

use feed_rs::model::Feed;
use feed_rs::parser;
use reqwest::Client;

use super::published::raw_published;
use crate::error::Result;

/// A parsed feed plus the publication text of each entry as written in the
/// document, index-aligned with `feed.entries` when the two scans agree.
#[derive(Debug)]
pub struct FetchedFeed {
    pub feed: Feed,
    pub published: Vec<Option<String>>,
}

/// Parse feed bytes. Entries without an id keep an empty one instead of a
/// generated hash, so callers can fall back to the link.
pub fn parse_feed(bytes: &[u8]) -> Result<FetchedFeed> {
    let feed = parser::Builder::new()
        .id_generator(|_, _, _| String::new())
        .build()
        .parse(bytes)?;

    Ok(FetchedFeed {
        feed,
        published: raw_published(bytes),
    })
}

pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("metatraces/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Download and parse one RSS/Atom/JSON feed.
    pub async fn fetch_feed(&self, url: &str) -> Result<FetchedFeed> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Failed to fetch feed: HTTP {}", response.status()).into());
        }

        let bytes = response.bytes().await?;
        parse_feed(&bytes)
    }
}
