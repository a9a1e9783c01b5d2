mod fetcher;
mod ingest;
mod published;

pub use fetcher::{FeedFetcher, FetchedFeed};
pub use ingest::FeedIngestor;

use serde::{Deserialize, Serialize};

/// A named syndication feed. The name doubles as the output file stem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

impl FeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}
