use serde::{Deserialize, Serialize};

/// One normalized syndication entry. Field order is the on-disk key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: String,
    pub source: String,
    pub content: String,
}
