use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use feed_rs::model::Entry;
use html2text::render::TrivialDecorator;

use super::{FeedFetcher, FeedSource, FetchedFeed};
use crate::error::Result;
use crate::models::FeedItem;

/// Entries whose cleaned body is shorter than this are dropped.
pub const MIN_CONTENT_CHARS: usize = 100;

// Wide enough that html2text never splits a word across lines.
const WRAP_WIDTH: usize = 4096;

/// Turns the configured feeds into one `<source>.jsonl` file per source.
pub struct FeedIngestor {
    fetcher: FeedFetcher,
    out_dir: PathBuf,
}

impl FeedIngestor {
    pub fn new(out_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            fetcher: FeedFetcher::new()?,
            out_dir: out_dir.into(),
        })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Ingest every source in order. A feed that cannot be fetched or parsed
    /// contributes nothing; local write failures are returned.
    pub async fn ingest_all(&self, sources: &[FeedSource]) -> Result<Vec<FeedItem>> {
        std::fs::create_dir_all(&self.out_dir)?;

        let mut all_items = Vec::new();
        for source in sources {
            let items = self.ingest_source(source).await?;
            all_items.extend(items);
        }

        tracing::info!(
            "Ingested {} items from {} feeds",
            all_items.len(),
            sources.len()
        );
        Ok(all_items)
    }

    pub async fn ingest_source(&self, source: &FeedSource) -> Result<Vec<FeedItem>> {
        let fetched = match self.fetcher.fetch_feed(&source.url).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!("Skipping {} ({}): {}", source.name, source.url, e);
                return Ok(Vec::new());
            }
        };

        let items = items_from_feed(fetched, &source.name);
        if items.is_empty() {
            tracing::info!("No usable entries in {}", source.name);
            return Ok(items);
        }

        let path = self.out_dir.join(format!("{}.jsonl", source.name));
        write_jsonl(&path, &items)?;
        tracing::info!("{} saved to {}", items.len(), path.display());

        Ok(items)
    }
}

/// Normalize the entries of one parsed feed, keeping feed order.
pub fn items_from_feed(fetched: FetchedFeed, source: &str) -> Vec<FeedItem> {
    let FetchedFeed {
        feed,
        mut published,
    } = fetched;

    if published.len() != feed.entries.len() {
        tracing::debug!(
            "Publication dates for {} do not line up with its entries ({} vs {})",
            source,
            published.len(),
            feed.entries.len()
        );
        published = vec![None; feed.entries.len()];
    }

    feed.entries
        .into_iter()
        .zip(published)
        .filter_map(|(entry, published)| item_from_entry(entry, published, source))
        .collect()
}

fn item_from_entry(entry: Entry, published: Option<String>, source: &str) -> Option<FeedItem> {
    let markup = entry
        .summary
        .as_ref()
        .map(|s| s.content.as_str())
        .filter(|s| !s.trim().is_empty())
        .or_else(|| entry.content.as_ref().and_then(|c| c.body.as_deref()))
        .unwrap_or_default();

    let content = clean_text(markup);
    let length = content.chars().count();
    if length < MIN_CONTENT_CHARS {
        tracing::debug!("Dropping short entry {:?} ({} chars)", entry.id, length);
        return None;
    }

    let link = entry.links.first().map(|l| l.href.clone());
    let id = if entry.id.is_empty() {
        link.clone()
    } else {
        Some(entry.id)
    };

    Some(FeedItem {
        id,
        title: entry.title.map(|t| t.content),
        link,
        published: published.unwrap_or_default(),
        source: source.to_string(),
        content,
    })
}

/// Render markup as plain text on a single line. Links and images leave only
/// their visible text behind.
pub fn clean_text(markup: &str) -> String {
    if markup.trim().is_empty() {
        return String::new();
    }

    let text = match html2text::config::with_decorator(TrivialDecorator::new())
        .string_from_read(markup.as_bytes(), WRAP_WIDTH)
    {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!("Failed to convert HTML to text: {}", e);
            return String::new();
        }
    };

    text.replace("\r\n", "\n")
        .replace('\n', " ")
        .trim()
        .to_string()
}

/// Replace `path` with one compact JSON object per line.
pub fn write_jsonl(path: &Path, items: &[FeedItem]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for item in items {
        serde_json::to_writer(&mut writer, item)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
