use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    src: PhotoSources,
}

#[derive(Debug, Deserialize)]
struct PhotoSources {
    medium: String,
}

/// Stock-photo lookup against the Pexels search API.
pub struct PexelsClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PexelsClient {
    pub fn new(base_url: &str, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Medium-size URL of the best photo for `<herb> herb`, if any.
    pub async fn herb_photo(&self, herb: &str) -> Result<Option<String>> {
        let query = format!("{herb} herb");
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .header("Authorization", &self.api_key)
            .query(&[("query", query.as_str()), ("per_page", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(AppError::ImageApi(format!("HTTP {}: {}", status, error_text)));
        }

        let results: SearchResponse = response.json().await?;
        Ok(results.photos.into_iter().next().map(|photo| photo.src.medium))
    }
}
