use std::path::Path;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantSuggestion {
    pub name: String,
    pub probability: f64,
}

#[derive(Debug, Deserialize)]
struct IdentificationResponse {
    result: IdentificationResult,
}

#[derive(Debug, Deserialize)]
struct IdentificationResult {
    classification: Classification,
}

#[derive(Debug, Deserialize)]
struct Classification {
    #[serde(default)]
    suggestions: Vec<PlantSuggestion>,
}

pub struct PlantIdClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PlantIdClient {
    pub fn new(base_url: &str, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Identify the plant in an image file, most likely match first.
    pub async fn identify(&self, image_path: &Path) -> Result<Vec<PlantSuggestion>> {
        let bytes = tokio::fs::read(image_path).await?;
        let data_url = format!("data:{};base64,{}", mime_for(image_path), STANDARD.encode(bytes));

        let response = self
            .client
            .post(format!("{}/identification", self.base_url))
            .header("Api-Key", &self.api_key)
            .json(&json!({ "images": [data_url] }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(AppError::PlantApi(format!("HTTP {}: {}", status, error_text)));
        }

        let body: IdentificationResponse = response.json().await?;
        let mut suggestions = body.result.classification.suggestions;
        suggestions.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        Ok(suggestions)
    }
}

fn mime_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}
