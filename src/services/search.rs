use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{Config, DEFAULT_SEARCH_API_VERSION};
use crate::error::{AppError, Result};

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    search: &'a str,
    top: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<Map<String, Value>>,
}

/// Full-text query client for a hosted Azure AI Search service.
pub struct SearchClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SearchClient {
    pub fn new(base_url: &str, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let (Some(base_url), Some(api_key)) =
            (config.search_base_url(), config.search_api_key.clone())
        else {
            return Err(AppError::MissingConfig(config.missing_settings()));
        };
        Self::new(&base_url, api_key)
    }

    /// Return the text of the `top` best documents in `index` for `query`.
    pub async fn search(&self, index: &str, query: &str, top: usize) -> Result<Vec<String>> {
        let url = format!("{}/indexes/{}/docs/search", self.base_url, index);

        let response = self
            .client
            .post(url)
            .query(&[("api-version", DEFAULT_SEARCH_API_VERSION)])
            .header("api-key", &self.api_key)
            .json(&SearchRequest { search: query, top })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(AppError::SearchApi(format!("HTTP {}: {}", status, error_text)));
        }

        let results: SearchResponse = response.json().await?;
        Ok(results.value.into_iter().map(flatten_document).collect())
    }
}

/// Prefer a non-empty `content` field, then `text`, then the raw document.
fn flatten_document(document: Map<String, Value>) -> String {
    for field in ["content", "text"] {
        if let Some(Value::String(text)) = document.get(field) {
            if !text.is_empty() {
                return text.clone();
            }
        }
    }
    Value::Object(document).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[test]
    fn flatten_prefers_content_then_text() {
        let doc = |v: Value| v.as_object().unwrap().clone();

        assert_eq!(flatten_document(doc(json!({"content": "c", "text": "t"}))), "c");
        assert_eq!(flatten_document(doc(json!({"content": "", "text": "t"}))), "t");
        assert_eq!(flatten_document(doc(json!({"id": "7"}))), r#"{"id":"7"}"#);
    }

    #[tokio::test]
    async fn queries_the_named_index() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/indexes/torah-index/docs/search")
            .match_query(Matcher::UrlEncoded("api-version".into(), DEFAULT_SEARCH_API_VERSION.into()))
            .match_header("api-key", "search-key")
            .match_body(Matcher::Json(json!({"search": "Genesis", "top": 3})))
            .with_status(200)
            .with_body(
                json!({"value": [
                    {"@search.score": 2.1, "content": "In the beginning"},
                    {"@search.score": 1.0, "text": "Bereshit"}
                ]})
                .to_string(),
            )
            .create_async()
            .await;

        let client = SearchClient::new(&server.url(), "search-key".into()).unwrap();
        let passages = client.search("torah-index", "Genesis", 3).await.unwrap();

        mock.assert_async().await;
        assert_eq!(passages, vec!["In the beginning", "Bereshit"]);
    }

    #[tokio::test]
    async fn service_errors_map_to_search_api() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/indexes/smartbot-index/docs/search")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;

        let client = SearchClient::new(&server.url(), "bad".into()).unwrap();
        let err = client.search("smartbot-index", "mint", 3).await.unwrap_err();

        assert!(matches!(err, AppError::SearchApi(ref msg) if msg.contains("403")));
    }
}
