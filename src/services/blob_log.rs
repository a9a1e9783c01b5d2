use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, StatusCode};
use sha2::Sha256;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::BotMode;

type HmacSha256 = Hmac<Sha256>;

const STORAGE_API_VERSION: &str = "2021-08-06";
const LOG_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Account details pulled out of an Azure Storage connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageAccount {
    pub name: String,
    pub key: Vec<u8>,
    pub blob_endpoint: String,
}

impl StorageAccount {
    pub fn from_connection_string(connection_string: &str) -> Result<Self> {
        let mut name = None;
        let mut key = None;
        let mut blob_endpoint = None;
        let mut protocol = "https".to_string();
        let mut suffix = "core.windows.net".to_string();

        for part in connection_string.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let Some((k, v)) = part.split_once('=') else {
                return Err(AppError::Config(format!("malformed connection string segment '{part}'")));
            };
            match k {
                "AccountName" => name = Some(v.to_string()),
                "AccountKey" => key = Some(v.to_string()),
                "BlobEndpoint" => blob_endpoint = Some(v.trim_end_matches('/').to_string()),
                "DefaultEndpointsProtocol" => protocol = v.to_string(),
                "EndpointSuffix" => suffix = v.to_string(),
                _ => {}
            }
        }

        let name = name.ok_or_else(|| AppError::Config("connection string has no AccountName".into()))?;
        let key = key.ok_or_else(|| AppError::Config("connection string has no AccountKey".into()))?;
        let key = STANDARD
            .decode(key)
            .map_err(|e| AppError::Config(format!("AccountKey is not base64: {e}")))?;
        let blob_endpoint =
            blob_endpoint.unwrap_or_else(|| format!("{protocol}://{name}.blob.{suffix}"));

        Ok(Self {
            name,
            key,
            blob_endpoint,
        })
    }
}

/// Append-only plain-text transcript, one blob per recognized user.
pub struct TranscriptLog {
    client: Client,
    account: StorageAccount,
    container: String,
}

impl TranscriptLog {
    pub fn new(account: StorageAccount, container: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            account,
            container: container.into(),
        })
    }

    pub fn from_connection_string(connection_string: &str, container: &str) -> Result<Self> {
        Self::new(StorageAccount::from_connection_string(connection_string)?, container)
    }

    pub fn blob_name(user_id: &str) -> String {
        format!("logs/{}.txt", urlencoding::encode(user_id))
    }

    fn blob_url(&self, user_id: &str) -> Result<Url> {
        let raw = format!(
            "{}/{}/{}",
            self.account.blob_endpoint,
            self.container,
            Self::blob_name(user_id)
        );
        Url::parse(&raw).map_err(|e| AppError::BlobApi(format!("invalid blob URL {raw}: {e}")))
    }

    /// Current transcript text; a missing blob reads as empty.
    pub async fn read(&self, user_id: &str) -> Result<String> {
        let url = self.blob_url(user_id)?;
        let response = self.signed(Method::GET, url, None)?.send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(String::new()),
            status if status.is_success() => Ok(response.text().await?),
            status => {
                let error_text = response.text().await?;
                Err(AppError::BlobApi(format!("HTTP {}: {}", status, error_text)))
            }
        }
    }

    /// Add one line to the user's transcript by rewriting the whole blob.
    pub async fn append(&self, user_id: &str, line: &str) -> Result<()> {
        let mut body = self.read(user_id).await?;
        if !body.is_empty() && !body.ends_with('\n') {
            body.push('\n');
        }
        body.push_str(line);
        body.push('\n');

        let url = self.blob_url(user_id)?;
        let response = self.signed(Method::PUT, url, Some(body))?.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(AppError::BlobApi(format!("HTTP {}: {}", status, error_text)));
        }

        tracing::debug!("Appended transcript line for {}", user_id);
        Ok(())
    }

    fn signed(&self, method: Method, url: Url, body: Option<String>) -> Result<reqwest::RequestBuilder> {
        let date = http_date(Utc::now());
        let content_length = body.as_ref().map_or(0, String::len);
        let content_type = if body.is_some() { LOG_CONTENT_TYPE } else { "" };

        let mut ms_headers = vec![
            ("x-ms-date", date),
            ("x-ms-version", STORAGE_API_VERSION.to_string()),
        ];
        if body.is_some() {
            ms_headers.push(("x-ms-blob-type", "BlockBlob".to_string()));
        }

        let resource = format!("/{}{}", self.account.name, url.path());
        let to_sign = string_to_sign(method.as_str(), content_length, content_type, &ms_headers, &resource);
        let authorization = format!(
            "SharedKey {}:{}",
            self.account.name,
            sign(&self.account.key, &to_sign)?
        );

        let mut request = self
            .client
            .request(method, url)
            .header("Authorization", authorization);
        for (name, value) in ms_headers {
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request.header("Content-Type", content_type).body(body);
        }
        Ok(request)
    }
}

/// One transcript line. Line breaks inside the exchange are flattened.
pub fn format_entry(at: DateTime<Utc>, mode: BotMode, question: &str, answer: &str) -> String {
    let flat = |s: &str| s.replace(['\r', '\n'], " ");
    format!(
        "[{}] {} | Q: {} | A: {}",
        at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        mode.index_name(),
        flat(question),
        flat(answer)
    )
}

fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Shared Key string-to-sign for the blob service.
fn string_to_sign(
    method: &str,
    content_length: usize,
    content_type: &str,
    ms_headers: &[(&str, String)],
    canonical_resource: &str,
) -> String {
    let length = if content_length == 0 {
        String::new()
    } else {
        content_length.to_string()
    };

    let mut headers = ms_headers.to_vec();
    headers.sort_by(|a, b| a.0.cmp(b.0));
    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v))
        .collect();

    // VERB, Content-Encoding, Content-Language, Content-Length, Content-MD5,
    // Content-Type, Date, If-Modified-Since, If-Match, If-None-Match,
    // If-Unmodified-Since, Range
    format!(
        "{method}\n\n\n{length}\n\n{content_type}\n\n\n\n\n\n\n{canonical_headers}{canonical_resource}"
    )
}

fn sign(key: &[u8], string_to_sign: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::BlobApi(format!("Invalid account key: {e}")))?;
    mac.update(string_to_sign.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
