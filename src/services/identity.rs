use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, Result};

/// A user whose ID token the identity provider accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub email: Option<String>,
}

impl Identity {
    pub fn display_name(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.user_id)
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
}

/// Verifies Firebase ID tokens through the Identity Toolkit lookup endpoint.
pub struct IdentityClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl IdentityClient {
    pub fn new(base_url: &str, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub async fn verify(&self, id_token: &str) -> Result<Identity> {
        let id_token = id_token.trim();
        if id_token.is_empty() {
            return Err(AppError::IdentityApi("empty token".to_string()));
        }

        let response = self
            .client
            .post(format!("{}/accounts:lookup", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({ "idToken": id_token }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(AppError::IdentityApi(format!("HTTP {}: {}", status, error_text)));
        }

        let lookup: LookupResponse = response.json().await?;
        lookup
            .users
            .into_iter()
            .next()
            .map(|user| Identity {
                user_id: user.local_id,
                email: user.email,
            })
            .ok_or_else(|| AppError::IdentityApi("token does not belong to any user".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn accepted_token_yields_identity() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/accounts:lookup")
            .match_query(Matcher::UrlEncoded("key".into(), "web-key".into()))
            .match_body(Matcher::Json(serde_json::json!({"idToken": "tok"})))
            .with_status(200)
            .with_body(r#"{"kind":"identitytoolkit#GetAccountInfoResponse","users":[{"localId":"u-42","email":"ada@example.com"}]}"#)
            .create_async()
            .await;

        let client = IdentityClient::new(&server.url(), "web-key".into()).unwrap();
        let identity = client.verify(" tok ").await.unwrap();

        mock.assert_async().await;
        assert_eq!(identity.user_id, "u-42");
        assert_eq!(identity.display_name(), "ada@example.com");
    }

    #[tokio::test]
    async fn rejected_token_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/accounts:lookup")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":{"message":"INVALID_ID_TOKEN"}}"#)
            .create_async()
            .await;

        let client = IdentityClient::new(&server.url(), "web-key".into()).unwrap();
        let err = client.verify("bad").await.unwrap_err();

        assert!(matches!(err, AppError::IdentityApi(ref msg) if msg.contains("INVALID_ID_TOKEN")));
    }

    #[tokio::test]
    async fn empty_user_list_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/accounts:lookup")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = IdentityClient::new(&server.url(), "web-key".into()).unwrap();
        assert!(client.verify("tok").await.is_err());
    }
}
