use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, Result};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<Message<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Client for an Azure-hosted OpenAI chat-completion deployment.
pub struct ChatClient {
    client: Client,
    url: String,
    api_key: String,
    temperature: f64,
    max_tokens: u32,
}

impl ChatClient {
    pub fn new(
        endpoint: &str,
        api_key: String,
        deployment: &str,
        api_version: &str,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            endpoint.trim_end_matches('/'),
            deployment,
            api_version
        );

        Ok(Self {
            client,
            url,
            api_key,
            temperature: 0.2,
            max_tokens: 400,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let (Some(endpoint), Some(api_key), Some(deployment)) = (
            config.openai_endpoint.as_deref(),
            config.openai_api_key.clone(),
            config.openai_deployment.as_deref(),
        ) else {
            return Err(AppError::MissingConfig(config.missing_settings()));
        };

        let mut client = Self::new(endpoint, api_key, deployment, &config.openai_api_version)?;
        client.temperature = config.temperature;
        client.max_tokens = config.max_tokens;
        Ok(client)
    }

    /// Send `prompt` as a single user message and return the first choice.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(AppError::ChatApi(format!("HTTP {}: {}", status, error_text)));
        }

        let chat_response: ChatResponse = response.json().await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::ChatApi("No choices returned from API".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    const PATH: &str = "/openai/deployments/gpt-35/chat/completions";

    fn client(server: &mockito::Server) -> ChatClient {
        ChatClient::new(&format!("{}/", server.url()), "secret".into(), "gpt-35", "2023-05-15").unwrap()
    }

    #[tokio::test]
    async fn posts_single_user_message_and_returns_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .match_query(Matcher::UrlEncoded("api-version".into(), "2023-05-15".into()))
            .match_header("api-key", "secret")
            .match_body(Matcher::PartialJson(json!({
                "messages": [{"role": "user", "content": "Hi"}],
                "temperature": 0.2,
                "max_tokens": 400
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"choices": [
                    {"message": {"role": "assistant", "content": "Hello!"}},
                    {"message": {"role": "assistant", "content": "ignored"}}
                ]})
                .to_string(),
            )
            .create_async()
            .await;

        let answer = client(&server).complete("Hi").await.unwrap();

        mock.assert_async().await;
        assert_eq!(answer, "Hello!");
    }

    #[tokio::test]
    async fn api_errors_carry_the_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", PATH)
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let err = client(&server).complete("Hi").await.unwrap_err();

        assert!(matches!(err, AppError::ChatApi(ref msg) if msg.contains("401")));
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let err = client(&server).complete("Hi").await.unwrap_err();

        assert!(matches!(err, AppError::ChatApi(_)));
    }

    #[test]
    fn from_config_requires_chat_settings() {
        let result = ChatClient::from_config(&Config::default());
        assert!(matches!(result, Err(AppError::MissingConfig(_))));
    }
}
