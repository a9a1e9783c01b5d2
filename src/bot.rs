use chrono::Utc;

use crate::ai::{build_context, build_prompt, ChatClient};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{BotMode, HerbImage};
use crate::services::{
    detect_herb, format_entry, Identity, PexelsClient, SearchClient, TranscriptLog,
};
use crate::session::SessionContext;

pub const NO_CONTEXT_REPLY: &str = "⚠️ No relevant data found in search index.";
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't process your request right now.";

/// A question that passed the session checks, detached from the session so
/// it can be answered on another task.
#[derive(Debug, Clone)]
pub struct Turn {
    pub question: String,
    pub username: String,
    pub mode: BotMode,
    pub identity: Option<Identity>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub image: Option<HerbImage>,
    /// Problems the user should see, one per failed side call.
    pub notices: Vec<String>,
}

/// Search-then-complete question answering.
pub struct SmartBot {
    search: SearchClient,
    chat: ChatClient,
    images: Option<PexelsClient>,
    transcripts: Option<TranscriptLog>,
    top_k: usize,
    context_char_limit: usize,
    guest_question_limit: u32,
}

impl SmartBot {
    pub fn from_config(config: &Config) -> Result<Self> {
        config.ensure_chat_ready()?;

        let images = config
            .pexels_api_key
            .as_ref()
            .map(|key| PexelsClient::new(&config.pexels_api_url, key.clone()))
            .transpose()?;

        let transcripts = match config.storage_connection_string.as_deref() {
            Some(conn) => match TranscriptLog::from_connection_string(conn, &config.storage_container) {
                Ok(log) => Some(log),
                Err(e) => {
                    tracing::warn!("Transcript logging disabled: {}", e);
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            search: SearchClient::from_config(config)?,
            chat: ChatClient::from_config(config)?,
            images,
            transcripts,
            top_k: config.search_top_k,
            context_char_limit: config.context_char_limit,
            guest_question_limit: config.guest_question_limit,
        })
    }

    /// Validate a question against the session and record it in the history.
    pub fn prepare(&self, session: &mut SessionContext, question: &str) -> Result<Turn> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::EmptyQuestion);
        }
        if session.remaining_guest_questions(self.guest_question_limit) == Some(0) {
            return Err(AppError::QuotaExceeded(self.guest_question_limit));
        }

        session.count_guest_question();
        session.record_question(question);

        Ok(Turn {
            question: question.to_string(),
            username: session.username.clone(),
            mode: session.mode,
            identity: session.identity.clone(),
        })
    }

    /// Answer a prepared turn. Remote failures become notices, never errors.
    pub async fn respond(&self, turn: &Turn) -> Reply {
        let mut notices = Vec::new();

        let passages = match self
            .search
            .search(turn.mode.index_name(), &turn.question, self.top_k)
            .await
        {
            Ok(passages) => passages,
            Err(e) => {
                tracing::error!("Search failed: {}", e);
                notices.push(format!("❌ Search error: {e}"));
                Vec::new()
            }
        };

        let text = if passages.is_empty() {
            NO_CONTEXT_REPLY.to_string()
        } else {
            let context = build_context(&passages, self.context_char_limit);
            let prompt = build_prompt(&turn.question, &context, &turn.username);
            match self.chat.complete(&prompt).await {
                Ok(answer) => answer,
                Err(e) => {
                    tracing::error!("Chat completion failed: {}", e);
                    notices.push(format!("❌ GPT call failed: {e}"));
                    FALLBACK_REPLY.to_string()
                }
            }
        };

        let image = if turn.mode.is_herbal() {
            self.herb_image(&turn.question, &mut notices).await
        } else {
            None
        };

        if let Some(identity) = &turn.identity {
            self.log_exchange(identity, turn, &text, &mut notices).await;
        }

        Reply {
            text,
            image,
            notices,
        }
    }

    /// prepare + respond + record, for callers that own the session outright.
    pub async fn answer(&self, session: &mut SessionContext, question: &str) -> Result<Reply> {
        let turn = self.prepare(session, question)?;
        let reply = self.respond(&turn).await;
        session.record_reply(&reply);
        Ok(reply)
    }

    async fn herb_image(&self, question: &str, notices: &mut Vec<String>) -> Option<HerbImage> {
        let herb = detect_herb(question)?;

        let Some(images) = &self.images else {
            notices.push("⚠️ Missing PEXELS_API_KEY environment variable.".to_string());
            return None;
        };

        match images.herb_photo(herb).await {
            Ok(url) => url.map(|url| HerbImage {
                herb: herb.to_string(),
                url,
            }),
            Err(e) => {
                tracing::warn!("Image fetch failed for {}: {}", herb, e);
                notices.push(format!("Image fetch error: {e}"));
                None
            }
        }
    }

    async fn log_exchange(
        &self,
        identity: &Identity,
        turn: &Turn,
        answer: &str,
        notices: &mut Vec<String>,
    ) {
        let Some(transcripts) = &self.transcripts else {
            return;
        };

        let line = format_entry(Utc::now(), turn.mode, &turn.question, answer);
        if let Err(e) = transcripts.append(&identity.user_id, &line).await {
            tracing::warn!("Failed to log exchange for {}: {}", identity.user_id, e);
            notices.push(format!("Could not save chat log: {e}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    const CHAT_PATH: &str = "/openai/deployments/gpt/chat/completions";

    fn config(server: &Server) -> Config {
        Config {
            openai_endpoint: Some(server.url()),
            openai_api_key: Some("chat-key".into()),
            openai_deployment: Some("gpt".into()),
            search_endpoint: Some(server.url()),
            search_api_key: Some("search-key".into()),
            pexels_api_key: Some("px".into()),
            pexels_api_url: server.url(),
            guest_question_limit: 2,
            ..Config::default()
        }
    }

    async fn mock_search(server: &mut Server, index: &str, body: serde_json::Value) -> mockito::Mock {
        server
            .mock("POST", format!("/indexes/{index}/docs/search").as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await
    }

    async fn mock_chat(server: &mut Server, answer: &str) -> mockito::Mock {
        server
            .mock("POST", CHAT_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"choices": [{"message": {"content": answer}}]}).to_string())
            .create_async()
            .await
    }

    #[tokio::test]
    async fn answers_from_search_context_and_attaches_herb_photo() {
        let mut server = Server::new_async().await;
        let search = mock_search(
            &mut server,
            "smartbot-index",
            json!({"value": [{"content": "Chamomile soothes."}, {"text": "Drink warm."}]}),
        )
        .await;
        let chat = server
            .mock("POST", CHAT_PATH)
            .match_query(Matcher::Any)
            .match_body(Matcher::Regex(
                r"Personalize the response for Ada\.\\n\\nContext:\\nChamomile soothes\.\\n\\nDrink warm\.".into(),
            ))
            .with_status(200)
            .with_body(json!({"choices": [{"message": {"content": "Try chamomile tea, Ada."}}]}).to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/search")
            .match_query(Matcher::UrlEncoded("query".into(), "chamomile herb".into()))
            .with_status(200)
            .with_body(r#"{"photos":[{"src":{"medium":"https://images.example/c.jpg"}}]}"#)
            .create_async()
            .await;

        let bot = SmartBot::from_config(&config(&server)).unwrap();
        let mut session = SessionContext::new("Ada", BotMode::Nature);

        let reply = bot.answer(&mut session, "  Is Chamomile good for sleep? ").await.unwrap();

        search.assert_async().await;
        chat.assert_async().await;
        assert_eq!(reply.text, "Try chamomile tea, Ada.");
        assert_eq!(reply.image.as_ref().map(|i| i.herb.as_str()), Some("chamomile"));
        assert!(reply.notices.is_empty());
        assert_eq!(session.history.len(), 2);
        assert_eq!(session.history[0].content, "Is Chamomile good for sleep?");
    }

    #[tokio::test]
    async fn empty_search_skips_the_model() {
        let mut server = Server::new_async().await;
        mock_search(&mut server, "torah-index", json!({"value": []})).await;
        let chat = server
            .mock("POST", CHAT_PATH)
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let bot = SmartBot::from_config(&config(&server)).unwrap();
        let mut session = SessionContext::new("Eli", BotMode::Torah);
        let reply = bot.answer(&mut session, "Who wrote Genesis?").await.unwrap();

        chat.assert_async().await;
        assert_eq!(reply.text, NO_CONTEXT_REPLY);
        assert!(reply.image.is_none());
    }

    #[tokio::test]
    async fn remote_failures_become_notices() {
        let mut server = Server::new_async().await;
        mock_search(&mut server, "smartbot-index", json!({"value": [{"content": "Sage."}]})).await;
        server
            .mock("POST", CHAT_PATH)
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;
        server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let bot = SmartBot::from_config(&config(&server)).unwrap();
        let mut session = SessionContext::new("Ada", BotMode::Nature);
        let reply = bot.answer(&mut session, "Sage uses?").await.unwrap();

        assert_eq!(reply.text, FALLBACK_REPLY);
        assert_eq!(reply.notices.len(), 2);
        assert!(reply.notices[0].contains("GPT call failed"));
        assert!(reply.notices[1].contains("Image fetch error"));
    }

    #[tokio::test]
    async fn search_failure_falls_back_to_no_context() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/indexes/torah-index/docs/search")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let bot = SmartBot::from_config(&config(&server)).unwrap();
        let mut session = SessionContext::new("Eli", BotMode::Torah);
        let reply = bot.answer(&mut session, "Exodus?").await.unwrap();

        assert_eq!(reply.text, NO_CONTEXT_REPLY);
        assert!(reply.notices[0].contains("Search error"));
    }

    #[tokio::test]
    async fn missing_photo_key_is_a_notice() {
        let mut server = Server::new_async().await;
        mock_search(&mut server, "smartbot-index", json!({"value": [{"content": "Mint."}]})).await;
        mock_chat(&mut server, "Mint is cooling.").await;

        let mut config = config(&server);
        config.pexels_api_key = None;
        let bot = SmartBot::from_config(&config).unwrap();
        let mut session = SessionContext::new("Ada", BotMode::Nature);
        let reply = bot.answer(&mut session, "mint?").await.unwrap();

        assert_eq!(reply.text, "Mint is cooling.");
        assert_eq!(reply.notices, vec!["⚠️ Missing PEXELS_API_KEY environment variable."]);
    }

    #[tokio::test]
    async fn guests_hit_the_quota_and_signed_in_users_do_not() {
        let mut server = Server::new_async().await;
        mock_search(&mut server, "torah-index", json!({"value": []})).await;

        let bot = SmartBot::from_config(&config(&server)).unwrap();
        let mut session = SessionContext::new("Eli", BotMode::Torah);

        bot.answer(&mut session, "one").await.unwrap();
        bot.answer(&mut session, "two").await.unwrap();
        let err = bot.answer(&mut session, "three").await.unwrap_err();
        assert!(matches!(err, AppError::QuotaExceeded(2)));
        assert_eq!(session.history.len(), 4);

        session.sign_in(Identity {
            user_id: "u-1".into(),
            email: None,
        });
        assert!(bot.answer(&mut session, "three").await.is_ok());
    }

    #[test]
    fn empty_questions_are_rejected_without_counting() {
        let server_url = "http://127.0.0.1:9";
        let config = Config {
            openai_endpoint: Some(server_url.into()),
            openai_api_key: Some("k".into()),
            openai_deployment: Some("d".into()),
            search_endpoint: Some(server_url.into()),
            search_api_key: Some("k".into()),
            ..Config::default()
        };
        let bot = SmartBot::from_config(&config).unwrap();
        let mut session = SessionContext::new("Ada", BotMode::Nature);

        assert!(matches!(bot.prepare(&mut session, "   "), Err(AppError::EmptyQuestion)));
        assert_eq!(session.remaining_guest_questions(5), Some(5));
        assert!(session.history.is_empty());
    }

    #[test]
    fn missing_configuration_is_reported_eagerly() {
        let result = SmartBot::from_config(&Config::default());
        assert!(matches!(result, Err(AppError::MissingConfig(keys)) if keys.contains(&"AZURE_OPENAI_KEY")));
    }

    #[tokio::test]
    async fn signed_in_exchanges_are_logged() {
        let mut server = Server::new_async().await;
        mock_search(&mut server, "torah-index", json!({"value": [{"content": "Psalm 23."}]})).await;
        mock_chat(&mut server, "The Lord is my shepherd.").await;
        server
            .mock("GET", "/chat-logs/logs/u-7.txt")
            .with_status(404)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/chat-logs/logs/u-7.txt")
            .match_body(Matcher::Regex(
                r"torah-index \| Q: Psalm 23\? \| A: The Lord is my shepherd\.\n$".into(),
            ))
            .with_status(201)
            .create_async()
            .await;

        let mut config = config(&server);
        config.storage_connection_string = Some(format!(
            "AccountName=herbstore;AccountKey=c2VjcmV0;BlobEndpoint={}",
            server.url()
        ));
        let bot = SmartBot::from_config(&config).unwrap();
        let mut session = SessionContext::new("Eli", BotMode::Torah);
        session.sign_in(Identity {
            user_id: "u-7".into(),
            email: Some("eli@example.com".into()),
        });

        let reply = bot.answer(&mut session, "Psalm 23?").await.unwrap();

        put.assert_async().await;
        assert!(reply.notices.is_empty());
    }
}
