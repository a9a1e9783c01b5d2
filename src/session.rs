use crate::bot::Reply;
use crate::models::{BotMode, ChatMessage, HerbImage};
use crate::services::Identity;

/// Everything one interactive user accumulates. Each handler receives it
/// explicitly; nothing here is shared between sessions.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub username: String,
    pub mode: BotMode,
    pub history: Vec<ChatMessage>,
    pub identity: Option<Identity>,
    guest_questions_used: u32,
}

impl SessionContext {
    pub fn new(username: impl Into<String>, mode: BotMode) -> Self {
        Self {
            username: username.into(),
            mode,
            history: Vec::new(),
            identity: None,
            guest_questions_used: 0,
        }
    }

    pub fn is_guest(&self) -> bool {
        self.identity.is_none()
    }

    /// Questions left before the guest limit; `None` once signed in.
    pub fn remaining_guest_questions(&self, limit: u32) -> Option<u32> {
        self.is_guest()
            .then(|| limit.saturating_sub(self.guest_questions_used))
    }

    pub(crate) fn count_guest_question(&mut self) {
        if self.is_guest() {
            self.guest_questions_used += 1;
        }
    }

    pub fn sign_in(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }

    pub fn sign_out(&mut self) {
        self.identity = None;
    }

    pub fn record_question(&mut self, question: &str) {
        self.history.push(ChatMessage::user(question));
    }

    pub fn record_reply(&mut self, reply: &Reply) {
        self.history
            .push(ChatMessage::assistant(reply.text.clone(), reply.image.clone()));
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Most recent herb photo in the conversation.
    pub fn last_image(&self) -> Option<&HerbImage> {
        self.history.iter().rev().find_map(|m| m.image.as_ref())
    }
}
