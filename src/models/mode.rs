use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotMode {
    #[default]
    Nature,
    Torah,
}

impl BotMode {
    pub fn index_name(self) -> &'static str {
        match self {
            BotMode::Nature => "smartbot-index",
            BotMode::Torah => "torah-index",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BotMode::Nature => "Nature's Pleasure 🌿",
            BotMode::Torah => "Torah 🕎",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            BotMode::Nature => "🌿 Nature's Pleasure Bot",
            BotMode::Torah => "🕎 Torah SmartBot",
        }
    }

    pub fn welcome(self, username: &str) -> String {
        match self {
            BotMode::Nature => format!(
                "Welcome, {username}! Ask about herbs, teas, or holistic healing."
            ),
            BotMode::Torah => format!(
                "Welcome, {username}! Ask about scripture, history, or Hebrew context."
            ),
        }
    }

    /// Feed refresh and herb photos only make sense for the herbal bot.
    pub fn is_herbal(self) -> bool {
        matches!(self, BotMode::Nature)
    }

    pub fn toggle(self) -> Self {
        match self {
            BotMode::Nature => BotMode::Torah,
            BotMode::Torah => BotMode::Nature,
        }
    }
}

impl std::str::FromStr for BotMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nature" | "herbal" => Ok(BotMode::Nature),
            "torah" => Ok(BotMode::Torah),
            other => Err(format!("unknown mode '{other}' (expected nature or torah)")),
        }
    }
}
