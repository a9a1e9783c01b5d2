use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HerbImage {
    pub herb: String,
    pub url: String,
}

impl HerbImage {
    /// "lemon balm" -> "Lemon Balm Herb"
    pub fn caption(&self) -> String {
        let title = self
            .herb
            .split_whitespace()
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        format!("{title} Herb")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<HerbImage>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            image: None,
        }
    }

    pub fn assistant(content: impl Into<String>, image: Option<HerbImage>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            image,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caption_title_cases_each_word() {
        let image = HerbImage {
            herb: "lemon balm".into(),
            url: "https://images.example/1.jpg".into(),
        };
        assert_eq!(image.caption(), "Lemon Balm Herb");
    }
}
