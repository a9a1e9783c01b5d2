use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::feed::FeedSource;

pub const DEFAULT_SEARCH_API_VERSION: &str = "2023-11-01";
pub const DEFAULT_PEXELS_API_URL: &str = "https://api.pexels.com/v1";
pub const DEFAULT_PLANT_ID_API_URL: &str = "https://plant.id/api/v3";
pub const DEFAULT_IDENTITY_API_URL: &str = "https://identitytoolkit.googleapis.com/v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Chat completion
    pub openai_endpoint: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_deployment: Option<String>,
    #[serde(default = "default_openai_api_version")]
    pub openai_api_version: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    // Search index
    pub search_service: Option<String>,
    /// Full base URL; takes precedence over `search_service`.
    pub search_endpoint: Option<String>,
    pub search_api_key: Option<String>,
    #[serde(default = "default_search_top_k")]
    pub search_top_k: usize,
    #[serde(default = "default_context_char_limit")]
    pub context_char_limit: usize,

    // Optional services
    pub pexels_api_key: Option<String>,
    #[serde(default = "default_pexels_api_url")]
    pub pexels_api_url: String,
    pub plant_id_api_key: Option<String>,
    #[serde(default = "default_plant_id_api_url")]
    pub plant_id_api_url: String,
    pub identity_api_key: Option<String>,
    #[serde(default = "default_identity_api_url")]
    pub identity_api_url: String,
    pub storage_connection_string: Option<String>,
    #[serde(default = "default_storage_container")]
    pub storage_container: String,

    // Session
    #[serde(default = "default_guest_question_limit")]
    pub guest_question_limit: u32,

    // Feed ingestion
    #[serde(default = "default_feeds_dir")]
    pub feeds_dir: PathBuf,
    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedSource>,
}

fn default_openai_api_version() -> String {
    "2023-05-15".to_string()
}

fn default_temperature() -> f64 {
    0.2
}

fn default_max_tokens() -> u32 {
    400
}

fn default_search_top_k() -> usize {
    3
}

fn default_context_char_limit() -> usize {
    10_000
}

fn default_pexels_api_url() -> String {
    DEFAULT_PEXELS_API_URL.to_string()
}

fn default_plant_id_api_url() -> String {
    DEFAULT_PLANT_ID_API_URL.to_string()
}

fn default_identity_api_url() -> String {
    DEFAULT_IDENTITY_API_URL.to_string()
}

fn default_storage_container() -> String {
    "chat-logs".to_string()
}

fn default_guest_question_limit() -> u32 {
    5
}

fn default_feeds_dir() -> PathBuf {
    PathBuf::from("feeds_jsonl")
}

fn default_feeds() -> Vec<FeedSource> {
    [
        ("HerbalAcademy", "https://theherbalacademy.com/feed/"),
        ("LearningHerbs", "https://learningherbs.com/feed/"),
        ("ChestnutSchool", "https://chestnutherbs.com/feed/"),
        ("WellnessMama", "https://wellnessmama.com/feed/"),
        ("DrAxe", "https://draxe.com/feed/"),
        ("ChalkboardMag", "https://thechalkboardmag.com/feed"),
        ("PlumDeluxe", "https://www.plumdeluxe.com/blog/feed"),
        ("TeaEpicure", "https://www.teaepicure.com/feed/"),
        ("NCCIH", "https://www.nccih.nih.gov/news/rss"),
    ]
    .into_iter()
    .map(|(name, url)| FeedSource::new(name, url))
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_endpoint: None,
            openai_api_key: None,
            openai_deployment: None,
            openai_api_version: default_openai_api_version(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            search_service: None,
            search_endpoint: None,
            search_api_key: None,
            search_top_k: default_search_top_k(),
            context_char_limit: default_context_char_limit(),
            pexels_api_key: None,
            pexels_api_url: default_pexels_api_url(),
            plant_id_api_key: None,
            plant_id_api_url: default_plant_id_api_url(),
            identity_api_key: None,
            identity_api_url: default_identity_api_url(),
            storage_connection_string: None,
            storage_container: default_storage_container(),
            guest_question_limit: default_guest_question_limit(),
            feeds_dir: default_feeds_dir(),
            feeds: default_feeds(),
        }
    }
}

impl Config {
    /// Load the config file (creating it with defaults when absent), then
    /// apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            let config = Config::default();
            config.save(&config_path)?;
            config
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("metatraces")
            .join("config.toml")
    }

    /// Override settings from environment variables. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let overrides: [(&str, &mut Option<String>); 9] = [
            ("AZURE_OPENAI_ENDPOINT", &mut self.openai_endpoint),
            ("AZURE_OPENAI_KEY", &mut self.openai_api_key),
            ("DEPLOYMENT_NAME", &mut self.openai_deployment),
            ("AZURE_SEARCH_SERVICE", &mut self.search_service),
            ("AZURE_SEARCH_KEY", &mut self.search_api_key),
            ("PEXELS_API_KEY", &mut self.pexels_api_key),
            ("PLANT_ID_API_KEY", &mut self.plant_id_api_key),
            ("FIREBASE_API_KEY", &mut self.identity_api_key),
            ("AZURE_STORAGE_CONNECTION_STRING", &mut self.storage_connection_string),
        ];
        for (key, slot) in overrides {
            if let Some(value) = get(key) {
                *slot = Some(value);
            }
        }

        if let Some(container) = get("AZURE_STORAGE_CONTAINER") {
            self.storage_container = container;
        }
    }

    /// Names of the settings the chat cannot run without.
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let absent = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());

        if absent(&self.openai_endpoint) {
            missing.push("AZURE_OPENAI_ENDPOINT");
        }
        if absent(&self.openai_api_key) {
            missing.push("AZURE_OPENAI_KEY");
        }
        if absent(&self.openai_deployment) {
            missing.push("DEPLOYMENT_NAME");
        }
        if absent(&self.search_service) && absent(&self.search_endpoint) {
            missing.push("AZURE_SEARCH_SERVICE");
        }
        if absent(&self.search_api_key) {
            missing.push("AZURE_SEARCH_KEY");
        }
        missing
    }

    pub fn ensure_chat_ready(&self) -> Result<()> {
        let missing = self.missing_settings();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::MissingConfig(missing))
        }
    }

    pub fn search_base_url(&self) -> Option<String> {
        self.search_endpoint.clone().or_else(|| {
            self.search_service
                .as_ref()
                .map(|service| format!("https://{service}.search.windows.net"))
        })
    }
}
