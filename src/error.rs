use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing configuration: {}", .0.join(", "))]
    MissingConfig(Vec<&'static str>),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Feed parse error: {0}")]
    FeedParse(#[from] feed_rs::parser::ParseFeedError),

    #[error("Chat completion failed: {0}")]
    ChatApi(String),

    #[error("Search failed: {0}")]
    SearchApi(String),

    #[error("Image lookup failed: {0}")]
    ImageApi(String),

    #[error("Plant identification failed: {0}")]
    PlantApi(String),

    #[error("Identity verification failed: {0}")]
    IdentityApi(String),

    #[error("Blob storage error: {0}")]
    BlobApi(String),

    #[error("Guest limit of {0} questions reached. Log in to keep chatting.")]
    QuotaExceeded(u32),

    #[error("Question is empty")]
    EmptyQuestion,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
