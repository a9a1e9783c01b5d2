mod chat;
mod feed_item;
mod mode;

pub use chat::{ChatMessage, HerbImage, Role};
pub use feed_item::FeedItem;
pub use mode::BotMode;
