mod chat;
mod prompt;

pub use chat::ChatClient;
pub use prompt::{build_context, build_prompt};
