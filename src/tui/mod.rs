mod handler;
mod ui;

pub use handler::{handle_key_event, parse_command, AppAction, Command};
pub use ui::draw;
