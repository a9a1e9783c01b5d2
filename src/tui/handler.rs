use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    Quit,
    Submit,
    InputChar(char),
    InputBackspace,
    ClearInput,
    ToggleMode,
    RefreshFeeds,
    OpenImage,
    ScrollUp,
    ScrollDown,
    ShowHelp,
    HideHelp,
}

/// What a submitted chat line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ask(String),
    Identify(PathBuf),
    Login(String),
    Logout,
    Clear,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Ask(line.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match (name, arg) {
        ("identify", path) if !path.is_empty() => Command::Identify(PathBuf::from(path)),
        ("login", token) if !token.is_empty() => Command::Login(token.to_string()),
        ("logout", _) => Command::Logout,
        ("clear", _) => Command::Clear,
        _ => Command::Unknown(line.to_string()),
    }
}

pub fn handle_key_event(key: KeyEvent, show_help: bool) -> Option<AppAction> {
    // If help is showing, any key closes it
    if show_help {
        return Some(AppAction::HideHelp);
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('c') if ctrl => Some(AppAction::Quit),
        KeyCode::Char('r') if ctrl => Some(AppAction::RefreshFeeds),
        KeyCode::Char('o') if ctrl => Some(AppAction::OpenImage),
        KeyCode::Char('u') if ctrl => Some(AppAction::ClearInput),
        KeyCode::Char(c) if !ctrl => Some(AppAction::InputChar(c)),
        KeyCode::Esc => Some(AppAction::Quit),
        KeyCode::Enter => Some(AppAction::Submit),
        KeyCode::Backspace => Some(AppAction::InputBackspace),
        KeyCode::Tab => Some(AppAction::ToggleMode),
        KeyCode::Up | KeyCode::PageUp => Some(AppAction::ScrollUp),
        KeyCode::Down | KeyCode::PageDown => Some(AppAction::ScrollDown),
        KeyCode::F(1) => Some(AppAction::ShowHelp),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn typing_goes_to_the_input() {
        assert_eq!(
            handle_key_event(key(KeyCode::Char('q')), false),
            Some(AppAction::InputChar('q'))
        );
        assert_eq!(
            handle_key_event(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL), false),
            Some(AppAction::RefreshFeeds)
        );
        assert_eq!(handle_key_event(key(KeyCode::Tab), false), Some(AppAction::ToggleMode));
    }

    #[test]
    fn any_key_closes_help() {
        assert_eq!(
            handle_key_event(key(KeyCode::Enter), true),
            Some(AppAction::HideHelp)
        );
    }

    #[test]
    fn commands_are_parsed() {
        assert_eq!(
            parse_command("  What is fennel? "),
            Command::Ask("What is fennel?".into())
        );
        assert_eq!(
            parse_command("/identify ./leaf photo.jpg"),
            Command::Identify(PathBuf::from("./leaf photo.jpg"))
        );
        assert_eq!(parse_command("/login abc.def"), Command::Login("abc.def".into()));
        assert_eq!(parse_command("/logout"), Command::Logout);
        assert_eq!(parse_command("/clear"), Command::Clear);
        assert_eq!(parse_command("/login"), Command::Unknown("/login".into()));
        assert_eq!(parse_command("/dance"), Command::Unknown("/dance".into()));
    }
}
