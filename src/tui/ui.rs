use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Stage, StatusLevel};
use crate::models::{ChatMessage, Role};

pub fn draw(frame: &mut Frame, app: &App) {
    match app.stage {
        Stage::Naming => render_name_prompt(frame, app),
        Stage::Chat => render_chat(frame, app),
    }

    // Render help popup if active
    if app.show_help {
        render_help(frame);
    }
}

fn render_name_prompt(frame: &mut Frame, app: &App) {
    let area = centered_rect(60, 40, frame.area());

    let block = Block::default()
        .title(" METATRACES-AI ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Mode
            Constraint::Length(1), // Prompt
            Constraint::Length(3), // Input
            Constraint::Min(0),    // Status
        ])
        .split(inner);

    let mode = Line::from(vec![
        Span::raw(" Bot mode: "),
        Span::styled(app.mode.label(), mode_style(app)),
        Span::styled("  (Tab to switch)", Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(mode), chunks[0]);

    frame.render_widget(
        Paragraph::new(" 🧑 Your name (nickname or first name is fine):"),
        chunks[1],
    );
    render_input(frame, app, chunks[2], " Name ");
    render_status(frame, app, chunks[3]);
}

fn render_chat(frame: &mut Frame, app: &App) {
    let notice_height = (app.notices.len() as u16).min(3);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),             // Title + welcome
            Constraint::Min(0),                // Conversation
            Constraint::Length(notice_height), // Notices from the last answer
            Constraint::Length(1),             // Status line
            Constraint::Length(3),             // Input
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);
    render_history(frame, app, chunks[1]);
    render_notices(frame, app, chunks[2]);
    render_status(frame, app, chunks[3]);
    render_input(frame, app, chunks[4], " Ask me anything... ");
}

fn mode_style(app: &App) -> Style {
    if app.mode.is_herbal() {
        Style::default().fg(Color::LightGreen)
    } else {
        Style::default().fg(Color::LightBlue)
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let username = app.session.as_ref().map_or("", |s| s.username.as_str());

    let block = Block::default()
        .title(format!(" {} ", app.mode.title()))
        .borders(Borders::ALL)
        .border_style(mode_style(app));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let account = match (
        app.session.as_ref().and_then(|s| s.identity.as_ref()),
        app.remaining_guest_questions(),
    ) {
        (Some(identity), _) => format!("Signed in as {}", identity.display_name()),
        (None, Some(left)) => format!("Guest: {left} questions left"),
        (None, None) => String::new(),
    };

    let mut second = vec![Span::styled(account, Style::default().fg(Color::DarkGray))];
    if app.mode.is_herbal() && !app.refresh_preview.is_empty() {
        second.push(Span::styled(
            format!("  📦 Parsed: {}", app.refresh_preview.join(" | ")),
            Style::default().fg(Color::Yellow),
        ));
    }

    let lines = vec![
        Line::from(app.mode.welcome(username)),
        Line::from(second),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_history(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL);
    let inner = block.inner(area);

    let lines = history_lines(app.history(), inner.width as usize);
    let (start, end) = visible_window(lines.len(), inner.height as usize, app.scroll_back as usize);
    let visible: Vec<Line> = lines[start..end].to_vec();

    let title = if start + inner.height as usize >= lines.len() {
        " Conversation ".to_string()
    } else {
        " Conversation (scrolled, ↓ for latest) ".to_string()
    };

    frame.render_widget(Paragraph::new(visible).block(block.title(title)), area);
}

/// Flatten the conversation into display lines wrapped to `width`.
fn history_lines(history: &[ChatMessage], width: usize) -> Vec<Line<'static>> {
    let width = width.max(10);
    let mut lines = Vec::new();

    for message in history {
        let (label, color) = match message.role {
            Role::User => ("🧑 You", Color::Cyan),
            Role::Assistant => ("🤖 SmartBot", Color::LightGreen),
        };
        lines.push(Line::from(Span::styled(
            label,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));

        for paragraph in message.content.lines() {
            if paragraph.trim().is_empty() {
                lines.push(Line::from(""));
                continue;
            }
            for wrapped in textwrap::wrap(paragraph, width) {
                lines.push(Line::from(wrapped.into_owned()));
            }
        }

        if let Some(image) = &message.image {
            lines.push(Line::from(Span::styled(
                format!("🖼  {}: {}  (Ctrl+O to open)", image.caption(), image.url),
                Style::default().fg(Color::Magenta),
            )));
        }

        lines.push(Line::from(""));
    }

    lines
}

/// Window of `height` lines ending `scroll_back` lines above the bottom.
fn visible_window(total: usize, height: usize, scroll_back: usize) -> (usize, usize) {
    let max_start = total.saturating_sub(height);
    let start = max_start - scroll_back.min(max_start);
    let end = (start + height).min(total);
    (start, end)
}

fn render_notices(frame: &mut Frame, app: &App, area: Rect) {
    if area.height == 0 {
        return;
    }
    let lines: Vec<Line> = app
        .notices
        .iter()
        .map(|n| Line::from(Span::styled(n.clone(), Style::default().fg(Color::Yellow))))
        .collect();
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let (text, style) = if let Some(busy) = app.busy {
        (
            format!("{} {}", app.spinner(), busy.label()),
            Style::default().fg(Color::Yellow),
        )
    } else if let Some(status) = &app.status {
        let color = match status.level {
            StatusLevel::Info => Color::White,
            StatusLevel::Success => Color::Green,
            StatusLevel::Warning => Color::Yellow,
            StatusLevel::Error => Color::Red,
        };
        (status.text.clone(), Style::default().fg(color))
    } else {
        let hint = if app.mode.is_herbal() {
            "Enter:send  Tab:mode  Ctrl+R:refresh feeds  Ctrl+O:open photo  F1:help  Esc:quit"
        } else {
            "Enter:send  Tab:mode  F1:help  Esc:quit"
        };
        (hint.to_string(), Style::default().fg(Color::DarkGray))
    };

    frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_input(frame: &mut Frame, app: &App, area: Rect, title: &str) {
    let disabled = app.stage == Stage::Chat && !app.missing_config.is_empty();

    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if disabled { Color::DarkGray } else { Color::Yellow }));

    let input_text = if disabled && app.input.is_empty() {
        "Chat disabled until configuration is supplied (/commands still work)".to_string()
    } else {
        format!("> {}_", app.input)
    };
    let paragraph = Paragraph::new(input_text)
        .block(block)
        .style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, area);
}

fn render_help(frame: &mut Frame) {
    let area = centered_rect(50, 60, frame.area());

    let help_text = vec![
        "",
        " Chat:",
        "   Enter      Send question",
        "   Tab        Switch Nature / Torah bot",
        "   ↑ / ↓      Scroll conversation",
        "   Ctrl+U     Clear input",
        "",
        " Nature mode:",
        "   Ctrl+R     Refresh herbal feeds",
        "   Ctrl+O     Open latest herb photo",
        "",
        " Commands:",
        "   /identify <image>   Identify a plant",
        "   /login <id-token>   Sign in",
        "   /logout             Sign out",
        "   /clear              Clear conversation",
        "",
        " General:",
        "   F1         Toggle this help",
        "   Esc        Quit",
        "",
        " Press any key to close",
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(help_text.join("\n"))
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(ratatui::widgets::Clear, area);
    frame.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::HerbImage;
    use crate::tui::AppAction;
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn window_sticks_to_the_bottom() {
        assert_eq!(visible_window(50, 10, 0), (40, 50));
        assert_eq!(visible_window(50, 10, 5), (35, 45));
        assert_eq!(visible_window(50, 10, 500), (0, 10));
        assert_eq!(visible_window(4, 10, 3), (0, 4));
    }

    #[test]
    fn history_lines_wrap_and_show_photos() {
        let history = vec![
            ChatMessage::user("What about lemon balm?"),
            ChatMessage::assistant(
                "Lemon balm is a calming member of the mint family.",
                Some(HerbImage {
                    herb: "lemon balm".into(),
                    url: "https://images.example/lb.jpg".into(),
                }),
            ),
        ];

        let lines = history_lines(&history, 20);
        let text: Vec<String> = lines.iter().map(|l| l.to_string()).collect();

        assert_eq!(text[0], "🧑 You");
        assert!(text.iter().any(|l| l.contains("Lemon Balm Herb")));
        assert!(text.iter().filter(|l| l.contains("calming") || l.contains("mint")).count() >= 1);
        assert!(text.iter().all(|l| !l.contains("calming member of the mint family")));
    }

    #[test]
    fn renders_both_stages() {
        let mut app = App::new(&Config::default()).unwrap();
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();

        terminal.draw(|frame| draw(frame, &app)).unwrap();
        let buffer = format!("{:?}", terminal.backend().buffer());
        assert!(buffer.contains("METATRACES-AI"));

        for c in "Ada".chars() {
            app.handle_action(AppAction::InputChar(c));
        }
        app.handle_action(AppAction::Submit);
        terminal.draw(|frame| draw(frame, &app)).unwrap();
        let buffer = format!("{:?}", terminal.backend().buffer());
        assert!(buffer.contains("Welcome, Ada!"));
        assert!(buffer.contains("Chat disabled"));

        for c in "/clear".chars() {
            app.handle_action(AppAction::InputChar(c));
        }
        terminal.draw(|frame| draw(frame, &app)).unwrap();
        let buffer = format!("{:?}", terminal.backend().buffer());
        assert!(buffer.contains("> /clear_"));
    }
}
