use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::bot::{Reply, SmartBot};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::feed::{FeedIngestor, FeedSource};
use crate::models::{BotMode, ChatMessage, FeedItem};
use crate::services::{Identity, IdentityClient, PlantIdClient, PlantSuggestion};
use crate::session::SessionContext;
use crate::tui::{parse_command, AppAction, Command};

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Result of the one background request the app may have in flight.
pub enum TaskOutcome {
    Answer(Reply),
    Refresh(std::result::Result<Vec<FeedItem>, String>),
    Identify(std::result::Result<Vec<PlantSuggestion>, String>),
    Login(std::result::Result<Identity, String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyKind {
    Thinking,
    Refreshing,
    Identifying,
    SigningIn,
}

impl BusyKind {
    pub fn label(self) -> &'static str {
        match self {
            BusyKind::Thinking => "Thinking...",
            BusyKind::Refreshing => "Fetching latest herbal knowledge...",
            BusyKind::Identifying => "Identifying plant...",
            BusyKind::SigningIn => "Verifying sign-in...",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Naming,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub level: StatusLevel,
    pub text: String,
}

pub struct App {
    // Session
    pub stage: Stage,
    pub mode: BotMode,
    pub session: Option<SessionContext>,
    pub guest_question_limit: u32,

    // UI State
    pub input: String,
    pub status: Option<Status>,
    pub notices: Vec<String>,
    pub refresh_preview: Vec<String>,
    pub missing_config: Vec<&'static str>,
    pub show_help: bool,
    pub scroll_back: u16,
    spinner_frame: usize,

    // Async state
    pub busy: Option<BusyKind>,
    task_rx: mpsc::Receiver<TaskOutcome>,
    task_tx: mpsc::Sender<TaskOutcome>,

    // Services
    bot: Option<Arc<SmartBot>>,
    ingestor: Arc<FeedIngestor>,
    feeds: Arc<Vec<FeedSource>>,
    plant_id: Option<Arc<PlantIdClient>>,
    identity: Option<Arc<IdentityClient>>,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        let (bot, missing_config) = match SmartBot::from_config(config) {
            Ok(bot) => (Some(Arc::new(bot)), Vec::new()),
            Err(AppError::MissingConfig(missing)) => (None, missing),
            Err(e) => return Err(e),
        };

        let plant_id = config
            .plant_id_api_key
            .as_ref()
            .map(|key| PlantIdClient::new(&config.plant_id_api_url, key.clone()).map(Arc::new))
            .transpose()?;

        let identity = config
            .identity_api_key
            .as_ref()
            .map(|key| IdentityClient::new(&config.identity_api_url, key.clone()).map(Arc::new))
            .transpose()?;

        let (task_tx, task_rx) = mpsc::channel(1);

        Ok(Self {
            stage: Stage::Naming,
            mode: BotMode::default(),
            session: None,
            guest_question_limit: config.guest_question_limit,
            input: String::new(),
            status: None,
            notices: Vec::new(),
            refresh_preview: Vec::new(),
            missing_config,
            show_help: false,
            scroll_back: 0,
            spinner_frame: 0,
            busy: None,
            task_rx,
            task_tx,
            bot,
            ingestor: Arc::new(FeedIngestor::new(&config.feeds_dir)?),
            feeds: Arc::new(config.feeds.clone()),
            plant_id,
            identity,
        })
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER[self.spinner_frame % SPINNER.len()]
    }

    pub fn tick_spinner(&mut self) {
        if self.busy.is_some() {
            self.spinner_frame = self.spinner_frame.wrapping_add(1);
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        self.session
            .as_ref()
            .map(|s| s.history.as_slice())
            .unwrap_or_default()
    }

    pub fn remaining_guest_questions(&self) -> Option<u32> {
        self.session
            .as_ref()
            .and_then(|s| s.remaining_guest_questions(self.guest_question_limit))
    }

    fn set_status(&mut self, level: StatusLevel, text: impl Into<String>) {
        self.status = Some(Status {
            level,
            text: text.into(),
        });
    }

    /// Apply one user action. Returns `true` when the app should exit.
    pub fn handle_action(&mut self, action: AppAction) -> bool {
        match action {
            AppAction::Quit => return true,

            AppAction::InputChar(c) => self.input.push(c),

            AppAction::InputBackspace => {
                self.input.pop();
            }

            AppAction::ClearInput => self.input.clear(),

            AppAction::Submit => {
                let line = std::mem::take(&mut self.input);
                match self.stage {
                    Stage::Naming => self.submit_name(&line),
                    Stage::Chat => self.submit_chat(&line),
                }
            }

            AppAction::ToggleMode => {
                self.mode = self.mode.toggle();
                if let Some(session) = self.session.as_mut() {
                    session.mode = self.mode;
                }
                if !self.mode.is_herbal() {
                    self.refresh_preview.clear();
                }
                self.notices.clear();
            }

            AppAction::RefreshFeeds => self.start_refresh(),

            AppAction::OpenImage => {
                let url = self
                    .session
                    .as_ref()
                    .and_then(|s| s.last_image())
                    .map(|image| image.url.clone());
                match url {
                    Some(url) => {
                        if let Err(e) = open::that(&url) {
                            self.set_status(StatusLevel::Error, format!("Could not open image: {e}"));
                        }
                    }
                    None => self.set_status(StatusLevel::Info, "No herb photo to open yet."),
                }
            }

            AppAction::ScrollUp => self.scroll_back = self.scroll_back.saturating_add(3),

            AppAction::ScrollDown => self.scroll_back = self.scroll_back.saturating_sub(3),

            AppAction::ShowHelp => self.show_help = true,

            AppAction::HideHelp => self.show_help = false,
        }

        false
    }

    fn submit_name(&mut self, line: &str) {
        let name = line.trim();
        if name.is_empty() {
            self.set_status(StatusLevel::Warning, "Please enter your name to continue.");
            return;
        }

        self.session = Some(SessionContext::new(name, self.mode));
        self.stage = Stage::Chat;
        self.status = None;

        if !self.missing_config.is_empty() {
            let missing = self.missing_config.join(", ");
            self.set_status(
                StatusLevel::Error,
                format!("Missing configuration: {missing}. Set them and restart to chat."),
            );
        }
    }

    fn submit_chat(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        if self.busy.is_some() {
            self.set_status(StatusLevel::Warning, "Still working on the last request...");
            self.input = line.to_string();
            return;
        }

        match parse_command(line) {
            Command::Ask(question) => self.ask(&question),
            Command::Identify(path) => self.start_identify(&path),
            Command::Login(token) => self.start_login(token),
            Command::Logout => {
                if let Some(session) = self.session.as_mut() {
                    session.sign_out();
                }
                self.set_status(StatusLevel::Info, "Signed out.");
            }
            Command::Clear => {
                if let Some(session) = self.session.as_mut() {
                    session.clear_history();
                }
                self.notices.clear();
                self.scroll_back = 0;
            }
            Command::Unknown(command) => {
                self.set_status(StatusLevel::Warning, format!("Unknown command: {command}"));
            }
        }
    }

    fn ask(&mut self, question: &str) {
        if !self.missing_config.is_empty() {
            let missing = self.missing_config.join(", ");
            self.set_status(StatusLevel::Error, format!("Missing configuration: {missing}"));
            return;
        }
        let (Some(bot), Some(session)) = (self.bot.clone(), self.session.as_mut()) else {
            return;
        };

        let turn = match bot.prepare(session, question) {
            Ok(turn) => turn,
            Err(e) => {
                self.set_status(StatusLevel::Warning, e.to_string());
                return;
            }
        };

        self.busy = Some(BusyKind::Thinking);
        self.status = None;
        self.notices.clear();
        self.scroll_back = 0;

        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let reply = bot.respond(&turn).await;
            let _ = tx.send(TaskOutcome::Answer(reply)).await;
        });
    }

    fn start_refresh(&mut self) {
        if self.stage != Stage::Chat || self.busy.is_some() {
            return;
        }
        if !self.mode.is_herbal() {
            self.set_status(StatusLevel::Info, "Feed refresh is only available in Nature mode.");
            return;
        }

        self.busy = Some(BusyKind::Refreshing);
        self.status = None;

        let ingestor = Arc::clone(&self.ingestor);
        let feeds = Arc::clone(&self.feeds);
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = ingestor.ingest_all(&feeds).await.map_err(|e| e.to_string());
            let _ = tx.send(TaskOutcome::Refresh(result)).await;
        });
    }

    fn start_identify(&mut self, path: &Path) {
        let Some(client) = self.plant_id.clone() else {
            self.set_status(StatusLevel::Warning, "Set PLANT_ID_API_KEY to identify plants.");
            return;
        };

        self.busy = Some(BusyKind::Identifying);
        self.status = None;

        let path = path.to_path_buf();
        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = client.identify(&path).await.map_err(|e| e.to_string());
            let _ = tx.send(TaskOutcome::Identify(result)).await;
        });
    }

    fn start_login(&mut self, token: String) {
        let Some(client) = self.identity.clone() else {
            self.set_status(StatusLevel::Warning, "Set FIREBASE_API_KEY to enable sign-in.");
            return;
        };

        self.busy = Some(BusyKind::SigningIn);
        self.status = None;

        let tx = self.task_tx.clone();
        tokio::spawn(async move {
            let result = client.verify(&token).await.map_err(|e| e.to_string());
            let _ = tx.send(TaskOutcome::Login(result)).await;
        });
    }

    /// Poll for a finished background request (non-blocking)
    pub fn poll_task_result(&mut self) {
        if let Ok(outcome) = self.task_rx.try_recv() {
            self.busy = None;
            self.apply_outcome(outcome);
        }
    }

    fn apply_outcome(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Answer(reply) => {
                if let Some(session) = self.session.as_mut() {
                    session.record_reply(&reply);
                }
                self.notices = reply.notices;
            }

            TaskOutcome::Refresh(Ok(items)) => {
                self.refresh_preview = items
                    .iter()
                    .take(3)
                    .map(|item| item.title.clone().unwrap_or_else(|| "(untitled)".to_string()))
                    .collect();
                self.set_status(
                    StatusLevel::Success,
                    format!("✅ {} herbal articles parsed.", items.len()),
                );
            }

            TaskOutcome::Refresh(Err(e)) => {
                tracing::error!("Feed refresh failed: {}", e);
                self.set_status(StatusLevel::Error, format!("Feed refresh failed: {e}"));
            }

            TaskOutcome::Identify(Ok(suggestions)) => {
                let text = describe_suggestions(&suggestions);
                if let Some(session) = self.session.as_mut() {
                    session.history.push(ChatMessage::assistant(text, None));
                }
            }

            TaskOutcome::Identify(Err(e)) => {
                self.set_status(StatusLevel::Error, format!("❌ Plant identification failed: {e}"));
            }

            TaskOutcome::Login(Ok(identity)) => {
                let name = identity.display_name().to_string();
                if let Some(session) = self.session.as_mut() {
                    session.sign_in(identity);
                }
                self.set_status(StatusLevel::Success, format!("Signed in as {name}."));
            }

            TaskOutcome::Login(Err(e)) => {
                self.set_status(StatusLevel::Error, format!("❌ Sign-in failed: {e}"));
            }
        }
    }
}

pub fn describe_suggestions(suggestions: &[PlantSuggestion]) -> String {
    if suggestions.is_empty() {
        return "🌱 I couldn't recognize a plant in that image.".to_string();
    }
    let top = suggestions
        .iter()
        .take(3)
        .map(|s| format!("{} ({:.0}%)", s.name, s.probability * 100.0))
        .collect::<Vec<_>>()
        .join(", ");
    format!("🌱 This looks like: {top}")
}
