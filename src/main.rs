use std::io;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use crossterm::event::KeyEventKind;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;

mod ai;
mod app;
mod bot;
mod config;
mod error;
mod feed;
mod models;
mod services;
mod session;
mod tui;

use app::App;
use bot::SmartBot;
use config::Config;
use error::{AppError, Result};
use feed::FeedIngestor;
use models::BotMode;
use services::{IdentityClient, PlantIdClient};
use session::SessionContext;
use tui::{draw, handle_key_event};

/// Herbal and scripture smartbot backed by a hosted search index.
#[derive(Parser)]
#[command(name = "metatraces", version, about)]
struct Cli {
    /// Path to the TOML config file (defaults to the user config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive terminal chat (default)
    Chat,
    /// Refresh the herbal feeds into per-source JSONL files
    Ingest {
        /// Output directory (overrides `feeds_dir`)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Ask one question without the TUI
    Ask {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "nature")]
        mode: BotMode,
        /// Verified users are not subject to the guest limit and get a transcript log
        #[arg(long)]
        id_token: Option<String>,
        question: String,
    },
    /// Identify the plant in an image
    Identify { image: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_tui(&config).await,
        Commands::Ingest { out } => ingest(&config, out).await,
        Commands::Ask {
            name,
            mode,
            id_token,
            question,
        } => ask(&config, name, mode, id_token, &question).await,
        Commands::Identify { image } => identify(&config, &image).await,
    }
}

async fn ingest(config: &Config, out: Option<PathBuf>) -> Result<()> {
    let ingestor = FeedIngestor::new(out.unwrap_or_else(|| config.feeds_dir.clone()))?;
    let items = ingestor.ingest_all(&config.feeds).await?;

    for item in items.iter().take(3) {
        println!("📦 {}", item.title.as_deref().unwrap_or("(untitled)"));
    }
    println!(
        "✅ {} herbal articles parsed into {}",
        items.len(),
        ingestor.out_dir().display()
    );
    Ok(())
}

async fn ask(
    config: &Config,
    name: String,
    mode: BotMode,
    id_token: Option<String>,
    question: &str,
) -> Result<()> {
    let bot = SmartBot::from_config(config)?;
    let mut session = SessionContext::new(name, mode);

    if let Some(token) = id_token {
        let key = config
            .identity_api_key
            .clone()
            .ok_or(AppError::MissingConfig(vec!["FIREBASE_API_KEY"]))?;
        let identity = IdentityClient::new(&config.identity_api_url, key)?
            .verify(&token)
            .await?;
        session.sign_in(identity);
    }

    let reply = bot.answer(&mut session, question).await?;

    for notice in &reply.notices {
        eprintln!("{notice}");
    }
    println!("{}", reply.text);
    if let Some(image) = &reply.image {
        println!("\n🖼  {}: {}", image.caption(), image.url);
    }
    Ok(())
}

async fn identify(config: &Config, image: &std::path::Path) -> Result<()> {
    let key = config
        .plant_id_api_key
        .clone()
        .ok_or(AppError::MissingConfig(vec!["PLANT_ID_API_KEY"]))?;
    let suggestions = PlantIdClient::new(&config.plant_id_api_url, key)?
        .identify(image)
        .await?;

    println!("{}", app::describe_suggestions(&suggestions));
    Ok(())
}

async fn run_tui(config: &Config) -> Result<()> {
    let mut app = App::new(config)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|frame| draw(frame, app))?;

        // Advance spinner animation
        app.tick_spinner();

        // Pick up a finished answer, refresh, or sign-in
        app.poll_task_result();

        // Poll with a timeout so background tasks can finish between keys
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(action) = handle_key_event(key, app.show_help) {
                        if app.handle_action(action) {
                            return Ok(());
                        }
                    }
                }
            }
        }

        // Let spawned tasks make progress on the runtime
        tokio::task::yield_now().await;
    }
}
