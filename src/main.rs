//! tide-tui - A TUI music player for the TIDAL streaming service.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use color_eyre::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui_image::picker::Picker;
use tokio::sync::mpsc;

mod action;
mod app;
mod client;
mod config;
mod download;
mod images;
mod pages;
mod player;
mod tui;
mod ui;

use action::{Action, SidebarDestination, TrackAction};
use app::App;
use config::Config;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "tide-tui")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install panic hooks
    tui::install_hooks()?;

    // Initialize logging
    let log_file = dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tide-tui")
        .join("tide-tui.log");

    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_subscriber::fmt::layer()
        .with_writer(std::fs::File::create(&log_file)?)
        .with_ansi(false);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::sink) // Don't write to stdout in TUI mode
        .finish()
        .with(file_appender)
        .try_init()
        .ok();

    // Parse command-line arguments
    let args = Args::parse();

    // Load configuration
    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Failed to load settings, using defaults: {}", e);
            Config::default()
        }
    };

    // Initialize terminal
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, config).await;

    // Restore terminal
    tui::restore()?;

    result
}

/// Run the interactive loop until the user quits.
async fn run(terminal: &mut tui::Tui, config: Config) -> Result<()> {
    // Create action channel
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    // Terminal graphics need the terminal in raw mode to be queried
    let picker = Picker::from_query_stdio().ok();

    // Create and initialize application
    let mut app = App::new(config, action_tx.clone(), picker);
    let result = match app.init().await {
        Ok(()) => event_loop(terminal, &mut app, &action_tx, &mut action_rx).await,
        Err(e) => Err(e),
    };

    // Settings are saved and playback stopped however the loop ended
    app.shutdown();

    result
}

async fn event_loop(
    terminal: &mut tui::Tui,
    app: &mut App,
    action_tx: &mpsc::UnboundedSender<Action>,
    action_rx: &mut mpsc::UnboundedReceiver<Action>,
) -> Result<()> {
    let tick_rate = Duration::from_millis(100);

    loop {
        // Render UI
        terminal.draw(|frame| ui::render(frame, app))?;

        // Handle events with timeout
        if event::poll(tick_rate)? {
            match event::read()? {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Press {
                        let action = handle_key_event(key.code, key.modifiers, app);
                        if action != Action::None {
                            action_tx.send(action)?;
                        }
                    }
                }
                Event::Resize(width, height) => {
                    action_tx.send(Action::Resize(width, height))?;
                }
                _ => {}
            }
        }

        // Send tick action
        action_tx.send(Action::Tick)?;

        // Process all pending actions
        while let Ok(action) = action_rx.try_recv() {
            if let Err(e) = app.handle_action(action).await {
                app.set_error(e.to_string());
            }
        }

        // Check if we should quit
        if app.should_quit {
            return Ok(());
        }
    }
}

/// Map key events to actions.
fn handle_key_event(code: KeyCode, modifiers: KeyModifiers, app: &App) -> Action {
    // Handle text entry separately
    if app.entry.active {
        return handle_entry_key(code);
    }

    // Handle help overlay
    if app.show_help {
        return match code {
            KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => Action::HideHelp,
            _ => Action::None,
        };
    }

    // Global keys
    match code {
        KeyCode::Char('q') => return Action::Quit,
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return Action::Quit,
        _ => {}
    }

    match code {
        // Navigation
        KeyCode::Up | KeyCode::Char('k') => Action::NavigateUp,
        KeyCode::Down | KeyCode::Char('j') => Action::NavigateDown,
        KeyCode::Left | KeyCode::Char('h') => Action::FocusLeft,
        KeyCode::Right | KeyCode::Char('l') => Action::FocusRight,
        KeyCode::Enter => Action::Select,
        KeyCode::Esc | KeyCode::Backspace => Action::Back,
        KeyCode::Char('g') => Action::JumpToTop,
        KeyCode::Char('G') => Action::JumpToBottom,

        // Sidebar destinations
        KeyCode::Char(c @ '1'..='7') => {
            let index = c as usize - '1' as usize;
            SidebarDestination::ALL
                .get(index)
                .map_or(Action::None, |dest| Action::Sidebar(*dest))
        }

        // Search
        KeyCode::Char('/') => Action::OpenSearch,
        KeyCode::Char('w') => Action::OpenNewPlaylist,

        // Playback
        KeyCode::Char(' ') => Action::PlayPause,
        KeyCode::Char('n') => Action::NextTrack,
        KeyCode::Char('p') => Action::PreviousTrack,
        KeyCode::Char('s') => Action::ToggleShuffle,
        KeyCode::Char('r') => Action::CycleRepeat,
        KeyCode::Char('.') | KeyCode::Char('>') => Action::SeekForward,
        KeyCode::Char(',') | KeyCode::Char('<') => Action::SeekBackward,
        KeyCode::Char(']') => Action::SeekForwardLarge,
        KeyCode::Char('[') => Action::SeekBackwardLarge,
        KeyCode::Char('P') => Action::PlayPage,
        KeyCode::Char('S') => Action::ShufflePage,

        // Volume
        KeyCode::Char('+') | KeyCode::Char('=') => Action::VolumeUp,
        KeyCode::Char('-') => Action::VolumeDown,

        // Track rows
        KeyCode::Char('a') => Action::Track(TrackAction::AddToQueue),
        KeyCode::Char('N') => Action::Track(TrackAction::PlayNext),
        KeyCode::Char('m') => Action::Track(TrackAction::StartRadio),
        KeyCode::Char('f') => Action::Track(TrackAction::AddToCollection),
        KeyCode::Char('y') => Action::Track(TrackAction::AddToPlaylist),
        KeyCode::Char('A') => Action::OpenSelectedAlbum,
        KeyCode::Char('o') => Action::OpenSelectedArtist,
        KeyCode::Char('C') => Action::OpenPlayingArtist,
        KeyCode::Char('T') => Action::OpenPlayingRadio,

        // Queue
        KeyCode::Char('c') => Action::ClearQueue,
        KeyCode::Char('d') | KeyCode::Delete => Action::RemoveSelectedFromQueue,

        // Lyrics
        KeyCode::Char('L') => Action::ToggleLyrics,

        // Account
        KeyCode::Char('I') => Action::Login,
        KeyCode::Char('O') => Action::Logout,
        KeyCode::Char('Q') => Action::CycleQuality,
        KeyCode::Char('D') => Action::Download,

        // Help
        KeyCode::Char('?') => Action::ShowHelp,

        // Clear message
        KeyCode::Char('x') => Action::ClearMessage,

        _ => Action::None,
    }
}

/// Handle key events while a text entry is open.
fn handle_entry_key(code: KeyCode) -> Action {
    match code {
        KeyCode::Esc => Action::CloseEntry,
        KeyCode::Enter => Action::EntrySubmit,
        KeyCode::Backspace => Action::EntryBackspace,
        KeyCode::Char(c) => Action::EntryInput(c),
        _ => Action::None,
    }
}

use tracing_subscriber::prelude::*;
