//! Terminal User Interface Module
//!
//! Interactive front end for the upload → instruct → download workflow.
//!
//! # Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │        TableScrub  natural-language find & replace              │
//! ├─ Pipeline ──────────────────────────────────────────────────────┤
//! │ ✓ Upload → ● Preview → ○ Process → ○ Result   contacts.csv · …  │
//! ├─ Data preview ─────────────────────────────┬─ Result ───────────┤
//! │ email          name                        │ Total rows  2      │
//! │ a@b.com        Ann                         │ Matched     2      │
//! ├────────────────────────────────────────────┴────────────────────┤
//! │ ✗ error or notice line                                          │
//! ├─ Instruction (0/1000) ──────────────────────────────────────────┤
//! │ replace email addresses with REDACTED                           │
//! └─────────────────────────────────────────────────────────────────┘
//!  Ready │ [Enter] Process [Ctrl+O] Open [Ctrl+D] Download ...
//! ```

pub mod app;
pub mod event;
pub mod theme;
pub mod ui;
pub mod widgets;

pub use app::{App, InputMode, Notice, View};
pub use event::{AppAction, EventHandler};

use crate::config::Config;
use crate::session::Session;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::path::PathBuf;
use tracing::{error, info};

/// Type alias for our terminal backend
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Initialize the terminal for TUI mode
pub fn init_terminal() -> anyhow::Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore the terminal to its original state
pub fn restore_terminal(terminal: &mut Tui) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the TUI, optionally uploading `file` right away
pub async fn run(config: Config, file: Option<PathBuf>) -> anyhow::Result<()> {
    info!(api = %config.api.base_url, "starting TUI");

    let session = Session::from_config(&config)?;
    let mut app = App::new(config, session);
    if let Some(path) = file {
        app.open_path(path).await;
    }

    let mut terminal = init_terminal()?;
    let mut events = EventHandler::new(std::time::Duration::from_millis(100));

    let result = run_app(&mut terminal, &mut app, &mut events).await;

    if let Err(e) = restore_terminal(&mut terminal) {
        error!("Failed to restore terminal: {}", e);
    }

    result
}

/// Main application loop
async fn run_app(
    terminal: &mut Tui,
    app: &mut App,
    events: &mut EventHandler,
) -> anyhow::Result<()> {
    loop {
        app.set_viewport_rows(ui::table_viewport_rows(terminal.size()?.height));
        terminal.draw(|frame| ui::render(frame, app))?;

        // Ticks arrive every 100ms, so responses are picked up promptly
        let Some(action) = events.next().await else {
            break;
        };

        app.poll_events();
        match action {
            AppAction::Quit | AppAction::ForceQuit => break,
            action => app.handle_action(action).await,
        }

        if app.should_quit {
            break;
        }
    }

    info!("TUI exited normally");
    Ok(())
}
