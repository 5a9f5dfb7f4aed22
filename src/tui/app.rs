//! Application State
//!
//! Wraps a [`Session`] with the interactive bits: the two input lines, table
//! scrolling, the help overlay and transient notices.

use crate::config::Config;
use crate::controller::{ControllerError, Message};
use crate::session::Session;
use crate::tui::event::AppAction;
use crate::types::{AppError, PipelineState, Row};
use std::path::PathBuf;
use tracing::{info, warn};
use tui_textarea::TextArea;

const INSTRUCTION_PLACEHOLDER: &str =
    "Describe what to find and replace, e.g. \"replace email addresses with REDACTED\"";
const PATH_PLACEHOLDER: &str = "Path to a .csv, .xlsx or .xls file";

/// Current view/screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Main,
    Help,
}

/// Which line receives typed characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Instruction,
    FilePath,
}

/// One-line feedback that is not a pipeline error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Warning(String),
}

/// Main application state
pub struct App {
    pub config: Config,
    pub session: Session,

    pub view: View,
    pub input_mode: InputMode,
    pub should_quit: bool,

    pub instruction: TextArea<'static>,
    pub path_input: TextArea<'static>,
    pub notice: Option<Notice>,

    pub table_offset: usize,
    pub page_size: usize,

    last_state: PipelineState,
}

impl App {
    pub fn new(config: Config, session: Session) -> Self {
        Self {
            config,
            session,
            view: View::Main,
            input_mode: InputMode::Instruction,
            should_quit: false,
            instruction: text_input(INSTRUCTION_PLACEHOLDER),
            path_input: text_input(PATH_PLACEHOLDER),
            notice: None,
            table_offset: 0,
            page_size: 10,
            last_state: PipelineState::Idle,
        }
    }

    /// Rows shown in the table: the processed rows once a result exists,
    /// otherwise the uploaded preview.
    pub fn visible_rows(&self) -> &[Row] {
        let controller = self.session.controller();
        if let Some(rows) = controller.exportable_rows() {
            return rows;
        }
        controller.dataset().map(|d| d.rows()).unwrap_or_default()
    }

    /// Column headers matching [`App::visible_rows`]
    pub fn visible_columns(&self) -> Vec<String> {
        let controller = self.session.controller();
        match controller.exportable_rows() {
            Some(rows) => rows
                .first()
                .map(|row| row.keys().cloned().collect())
                .unwrap_or_default(),
            None => controller
                .dataset()
                .map(|d| d.columns().to_vec())
                .unwrap_or_default(),
        }
    }

    /// Apply backend responses that arrived since the last frame
    pub fn poll_events(&mut self) {
        if self.session.poll_events() == 0 {
            return;
        }

        let state = self.session.state();
        if state != self.last_state {
            // New table content starts at the top
            if matches!(state, PipelineState::DatasetReady | PipelineState::ResultReady) {
                self.table_offset = 0;
            }
            self.last_state = state;
        }
    }

    /// Request an upload of the file at `path`
    pub async fn open_path(&mut self, path: PathBuf) {
        self.notice = None;
        self.table_offset = 0;
        match self.session.upload_path(&path).await {
            Ok(_) => info!(path = %path.display(), "upload requested"),
            Err(AppError::Controller(ControllerError::Validation(_))) => {}
            Err(e) => self.warn_unrecorded(&e),
        }
        self.last_state = self.session.state();
    }

    /// Handle a user action
    pub async fn handle_action(&mut self, action: AppAction) {
        if self.view == View::Help {
            // Any key closes help
            if !matches!(action, AppAction::Tick) {
                self.view = View::Main;
            }
            return;
        }

        match action {
            AppAction::Quit | AppAction::ForceQuit => {
                self.should_quit = true;
            }
            AppAction::Submit => match self.input_mode {
                InputMode::FilePath => self.submit_path().await,
                InputMode::Instruction => self.submit_instruction(),
            },
            AppAction::OpenFile => {
                self.input_mode = match self.input_mode {
                    InputMode::Instruction => InputMode::FilePath,
                    InputMode::FilePath => InputMode::Instruction,
                };
            }
            AppAction::Download => self.download(),
            AppAction::Reset => {
                self.session.reset();
                self.instruction = text_input(INSTRUCTION_PLACEHOLDER);
                self.input_mode = InputMode::Instruction;
                self.notice = None;
                self.table_offset = 0;
                self.last_state = self.session.state();
            }
            AppAction::ToggleHelp => {
                self.view = View::Help;
            }
            AppAction::Escape => {
                if self.input_mode == InputMode::FilePath {
                    self.input_mode = InputMode::Instruction;
                } else if self.session.controller().error().is_some() {
                    self.session.dismiss_error();
                    self.last_state = self.session.state();
                } else {
                    self.notice = None;
                }
            }
            AppAction::ScrollUp => {
                self.table_offset = self.table_offset.saturating_sub(1);
            }
            AppAction::ScrollDown => {
                self.table_offset = (self.table_offset + 1).min(self.max_offset());
            }
            AppAction::ScrollPageUp => {
                self.table_offset = self.table_offset.saturating_sub(self.page_size);
            }
            AppAction::ScrollPageDown => {
                self.table_offset = (self.table_offset + self.page_size).min(self.max_offset());
            }
            AppAction::Input(key) => match self.input_mode {
                InputMode::Instruction => {
                    self.instruction.input(key);
                }
                InputMode::FilePath => {
                    self.path_input.input(key);
                }
            },
            AppAction::Tick => {}
        }
    }

    /// Update the page size from the table viewport height
    pub fn set_viewport_rows(&mut self, rows: u16) {
        self.page_size = usize::from(rows.max(1));
        self.table_offset = self.table_offset.min(self.max_offset());
    }

    pub fn instruction_text(&self) -> String {
        self.instruction.lines().join("\n")
    }

    fn max_offset(&self) -> usize {
        self.visible_rows().len().saturating_sub(self.page_size)
    }

    async fn submit_path(&mut self) {
        let path = self.path_input.lines().join("").trim().to_string();
        if path.is_empty() {
            return;
        }

        self.input_mode = InputMode::Instruction;
        self.path_input = text_input(PATH_PLACEHOLDER);
        self.open_path(PathBuf::from(path)).await;
    }

    fn submit_instruction(&mut self) {
        self.notice = None;
        let instruction = self.instruction_text();
        match self.session.send(Message::ProcessRequested { instruction }) {
            Ok(_) => self.last_state = self.session.state(),
            Err(ControllerError::Validation(_)) => {}
            Err(e) => self.warn_unrecorded(&e),
        }
    }

    /// Show a failure the controller did not record, replacing any older
    /// error so the latest problem is the one on screen
    fn warn_unrecorded(&mut self, error: &dyn std::fmt::Display) {
        if self.session.controller().error().is_some() {
            self.session.dismiss_error();
        }
        warn!(error = %error, "request refused");
        self.notice = Some(Notice::Warning(error.to_string()));
    }

    fn download(&mut self) {
        let dir = self.config.export.output_dir.clone();
        self.notice = Some(match self.session.download(&dir) {
            Ok(path) => Notice::Info(format!("Saved {}", path.display())),
            Err(e) => {
                warn!(error = %e, "download failed");
                Notice::Warning(e.to_string())
            }
        });
    }
}

fn text_input(placeholder: &'static str) -> TextArea<'static> {
    let mut input = TextArea::default();
    input.set_cursor_line_style(ratatui::style::Style::default());
    input.set_placeholder_text(placeholder);
    input
}
