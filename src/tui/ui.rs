//! UI Rendering
//!
//! Main UI layout and rendering logic for the TUI.

use crate::tui::app::{App, InputMode, Notice, View};
use crate::tui::theme::{Glyph, Theme};
use crate::tui::widgets;
use crate::types::PipelineState;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

const HEADER_HEIGHT: u16 = 3;
const PROGRESS_HEIGHT: u16 = 3;
const MESSAGE_HEIGHT: u16 = 1;
const INPUT_HEIGHT: u16 = 3;
const STATUS_HEIGHT: u16 = 1;

/// Data rows that fit in the table for a terminal of `height` lines
pub fn table_viewport_rows(height: u16) -> u16 {
    // Table borders plus its header row
    height.saturating_sub(
        HEADER_HEIGHT + PROGRESS_HEIGHT + MESSAGE_HEIGHT + INPUT_HEIGHT + STATUS_HEIGHT + 3,
    )
}

/// Render the main UI
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Length(PROGRESS_HEIGHT),
            Constraint::Min(6),
            Constraint::Length(MESSAGE_HEIGHT),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(frame.area());

    let controller = app.session.controller();

    render_header(frame, chunks[0], app);
    widgets::render_progress(
        frame,
        chunks[1],
        controller.state(),
        controller.error().map(|e| e.phase),
        dataset_detail(app),
    );
    render_body(frame, chunks[2], app);
    render_message(frame, chunks[3], app);
    render_input(frame, chunks[4], app);
    render_status_bar(frame, chunks[5], app);

    if app.view == View::Help {
        render_help(frame);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let title = Paragraph::new(Line::from(vec![
        Span::styled("TableScrub", Theme::title()),
        Span::styled("  natural-language find & replace", Theme::muted()),
        Span::styled(format!("   {}", app.config.api.base_url), Theme::dim()),
    ]))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Theme::frame(false)),
    );

    frame.render_widget(title, area);
}

fn dataset_detail(app: &App) -> Option<String> {
    let dataset = app.session.controller().dataset()?;
    let name = dataset.file_name().unwrap_or("uploaded file");
    let mut detail = format!(
        "{} · {} rows · {} columns",
        name,
        dataset.total_rows(),
        dataset.columns().len()
    );
    if dataset.is_preview() {
        detail.push_str(&format!(" (showing first {})", dataset.rows().len()));
    }
    Some(detail)
}

fn render_body(frame: &mut Frame, area: Rect, app: &App) {
    let columns = app.visible_columns();
    let rows = app.visible_rows();

    match app.session.controller().result() {
        Some(result) if app.session.state() == PipelineState::ResultReady => {
            let split = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
                .split(area);
            widgets::render_table(frame, split[0], "Processed data", &columns, rows, app.table_offset);
            widgets::render_stats(frame, split[1], result);
        }
        _ => {
            widgets::render_table(frame, area, "Data preview", &columns, rows, app.table_offset);
        }
    }
}

/// Error, notice or nothing, in that order
fn render_message(frame: &mut Frame, area: Rect, app: &App) {
    let line = if let Some(error) = app.session.controller().error() {
        Line::from(vec![
            Span::styled(format!(" {} ", Glyph::FAILED), Theme::error()),
            Span::styled(error.message.clone(), Theme::error()),
            Span::styled("  [Esc] dismiss", Theme::dim()),
        ])
    } else {
        match &app.notice {
            Some(Notice::Info(text)) => Line::from(vec![
                Span::styled(format!(" {} ", Glyph::DONE), Theme::success()),
                Span::styled(text.clone(), Theme::text()),
            ]),
            Some(Notice::Warning(text)) => Line::from(vec![
                Span::styled(format!(" {} ", Glyph::BULLET), Theme::warning()),
                Span::styled(text.clone(), Theme::warning()),
            ]),
            None => Line::from(""),
        }
    };

    frame.render_widget(Paragraph::new(line), area);
}

fn render_input(frame: &mut Frame, area: Rect, app: &App) {
    let (title, input) = match app.input_mode {
        InputMode::Instruction => {
            let limit = app.session.controller().validator().max_instruction_chars();
            let used = app.instruction_text().chars().count();
            (format!(" Instruction ({}/{}) ", used, limit), &app.instruction)
        }
        InputMode::FilePath => (" Open file ".to_string(), &app.path_input),
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Theme::frame(app.view == View::Main));

    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(input, inner);
}

fn render_status_bar(frame: &mut Frame, area: Rect, app: &App) {
    let state = app.session.controller().effective_state();
    let label = match state {
        PipelineState::Idle | PipelineState::Failed => "Ready",
        PipelineState::Uploading => "Uploading...",
        PipelineState::DatasetReady => "Dataset loaded",
        PipelineState::Processing => "Processing...",
        PipelineState::ResultReady => "Result ready",
    };
    let status = Span::styled(label, Theme::pipeline(state));

    let submit = match app.input_mode {
        InputMode::Instruction => " Process ",
        InputMode::FilePath => " Upload ",
    };

    let shortcuts = vec![
        Span::styled(" [Enter]", Theme::key_hint()),
        Span::styled(submit, Theme::key_label()),
        Span::styled("[Ctrl+O]", Theme::key_hint()),
        Span::styled(" Open ", Theme::key_label()),
        Span::styled("[Ctrl+D]", Theme::key_hint()),
        Span::styled(" Download ", Theme::key_label()),
        Span::styled("[Ctrl+R]", Theme::key_hint()),
        Span::styled(" Reset ", Theme::key_label()),
        Span::styled("[F1]", Theme::key_hint()),
        Span::styled(" Help", Theme::key_label()),
    ];

    let line = Line::from(
        std::iter::once(status)
            .chain(std::iter::once(Span::raw(" │ ")))
            .chain(shortcuts)
            .collect::<Vec<_>>(),
    );

    frame.render_widget(Paragraph::new(line), area);
}

fn render_help(frame: &mut Frame) {
    let area = centered_rect(60, 60, frame.area());
    frame.render_widget(Clear, area);

    let shortcut = |key: &'static str, text: &'static str| {
        Line::from(vec![
            Span::styled(format!("{:<13}", key), Theme::key_hint()),
            Span::styled(text, Theme::text()),
        ])
    };

    let help_lines = vec![
        Line::from(Span::styled("Keyboard Shortcuts", Theme::heading())),
        Line::from(""),
        shortcut("Ctrl+O", "Type a file path to upload (.csv, .xlsx, .xls)"),
        shortcut("Enter", "Upload the path / process the instruction"),
        shortcut("Ctrl+D", "Save processed_data.csv"),
        shortcut("Ctrl+R", "Clear the table and start over"),
        shortcut("↑/↓", "Scroll rows"),
        shortcut("PageUp/Down", "Scroll a page"),
        shortcut("Esc", "Leave path entry / dismiss error"),
        shortcut("Ctrl+Q", "Quit"),
        shortcut("F1", "Show this help"),
        Line::from(""),
        Line::from(Span::styled("Press any key to close", Theme::dim())),
    ];

    let paragraph = Paragraph::new(help_lines).block(
        Block::default()
            .title(" Help ")
            .borders(Borders::ALL)
            .border_style(Theme::frame(true)),
    );

    frame.render_widget(paragraph, area);
}

/// Helper to create a centered rect
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
