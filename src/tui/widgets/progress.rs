//! Progress Widget
//!
//! Displays where the current table is in the upload → process pipeline.

use crate::tui::theme::{Glyph, Theme};
use crate::types::{Phase, PipelineState};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Render the progress indicator.
/// `detail` is a short description of the loaded file, if any.
pub fn render_progress(
    frame: &mut Frame,
    area: Rect,
    state: PipelineState,
    error_phase: Option<Phase>,
    detail: Option<String>,
) {
    let block = Block::default()
        .title(" Pipeline ")
        .borders(Borders::ALL)
        .border_style(Theme::frame(false));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut spans = build_progress_line(state, error_phase);
    match detail {
        Some(detail) => {
            spans.push(Span::styled("   ", Theme::dim()));
            spans.push(Span::styled(
                truncate_string(&detail, (inner.width as usize).saturating_sub(50)),
                Theme::muted(),
            ));
        }
        None if state == PipelineState::Idle || state == PipelineState::Failed => {
            spans.push(Span::styled("   Press Ctrl+O to open a file", Theme::dim()));
        }
        None => {}
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), inner);
}

/// Build the progress line with stage indicators
fn build_progress_line(state: PipelineState, error_phase: Option<Phase>) -> Vec<Span<'static>> {
    let stages = [
        ("Upload", StageState::upload(state)),
        ("Preview", StageState::preview(state)),
        ("Process", StageState::process(state, error_phase)),
        ("Result", StageState::result(state)),
    ];

    let mut spans = Vec::new();

    for (i, (name, stage)) in stages.iter().enumerate() {
        let (icon, style) = match stage {
            StageState::Complete => (Glyph::DONE, Theme::success()),
            StageState::Active => (Glyph::RUNNING, Theme::busy()),
            StageState::Pending => (Glyph::WAITING, Theme::dim()),
            StageState::Error => (Glyph::FAILED, Theme::error()),
        };

        spans.push(Span::styled(format!("{} ", icon), style));
        spans.push(Span::styled(name.to_string(), style));

        if i < stages.len() - 1 {
            spans.push(Span::styled(format!(" {} ", Glyph::NEXT), Theme::dim()));
        }
    }

    spans
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum StageState {
    Pending,
    Active,
    Complete,
    Error,
}

impl StageState {
    fn upload(state: PipelineState) -> Self {
        match state {
            PipelineState::Idle => StageState::Pending,
            PipelineState::Uploading => StageState::Active,
            PipelineState::Failed => StageState::Error,
            _ => StageState::Complete,
        }
    }

    fn preview(state: PipelineState) -> Self {
        match state {
            PipelineState::DatasetReady => StageState::Active,
            PipelineState::Processing | PipelineState::ResultReady => StageState::Complete,
            _ => StageState::Pending,
        }
    }

    fn process(state: PipelineState, error_phase: Option<Phase>) -> Self {
        match (state, error_phase) {
            (PipelineState::Processing, _) => StageState::Active,
            (PipelineState::ResultReady, _) => StageState::Complete,
            (PipelineState::DatasetReady, Some(Phase::Process | Phase::Normalize)) => {
                StageState::Error
            }
            _ => StageState::Pending,
        }
    }

    fn result(state: PipelineState) -> Self {
        match state {
            PipelineState::ResultReady => StageState::Complete,
            _ => StageState::Pending,
        }
    }
}

/// Truncate a string to at most `max_width` characters
fn truncate_string(s: &str, max_width: usize) -> String {
    if s.chars().count() <= max_width {
        s.to_string()
    } else if max_width > 3 {
        let head: String = s.chars().take(max_width - 3).collect();
        format!("{}...", head)
    } else {
        s.chars().take(max_width).collect()
    }
}
