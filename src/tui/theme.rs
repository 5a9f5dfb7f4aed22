//! Styles for the TUI, keyed by what they show: pipeline states, result
//! counters, key hints and the table.

use ratatui::style::{Color, Modifier, Style};

use crate::types::PipelineState;

const CYAN: Color = Color::Rgb(0, 212, 255);
const GREEN: Color = Color::Rgb(34, 197, 94);
const AMBER: Color = Color::Rgb(251, 191, 36);
const RED: Color = Color::Rgb(239, 68, 68);
const VIOLET: Color = Color::Rgb(167, 139, 250);
const BLUE: Color = Color::Rgb(59, 130, 246);

const FG: Color = Color::Rgb(229, 229, 229);
const MUTED: Color = Color::Rgb(161, 161, 161);
const FAINT: Color = Color::Rgb(82, 82, 82);
const FRAME: Color = Color::Rgb(51, 51, 51);

fn fg(color: Color) -> Style {
    Style::default().fg(color)
}

fn bold(color: Color) -> Style {
    fg(color).add_modifier(Modifier::BOLD)
}

/// Row counters shown in the result panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Total,
    Matched,
    Replaced,
    Unmatched,
}

pub struct Theme;

impl Theme {
    pub fn text() -> Style {
        fg(FG)
    }

    pub fn muted() -> Style {
        fg(MUTED)
    }

    pub fn dim() -> Style {
        fg(FAINT)
    }

    pub fn title() -> Style {
        bold(CYAN)
    }

    pub fn heading() -> Style {
        bold(FG)
    }

    pub fn success() -> Style {
        fg(GREEN)
    }

    pub fn warning() -> Style {
        fg(AMBER)
    }

    pub fn error() -> Style {
        fg(RED)
    }

    /// A request is in flight
    pub fn busy() -> Style {
        bold(AMBER)
    }

    pub fn frame(focused: bool) -> Style {
        if focused {
            fg(BLUE)
        } else {
            fg(FRAME)
        }
    }

    pub fn key_hint() -> Style {
        bold(CYAN)
    }

    pub fn key_label() -> Style {
        fg(MUTED)
    }

    /// Table header row
    pub fn column_header() -> Style {
        bold(FG).add_modifier(Modifier::UNDERLINED)
    }

    /// Status bar label for the pipeline state
    pub fn pipeline(state: PipelineState) -> Style {
        match state {
            PipelineState::Idle | PipelineState::DatasetReady => Self::muted(),
            PipelineState::Uploading | PipelineState::Processing => Self::busy(),
            PipelineState::ResultReady => Self::success(),
            PipelineState::Failed => Self::error(),
        }
    }

    /// Value style for a result counter
    pub fn counter(counter: Counter) -> Style {
        match counter {
            Counter::Total => Self::heading(),
            Counter::Matched => bold(CYAN),
            Counter::Replaced => bold(GREEN),
            Counter::Unmatched => bold(VIOLET),
        }
    }
}

/// Markers for stages and messages
pub struct Glyph;

impl Glyph {
    pub const DONE: &'static str = "✓";
    pub const RUNNING: &'static str = "●";
    pub const WAITING: &'static str = "○";
    pub const FAILED: &'static str = "✗";
    pub const NEXT: &'static str = "→";
    pub const BULLET: &'static str = "•";
}
