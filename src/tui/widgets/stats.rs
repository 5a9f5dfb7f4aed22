//! Result summary panel

use crate::tui::theme::{Counter, Theme};
use crate::types::ProcessingResult;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

pub fn render_stats(frame: &mut Frame, area: Rect, result: &ProcessingResult) {
    let block = Block::default()
        .title(" Result ")
        .borders(Borders::ALL)
        .border_style(Theme::frame(true));

    let stats = &result.stats;
    let mut lines = vec![
        counter("Total rows", Counter::Total, stats.total_rows),
        counter("Matched", Counter::Matched, stats.matched_rows),
        counter("Replaced", Counter::Replaced, stats.replaced_count),
        counter("Unmatched", Counter::Unmatched, stats.unmatched_rows),
        Line::from(""),
        field("Pattern", &result.regex_pattern),
        field("Replace", &result.replacement),
    ];

    if let Some(column) = &result.column_name {
        lines.push(field("Column", column));
    }
    if let Some(description) = &result.pattern_description {
        lines.push(field("Matches", description));
    }
    if let Some(model) = &result.model_used {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!("via {}", model), Theme::dim())));
    }

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(block);
    frame.render_widget(paragraph, area);
}

fn counter(label: &'static str, kind: Counter, value: u64) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<11}", label), Theme::muted()),
        Span::styled(value.to_string(), Theme::counter(kind)),
    ])
}

fn field<'a>(label: &'static str, value: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{:<9}", label), Theme::muted()),
        Span::styled(value, Theme::text()),
    ])
}
