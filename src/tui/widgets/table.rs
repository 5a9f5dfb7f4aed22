//! Table Widget
//!
//! Renders a window of rows under their column headers.

use crate::tui::theme::Theme;
use crate::types::{cell_text, Row};
use ratatui::{
    layout::{Constraint, Rect},
    text::Span,
    widgets::{Block, Borders, Cell, Paragraph, Row as TableRow, Table},
    Frame,
};

/// Widest a column is allowed to grow, in characters
const MAX_COLUMN_WIDTH: usize = 40;

pub fn render_table(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    columns: &[String],
    rows: &[Row],
    offset: usize,
) {
    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Theme::frame(false));

    if columns.is_empty() {
        let empty = Paragraph::new(Span::styled("No table loaded", Theme::dim())).block(block);
        frame.render_widget(empty, area);
        return;
    }

    let visible_rows = usize::from(block.inner(area).height.saturating_sub(1));
    let window: Vec<&Row> = rows.iter().skip(offset).take(visible_rows).collect();

    let widths: Vec<Constraint> = column_widths(columns, &window)
        .into_iter()
        .map(|w| Constraint::Length(w as u16))
        .collect();

    let header = TableRow::new(columns.iter().map(|c| Cell::from(c.clone()))).style(Theme::column_header());

    let body = window.iter().map(|row| {
        TableRow::new(columns.iter().map(|column| {
            let text = row.get(column).map(cell_text).unwrap_or_default();
            Cell::from(single_line(&text))
        }))
        .style(Theme::text())
    });

    let table = Table::new(body, widths)
        .header(header)
        .column_spacing(2)
        .block(block);

    frame.render_widget(table, area);
}

/// Width of each column: the longest of its header and visible cells, capped
fn column_widths(columns: &[String], window: &[&Row]) -> Vec<usize> {
    columns
        .iter()
        .map(|column| {
            let cells = window.iter().map(|row| {
                row.get(column)
                    .map(|v| single_line(&cell_text(v)).chars().count())
                    .unwrap_or(0)
            });
            cells
                .chain(std::iter::once(column.chars().count()))
                .max()
                .unwrap_or(0)
                .clamp(1, MAX_COLUMN_WIDTH)
        })
        .collect()
}

/// Cells are shown on one line; embedded line breaks become a visible marker
fn single_line(text: &str) -> String {
    text.replace("\r\n", "⏎").replace(['\n', '\r'], "⏎")
}
