pub mod students;
pub mod teachers;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
};

use crate::ui::styles;
use crate::utils::or_dash;

/// Split the content area into the list (left) and the detail panel (right).
pub(crate) fn split(area: Rect) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);
    (chunks[0], chunks[1])
}

/// A "Label: value" row for the detail panel.
pub(crate) fn detail_line(label: &str, value: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<9}", label), styles::label_style()),
        Span::raw(or_dash(value).to_string()),
    ])
}
