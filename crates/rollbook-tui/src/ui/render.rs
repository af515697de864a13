use chrono::Local;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::{App, AppState, DeleteKind, PendingDelete, Tab};
use crate::form::Form;
use crate::utils::truncate;

use super::styles;
use super::tabs::{students, teachers};

/// Width of a form value column, in characters.
const FORM_VALUE_WIDTH: usize = 34;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(2), // Tabs
            Constraint::Min(8),    // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_tabs(frame, app, chunks[1]);
    render_main_content(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);

    // Overlays
    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        AppState::ConfirmingDelete => {
            if let Some(ref pending) = app.pending_delete {
                render_delete_overlay(frame, pending);
            }
        }
        AppState::EditingForm => {
            if let Some(ref form) = app.form {
                render_form_overlay(frame, app, form);
            }
        }
        _ => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  Rollbook";
    let endpoint = truncate(app.config.api_url().trim_end_matches('/'), 48);
    let help_hint = "[?] Help";

    let used = title.chars().count() + endpoint.chars().count() + help_hint.len() + 6;
    let padding = (area.width as usize).saturating_sub(used);

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw("  "),
        Span::styled(endpoint, styles::muted_style()),
        Span::raw(" ".repeat(padding)),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let tabs = [
        (
            format!("[1] {} ({})", Tab::Students.title(), app.snapshot.students.len()),
            app.current_tab == Tab::Students,
        ),
        (
            format!("[2] {} ({})", Tab::Teachers.title(), app.snapshot.teachers.len()),
            app.current_tab == Tab::Teachers,
        ),
    ];

    let mut spans = vec![Span::raw(" ")];
    for (i, (label, selected)) in tabs.into_iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", styles::muted_style()));
        }
        spans.push(Span::styled(label, styles::tab_style(selected)));
    }

    let searching = matches!(app.state, AppState::Searching);
    if searching || !app.search_query.is_empty() {
        let cursor = if searching { "▌" } else { "" };
        spans.push(Span::raw("   "));
        spans.push(Span::styled(
            format!("/{}{}", app.search_query, cursor),
            styles::search_style(),
        ));
    }

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.current_tab {
        Tab::Students => students::render(frame, app, area),
        Tab::Teachers => teachers::render(frame, app, area),
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let (left_text, left_style) = match app.status_message {
        Some(ref msg) => (format!(" {} ", msg.text), styles::status_style(msg.is_error)),
        None => {
            let synced = match app.snapshot.synced_at {
                Some(at) => format!(
                    " Synced {} ({}) ",
                    app.snapshot.age_display(),
                    at.with_timezone(&Local).format("%H:%M")
                ),
                None => " Not synced yet ".to_string(),
            };
            (synced, styles::muted_style())
        }
    };

    let busy = if app.is_busy() { "working… | " } else { "" };
    let right_text = format!(" {}[n]ew [e]dit [d]elete [u]pdate [q]uit ", busy);

    let width = area.width as usize;
    let left_text = truncate(&left_text, width.saturating_sub(right_text.chars().count()));
    let padding = width
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.chars().count());

    let status_line = Line::from(vec![
        Span::styled(left_text, left_style),
        Span::raw(" ".repeat(padding)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    frame.render_widget(
        Paragraph::new(status_line).style(styles::status_bar_style()),
        area,
    );
}

fn help_row(key: &str, desc: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::key_hint_style()),
        Span::styled(desc.to_string(), styles::row_style(false)),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 25, frame.area());
    frame.render_widget(Clear, area);

    let help_text = vec![
        Line::from(Span::styled(
            format!("  Rollbook {}", env!("CARGO_PKG_VERSION")),
            styles::title_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Navigation", styles::label_style())),
        help_row("1/2 ←/→", "Switch between students and teachers"),
        help_row("↑/↓", "Move selection"),
        help_row("PgUp/PgDn", "Scroll a page"),
        help_row("Home/End", "First / last entry"),
        help_row("/", "Search by name or email"),
        Line::from(""),
        Line::from(Span::styled(" Records", styles::label_style())),
        help_row("n", "New record"),
        help_row("e, Enter", "Edit selected record"),
        help_row("d", "Delete (teachers: unlink students)"),
        help_row("D", "Delete teacher only"),
        help_row("u", "Reload from the service"),
        Line::from(""),
        Line::from(Span::styled(" Form", styles::label_style())),
        help_row("Tab ↑/↓", "Move between fields"),
        help_row("←/→", "Pick the student's teacher"),
        help_row("Enter/Esc", "Save / cancel"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", styles::key_hint_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::key_hint_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

fn render_form_overlay(frame: &mut Frame, app: &App, form: &Form) {
    let fields = form.fields();
    let height = fields.len() as u16 + 6;
    let area = centered_rect_fixed(52, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![Line::from("")];
    for (i, field) in fields.iter().enumerate() {
        let focused = i == form.focus;
        let value = if field.is_choice() {
            let label = app.snapshot.teacher_name_for(form.value(*field));
            if focused {
                format!("◀ {} ▶", label)
            } else {
                label
            }
        } else if focused {
            format!("{}▌", form.value(*field))
        } else {
            form.value(*field).to_string()
        };

        let style = styles::row_style(focused);
        lines.push(Line::from(vec![
            Span::styled(format!("  {:>8}: ", field.label()), styles::muted_style()),
            Span::styled(
                format!("{:<width$}", truncate(&value, FORM_VALUE_WIDTH), width = FORM_VALUE_WIDTH),
                style,
            ),
        ]));
    }

    lines.push(Line::from(""));
    if form.submitting {
        lines.push(Line::from(Span::styled("  Saving…", styles::label_style())));
    } else {
        lines.push(Line::from(vec![
            Span::styled("  [Enter]", styles::key_hint_style()),
            Span::styled(" save  ", styles::muted_style()),
            Span::styled("[Esc]", styles::key_hint_style()),
            Span::styled(" cancel", styles::muted_style()),
        ]));
    }

    let block = Block::default()
        .title(form.title())
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_delete_overlay(frame: &mut Frame, pending: &PendingDelete) {
    let area = centered_rect_fixed(52, 9, frame.area());
    frame.render_widget(Clear, area);

    let detail = match pending.kind {
        DeleteKind::Student => "This cannot be undone.".to_string(),
        DeleteKind::TeacherCascade => match pending.dependents {
            0 => "No students reference this teacher.".to_string(),
            1 => "1 student will be unassigned first.".to_string(),
            n => format!("{} students will be unassigned first.", n),
        },
        DeleteKind::TeacherOnly => match pending.dependents {
            0 => "No students reference this teacher.".to_string(),
            n => format!("{} students will keep a dangling reference.", n),
        },
    };
    let detail_style = match pending.kind {
        DeleteKind::TeacherOnly if pending.dependents > 0 => styles::dangling_style(),
        _ => styles::muted_style(),
    };

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("   Delete {}?", truncate(&pending.name, 38)),
            styles::label_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(format!("   {}", detail), detail_style)),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::key_hint_style()),
            Span::styled(" to delete, ", styles::muted_style()),
            Span::styled("[N]", styles::key_hint_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .title(" Confirm delete ")
        .title_style(styles::delete_title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::label_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::key_hint_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::key_hint_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
