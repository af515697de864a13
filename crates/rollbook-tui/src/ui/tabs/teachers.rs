use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::ui::styles;
use crate::utils::{cmp_ignore_case, truncate};

use super::{detail_line, split};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let (list_area, detail_area) = split(area);
    render_teacher_list(frame, app, list_area);
    render_teacher_detail(frame, app, detail_area);
}

fn render_teacher_list(frame: &mut Frame, app: &App, area: Rect) {
    let teachers = app.visible_teachers();
    let name_width = (area.width as usize).saturating_sub(16).min(28);

    let items: Vec<ListItem> = teachers
        .iter()
        .enumerate()
        .map(|(i, teacher)| {
            let count = teacher
                .id
                .as_deref()
                .map(|id| app.snapshot.students_of(id).len())
                .unwrap_or(0);
            let line = Line::from(format!(
                "{:<width$} ({} students)",
                truncate(&teacher.name, name_width),
                count,
                width = name_width
            ));

            let style = styles::row_style(i == app.teacher_selection);
            ListItem::new(line).style(style)
        })
        .collect();

    let block = Block::default()
        .title(format!(" Teachers ({}) ", teachers.len()))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    let list = List::new(items).block(block);

    let mut state = ListState::default();
    if !teachers.is_empty() {
        state.select(Some(app.teacher_selection));
    }

    frame.render_stateful_widget(list, area, &mut state);
}

fn render_teacher_detail(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    let Some(teacher) = app.selected_teacher() else {
        let empty = Paragraph::new(Line::from(Span::styled(
            " No teachers. Press [n] to add one.",
            styles::muted_style(),
        )))
        .block(block);
        frame.render_widget(empty, area);
        return;
    };

    let mut lines = vec![
        detail_line("Id", teacher.id.as_deref().unwrap_or_default()),
        detail_line("Email", &teacher.email),
        detail_line("Fields", &teacher.fields),
        Line::from(""),
    ];

    let mut students = teacher
        .id
        .as_deref()
        .map(|id| app.snapshot.students_of(id))
        .unwrap_or_default();
    students.sort_by(|a, b| cmp_ignore_case(&a.name, &b.name));

    lines.push(Line::from(Span::styled(
        format!("Students ({})", students.len()),
        styles::label_style(),
    )));
    if students.is_empty() {
        lines.push(Line::from(Span::styled("  none", styles::muted_style())));
    }
    for student in students {
        lines.push(Line::from(vec![
            Span::raw(format!("  {}", student.name)),
            Span::styled(format!("  {}", student.course), styles::muted_style()),
        ]));
    }

    let paragraph = Paragraph::new(lines)
        .block(
            block
                .title(format!(" {} ", teacher.name))
                .title_style(styles::title_style()),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}
