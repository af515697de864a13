use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use rollbook_core::models::TeacherLink;

use crate::app::App;
use crate::ui::styles;
use crate::utils::truncate;

use super::{detail_line, split};

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let (list_area, detail_area) = split(area);
    render_student_list(frame, app, list_area);
    render_student_detail(frame, app, detail_area);
}

fn render_student_list(frame: &mut Frame, app: &App, area: Rect) {
    let students = app.visible_students();
    let name_width = (area.width as usize).saturating_sub(4).min(28);

    let items: Vec<ListItem> = students
        .iter()
        .enumerate()
        .map(|(i, student)| {
            let mut spans = vec![Span::raw(format!(
                "{:<width$}",
                truncate(&student.name, name_width),
                width = name_width
            ))];
            if let TeacherLink::Missing(_) = app.snapshot.teacher_link(student) {
                spans.push(Span::styled(" !", styles::dangling_style()));
            }

            let style = styles::row_style(i == app.student_selection);
            ListItem::new(Line::from(spans)).style(style)
        })
        .collect();

    let mut title = vec![Span::styled(
        format!(" Students ({}) ", students.len()),
        styles::title_style(),
    )];
    let dangling = app.snapshot.dangling_students().len();
    if dangling > 0 {
        title.push(Span::styled(
            format!("{} with missing teacher ", dangling),
            styles::dangling_style(),
        ));
    }

    let block = Block::default()
        .title(Line::from(title))
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    let list = List::new(items).block(block);

    let mut state = ListState::default();
    if !students.is_empty() {
        state.select(Some(app.student_selection));
    }

    frame.render_stateful_widget(list, area, &mut state);
}

fn render_student_detail(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    let Some(student) = app.selected_student() else {
        let empty = Paragraph::new(Line::from(Span::styled(
            " No students. Press [n] to add one.",
            styles::muted_style(),
        )))
        .block(block);
        frame.render_widget(empty, area);
        return;
    };

    let teacher_line = Line::from(vec![
        Span::styled(format!("{:<9}", "Teacher"), styles::label_style()),
        Span::styled(
            app.snapshot.teacher_name_for(&student.teacher),
            styles::teacher_link_style(&app.snapshot.teacher_link(student)),
        ),
    ]);

    let lines = vec![
        detail_line("Id", student.id.as_deref().unwrap_or_default()),
        detail_line("Email", &student.email),
        detail_line("Batch", &student.batch),
        detail_line("Course", &student.course),
        teacher_line,
    ];

    let paragraph = Paragraph::new(lines)
        .block(
            block
                .title(format!(" {} ", student.name))
                .title_style(styles::title_style()),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}
