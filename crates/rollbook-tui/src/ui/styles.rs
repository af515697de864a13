use ratatui::style::{Color, Modifier, Style};

use rollbook_core::models::TeacherLink;

// Roster palette
pub const HEADING: Color = Color::Rgb(86, 124, 196);
pub const KEY: Color = Color::Rgb(214, 176, 92);
pub const SAVED: Color = Color::Rgb(96, 172, 120);
pub const DANGER: Color = Color::Rgb(212, 84, 84);
pub const FADED: Color = Color::Rgb(122, 126, 138);
pub const ROW_BG: Color = Color::Rgb(40, 46, 64);
pub const BAR_BG: Color = Color::Rgb(28, 30, 38);

pub fn title_style() -> Style {
    Style::default().fg(HEADING).add_modifier(Modifier::BOLD)
}

/// A record row in a list, or a field row in the form.
pub fn row_style(selected: bool) -> Style {
    if selected {
        Style::default().bg(ROW_BG).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    }
}

pub fn muted_style() -> Style {
    Style::default().fg(FADED)
}

/// Field labels in detail panels and section headings in overlays.
pub fn label_style() -> Style {
    Style::default().fg(KEY)
}

pub fn key_hint_style() -> Style {
    Style::default().fg(KEY).add_modifier(Modifier::BOLD)
}

pub fn status_style(is_error: bool) -> Style {
    if is_error {
        Style::default().fg(DANGER)
    } else {
        Style::default().fg(SAVED)
    }
}

/// Students whose teacher reference points nowhere.
pub fn dangling_style() -> Style {
    Style::default().fg(DANGER).add_modifier(Modifier::ITALIC)
}

pub fn teacher_link_style(link: &TeacherLink) -> Style {
    match link {
        TeacherLink::Assigned(_) => Style::default().fg(Color::White),
        TeacherLink::Unassigned => muted_style().add_modifier(Modifier::ITALIC),
        TeacherLink::Missing(_) => dangling_style(),
    }
}

pub fn delete_title_style() -> Style {
    Style::default().fg(DANGER).add_modifier(Modifier::BOLD)
}

pub fn tab_style(selected: bool) -> Style {
    if selected {
        Style::default()
            .fg(HEADING)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    } else {
        muted_style()
    }
}

pub fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(HEADING)
    } else {
        muted_style()
    }
}

pub fn search_style() -> Style {
    Style::default().fg(KEY)
}

pub fn status_bar_style() -> Style {
    Style::default().bg(BAR_BG).fg(Color::White)
}
