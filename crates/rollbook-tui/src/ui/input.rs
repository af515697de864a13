//! Keyboard input handling for the TUI.
//!
//! Translates key events into `App` state changes. Anything that talks to
//! the record service is started here and finishes in the background.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{App, AppState, Tab, PAGE_SCROLL_SIZE};

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match app.state {
        AppState::ShowingHelp => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.state = AppState::Normal;
            }
            Ok(false)
        }
        AppState::ConfirmingQuit => Ok(handle_quit_input(app, key)),
        AppState::ConfirmingDelete => {
            handle_delete_input(app, key);
            Ok(false)
        }
        AppState::Searching => {
            handle_search_input(app, key);
            Ok(false)
        }
        AppState::EditingForm => {
            handle_form_input(app, key);
            Ok(false)
        }
        AppState::Quitting => Ok(true),
        AppState::Normal => {
            handle_normal_input(app, key).await;
            Ok(false)
        }
    }
}

fn handle_quit_input(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
            app.state = AppState::Quitting;
            true
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            app.state = AppState::Normal;
            false
        }
        _ => false,
    }
}

fn handle_delete_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm_delete(),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.cancel_delete(),
        _ => {}
    }
}

fn handle_search_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.state = AppState::Normal;
            app.clear_search();
        }
        KeyCode::Enter => {
            // Keep the filter active
            app.state = AppState::Normal;
        }
        KeyCode::Backspace => app.pop_search_char(),
        KeyCode::Up => app.move_selection(-1),
        KeyCode::Down => app.move_selection(1),
        KeyCode::Char(c) => app.push_search_char(c),
        _ => {}
    }
}

fn handle_form_input(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        app.cancel_form();
        return;
    }
    if key.code == KeyCode::Enter {
        app.submit_form();
        return;
    }

    let teachers = app.snapshot.teachers.clone();
    let Some(form) = app.form.as_mut() else {
        app.state = AppState::Normal;
        return;
    };
    if form.submitting {
        return;
    }

    match key.code {
        KeyCode::Tab | KeyCode::Down => form.next_field(),
        KeyCode::BackTab | KeyCode::Up => form.prev_field(),
        KeyCode::Left if form.focused_field().is_choice() => form.cycle_teacher(&teachers, false),
        KeyCode::Right if form.focused_field().is_choice() => form.cycle_teacher(&teachers, true),
        KeyCode::Backspace => form.pop_char(),
        KeyCode::Char(c) => form.push_char(c),
        _ => {}
    }
}

async fn handle_normal_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.state = AppState::ConfirmingQuit,
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,
        KeyCode::Char('/') => app.start_search(),
        KeyCode::Esc if !app.search_query.is_empty() => app.clear_search(),
        KeyCode::Char('u') => app.reload(),

        // Tabs
        KeyCode::Char('1') => app.switch_tab(Tab::Students),
        KeyCode::Char('2') => app.switch_tab(Tab::Teachers),
        KeyCode::Left => app.switch_tab(app.current_tab.prev()),
        KeyCode::Right => app.switch_tab(app.current_tab.next()),

        // Selection
        KeyCode::Up | KeyCode::Char('k') => app.move_selection(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_selection(1),
        KeyCode::PageUp => app.move_selection(-(PAGE_SCROLL_SIZE as isize)),
        KeyCode::PageDown => app.move_selection(PAGE_SCROLL_SIZE as isize),
        KeyCode::Home => app.select_first(),
        KeyCode::End => app.select_last(),

        // Records
        KeyCode::Char('n') => app.start_new().await,
        KeyCode::Char('e') | KeyCode::Enter => app.start_edit(),
        KeyCode::Char('d') => app.request_delete(true),
        KeyCode::Char('D') if app.current_tab == Tab::Teachers => app.request_delete(false),
        _ => {}
    }
}
