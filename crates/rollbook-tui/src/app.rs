//! Application state management for rollbook.
//!
//! `App` owns the UI state (tab, selection, form, overlays) and a copy of
//! the latest `Snapshot`. Store calls run as background tasks and report
//! back through an MPSC channel, so the terminal stays responsive.

use std::future::Future;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use rollbook_core::{
    ApiClient, Config, DataStore, Route, Snapshot, Student, StoreError, SyncOutcome, Teacher,
};

use crate::form::{Draft, Form};
use crate::utils::{cmp_ignore_case, contains_ignore_case};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 32;

/// Number of items to scroll on page up/down.
pub const PAGE_SCROLL_SIZE: usize = 10;

/// Maximum length for the search query.
const MAX_SEARCH_LENGTH: usize = 50;

// ============================================================================
// UI State Types
// ============================================================================

/// Main navigation tabs, one per listing route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Students,
    Teachers,
}

impl Tab {
    pub fn title(&self) -> &'static str {
        match self {
            Tab::Students => "Students",
            Tab::Teachers => "Teachers",
        }
    }

    /// Get the next tab (wrapping around)
    pub fn next(&self) -> Self {
        match self {
            Tab::Students => Tab::Teachers,
            Tab::Teachers => Tab::Students,
        }
    }

    /// Get the previous tab (wrapping around)
    pub fn prev(&self) -> Self {
        // Two tabs, so both directions land on the other one
        self.next()
    }
}

impl From<Route> for Tab {
    fn from(route: Route) -> Self {
        match route {
            Route::Students => Tab::Students,
            Route::Teachers => Tab::Teachers,
        }
    }
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    Searching,
    ShowingHelp,
    EditingForm,
    ConfirmingDelete,
    ConfirmingQuit,
    Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteKind {
    Student,
    /// Unlink the teacher's students first.
    TeacherCascade,
    /// Delete the teacher and leave its students pointing at it.
    TeacherOnly,
}

/// A delete waiting for confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelete {
    pub kind: DeleteKind,
    pub id: String,
    pub name: String,
    /// Students that reference the teacher, for the confirmation text.
    pub dependents: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

// ============================================================================
// Background Task Results
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Load,
    Fill,
    Submit,
    Delete,
}

impl Action {
    fn describe(&self) -> &'static str {
        match self {
            Action::Load => "Loading records",
            Action::Fill => "Opening record",
            Action::Submit => "Saving",
            Action::Delete => "Deleting",
        }
    }
}

/// Results sent from background store tasks back to the app.
enum TaskResult {
    Loaded(Snapshot),
    Synced { outcome: SyncOutcome, message: String },
    FormReady(Form),
    Failed {
        action: Action,
        error: StoreError,
        /// Records the store reloaded on its way to the error, if any.
        latest: Option<Snapshot>,
    },
}

impl TaskResult {
    fn failed(action: Action, error: StoreError) -> Self {
        TaskResult::Failed {
            action,
            error,
            latest: None,
        }
    }
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    pub config: Config,
    store: DataStore<ApiClient>,

    // UI State
    pub state: AppState,
    pub current_tab: Tab,
    pub search_query: String,
    pub student_selection: usize,
    pub teacher_selection: usize,
    pub form: Option<Form>,
    pub pending_delete: Option<PendingDelete>,
    pub status_message: Option<StatusMessage>,

    /// Latest records received from the store
    pub snapshot: Snapshot,

    /// Number of store tasks still running
    pub in_flight: usize,

    task_rx: mpsc::Receiver<TaskResult>,
    task_tx: mpsc::Sender<TaskResult>,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let api = ApiClient::new(&config)?;
        info!(url = api.base_url(), "Using record service");
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        Ok(Self {
            config,
            store: DataStore::new(api),
            state: AppState::Normal,
            current_tab: Tab::Students,
            search_query: String::new(),
            student_selection: 0,
            teacher_selection: 0,
            form: None,
            pending_delete: None,
            status_message: None,
            snapshot: Snapshot::default(),
            in_flight: 0,
            task_rx: rx,
            task_tx: tx,
        })
    }

    // =========================================================================
    // Background tasks
    // =========================================================================

    fn spawn_task<F>(&mut self, task: F)
    where
        F: Future<Output = TaskResult> + Send + 'static,
    {
        let tx = self.task_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let result = task.await;
            if let Err(e) = tx.send(result).await {
                error!(error = %e, "Failed to send task result - channel closed");
            }
        });
    }

    /// Reload every record from the service.
    pub fn reload(&mut self) {
        let store = self.store.clone();
        self.spawn_task(async move {
            match store.load_all().await {
                Ok(snapshot) => TaskResult::Loaded(snapshot),
                Err(error) => TaskResult::failed(Action::Load, error),
            }
        });
        self.set_status("Loading records...");
    }

    /// Drain finished background tasks and apply their results.
    pub fn check_background_tasks(&mut self) {
        while let Ok(result) = self.task_rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            self.process_task_result(result);
        }
    }

    fn process_task_result(&mut self, result: TaskResult) {
        match result {
            TaskResult::Loaded(snapshot) => {
                self.apply_snapshot(snapshot);
                self.status_message = None;
            }
            TaskResult::Synced { outcome, message } => {
                self.apply_snapshot(outcome.snapshot);
                self.navigate(outcome.route);
                self.set_status(message);
            }
            TaskResult::FormReady(form) => {
                self.form = Some(form);
                self.state = AppState::EditingForm;
                self.status_message = None;
            }
            TaskResult::Failed {
                action,
                error,
                latest,
            } => {
                if let Some(snapshot) = latest {
                    // A partial cascade still changed some students
                    self.apply_snapshot(snapshot);
                }
                self.handle_failure(action, error);
            }
        }
    }

    fn handle_failure(&mut self, action: Action, error: StoreError) {
        warn!(action = action.describe(), error = %error, "Store operation failed");
        let message = describe_error(action, &error);

        if let StoreError::ReloadFailed { route, .. } = error {
            // The write landed; only the refresh is missing
            self.navigate(route);
        } else if action == Action::Submit {
            // Keep the draft so the user can retry
            if let Some(form) = self.form.as_mut() {
                form.submitting = false;
            }
        }
        self.set_error(message);
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshot = snapshot;
        self.clamp_selection();
    }

    /// Close any form and show the listing for `route`.
    fn navigate(&mut self, route: Route) {
        self.form = None;
        if matches!(self.state, AppState::EditingForm) {
            self.state = AppState::Normal;
        }
        self.current_tab = Tab::from(route);
        self.clamp_selection();
    }

    // =========================================================================
    // Forms
    // =========================================================================

    /// Open an empty form for the current tab.
    pub async fn start_new(&mut self) {
        let draft = match self.current_tab {
            Tab::Students => self.store.fill_student_form(None).await.map(Draft::Student),
            Tab::Teachers => self.store.fill_teacher_form(None).await.map(Draft::Teacher),
        };
        match draft {
            Ok(draft) => {
                self.form = Some(Form::new(draft, None));
                self.state = AppState::EditingForm;
            }
            Err(error) => self.handle_failure(Action::Fill, error),
        }
    }

    /// Fetch the selected record and open it in the form.
    pub fn start_edit(&mut self) {
        let store = self.store.clone();
        match self.current_tab {
            Tab::Students => {
                let Some(id) = self.selected_student().and_then(|s| s.id.clone()) else {
                    return;
                };
                self.spawn_task(async move {
                    match store.fill_student_form(Some(&id)).await {
                        Ok(draft) => TaskResult::FormReady(Form::new(Draft::Student(draft), Some(id))),
                        Err(error) => TaskResult::failed(Action::Fill, error),
                    }
                });
            }
            Tab::Teachers => {
                let Some(id) = self.selected_teacher().and_then(|t| t.id.clone()) else {
                    return;
                };
                self.spawn_task(async move {
                    match store.fill_teacher_form(Some(&id)).await {
                        Ok(draft) => TaskResult::FormReady(Form::new(Draft::Teacher(draft), Some(id))),
                        Err(error) => TaskResult::failed(Action::Fill, error),
                    }
                });
            }
        }
        self.set_status("Opening record...");
    }

    pub fn cancel_form(&mut self) {
        self.form = None;
        self.state = AppState::Normal;
    }

    pub fn submit_form(&mut self) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        if form.submitting {
            return;
        }
        form.submitting = true;
        let draft = form.draft.clone();
        let id = form.editing_id.clone();
        let store = self.store.clone();

        self.spawn_task(async move {
            let verb = if id.is_some() { "Updated" } else { "Created" };
            let result = match &draft {
                Draft::Student(s) => store
                    .submit_student(s, id.as_deref())
                    .await
                    .map(|o| (o, format!("{} student {}", verb, s.name))),
                Draft::Teacher(t) => store
                    .submit_teacher(t, id.as_deref())
                    .await
                    .map(|o| (o, format!("{} teacher {}", verb, t.name))),
            };
            match result {
                Ok((outcome, message)) => TaskResult::Synced { outcome, message },
                Err(error) => TaskResult::failed(Action::Submit, error),
            }
        });
        self.set_status("Saving...");
    }

    // =========================================================================
    // Deletes
    // =========================================================================

    /// Ask for confirmation before deleting the selected record.
    pub fn request_delete(&mut self, cascade: bool) {
        let pending = match self.current_tab {
            Tab::Students => self.selected_student().and_then(|s| {
                Some(PendingDelete {
                    kind: DeleteKind::Student,
                    id: s.id.clone()?,
                    name: s.name.clone(),
                    dependents: 0,
                })
            }),
            Tab::Teachers => self.selected_teacher().and_then(|t| {
                let id = t.id.clone()?;
                Some(PendingDelete {
                    kind: if cascade {
                        DeleteKind::TeacherCascade
                    } else {
                        DeleteKind::TeacherOnly
                    },
                    dependents: self.snapshot.students_of(&id).len(),
                    id,
                    name: t.name.clone(),
                })
            }),
        };
        if let Some(pending) = pending {
            self.pending_delete = Some(pending);
            self.state = AppState::ConfirmingDelete;
        }
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
        self.state = AppState::Normal;
    }

    pub fn confirm_delete(&mut self) {
        self.state = AppState::Normal;
        let Some(pending) = self.pending_delete.take() else {
            return;
        };
        let store = self.store.clone();
        self.spawn_task(async move {
            let result = match pending.kind {
                DeleteKind::Student => store.delete_student(&pending.id).await,
                DeleteKind::TeacherCascade => store.delete_teacher(&pending.id).await,
                DeleteKind::TeacherOnly => store.delete_teacher_only(&pending.id).await,
            };
            match result {
                Ok(outcome) => TaskResult::Synced {
                    outcome,
                    message: format!("Deleted {}", pending.name),
                },
                Err(error) => TaskResult::Failed {
                    action: Action::Delete,
                    latest: matches!(error, StoreError::CascadeIncomplete { .. })
                        .then(|| store.snapshot()),
                    error,
                },
            }
        });
        self.set_status("Deleting...");
    }

    // =========================================================================
    // Search
    // =========================================================================

    pub fn start_search(&mut self) {
        self.state = AppState::Searching;
        self.search_query.clear();
    }

    pub fn push_search_char(&mut self, c: char) {
        if self.search_query.chars().count() < MAX_SEARCH_LENGTH && !c.is_control() {
            self.search_query.push(c);
            self.clamp_selection();
        }
    }

    pub fn pop_search_char(&mut self) {
        self.search_query.pop();
        self.clamp_selection();
    }

    pub fn clear_search(&mut self) {
        self.search_query.clear();
        self.clamp_selection();
    }

    fn matches_search(&self, name: &str, email: &str) -> bool {
        contains_ignore_case(name, &self.search_query) || contains_ignore_case(email, &self.search_query)
    }

    // =========================================================================
    // Lists and selection
    // =========================================================================

    /// Students matching the search, sorted by name.
    pub fn visible_students(&self) -> Vec<&Student> {
        let mut students: Vec<&Student> = self
            .snapshot
            .students
            .iter()
            .filter(|s| self.matches_search(&s.name, &s.email))
            .collect();
        students.sort_by(|a, b| cmp_ignore_case(&a.name, &b.name));
        students
    }

    /// Teachers matching the search, sorted by name.
    pub fn visible_teachers(&self) -> Vec<&Teacher> {
        let mut teachers: Vec<&Teacher> = self
            .snapshot
            .teachers
            .iter()
            .filter(|t| self.matches_search(&t.name, &t.email))
            .collect();
        teachers.sort_by(|a, b| cmp_ignore_case(&a.name, &b.name));
        teachers
    }

    pub fn selected_student(&self) -> Option<&Student> {
        self.visible_students().get(self.student_selection).copied()
    }

    pub fn selected_teacher(&self) -> Option<&Teacher> {
        self.visible_teachers().get(self.teacher_selection).copied()
    }

    fn visible_len(&self) -> usize {
        match self.current_tab {
            Tab::Students => self.visible_students().len(),
            Tab::Teachers => self.visible_teachers().len(),
        }
    }

    fn selection_mut(&mut self) -> &mut usize {
        match self.current_tab {
            Tab::Students => &mut self.student_selection,
            Tab::Teachers => &mut self.teacher_selection,
        }
    }

    /// Move the selection on the current tab by `delta`, staying in range.
    pub fn move_selection(&mut self, delta: isize) {
        let len = self.visible_len();
        let selection = self.selection_mut();
        if len == 0 {
            *selection = 0;
            return;
        }
        let target = (*selection as isize + delta).clamp(0, len as isize - 1);
        *selection = target as usize;
    }

    pub fn select_first(&mut self) {
        *self.selection_mut() = 0;
    }

    pub fn select_last(&mut self) {
        let len = self.visible_len();
        *self.selection_mut() = len.saturating_sub(1);
    }

    fn clamp_selection(&mut self) {
        let students = self.visible_students().len();
        let teachers = self.visible_teachers().len();
        self.student_selection = self.student_selection.min(students.saturating_sub(1));
        self.teacher_selection = self.teacher_selection.min(teachers.saturating_sub(1));
    }

    pub fn switch_tab(&mut self, tab: Tab) {
        self.current_tab = tab;
        self.clamp_selection();
    }

    // =========================================================================
    // Display helpers
    // =========================================================================

    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    fn set_status(&mut self, text: impl Into<String>) {
        self.status_message = Some(StatusMessage {
            text: text.into(),
            is_error: false,
        });
    }

    fn set_error(&mut self, text: impl Into<String>) {
        self.status_message = Some(StatusMessage {
            text: text.into(),
            is_error: true,
        });
    }
}

/// One-line message for the status bar.
fn describe_error(action: Action, error: &StoreError) -> String {
    let kind = error
        .kind()
        .map(|k| format!(" [{}]", k))
        .unwrap_or_default();
    match error {
        StoreError::CascadeIncomplete { failed, .. } => {
            let ids: Vec<&str> = failed.iter().map(|f| f.student_id.as_str()).collect();
            format!("{} failed{}: {} (students {})", action.describe(), kind, error, ids.join(", "))
        }
        _ => format!("{} failed{}: {}", action.describe(), kind, error),
    }
}

// ============================================================================
// Tests
// ============================================================================
