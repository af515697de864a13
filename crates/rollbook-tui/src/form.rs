//! Create/edit form state for students and teachers.

use rollbook_core::{Student, StudentField, Teacher, TeacherField};

/// Maximum length for a single form field.
pub const MAX_FIELD_LENGTH: usize = 100;

/// The record being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Draft {
    Student(Student),
    Teacher(Teacher),
}

/// One row of the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Student(StudentField),
    Teacher(TeacherField),
}

impl FormField {
    pub fn label(&self) -> &'static str {
        match self {
            FormField::Student(f) => f.label(),
            FormField::Teacher(f) => f.label(),
        }
    }

    /// The student's teacher is picked from a list, not typed.
    pub fn is_choice(&self) -> bool {
        matches!(self, FormField::Student(StudentField::Teacher))
    }
}

#[derive(Debug, Clone)]
pub struct Form {
    pub draft: Draft,
    /// Id of the record being edited; `None` when creating.
    pub editing_id: Option<String>,
    pub focus: usize,
    /// Set while the submit request is in flight.
    pub submitting: bool,
}

impl Form {
    pub fn new(draft: Draft, editing_id: Option<String>) -> Self {
        Self {
            draft,
            editing_id: editing_id.filter(|id| !id.is_empty()),
            focus: 0,
            submitting: false,
        }
    }

    pub fn title(&self) -> String {
        let verb = if self.editing_id.is_some() { "Edit" } else { "New" };
        let noun = match self.draft {
            Draft::Student(_) => "Student",
            Draft::Teacher(_) => "Teacher",
        };
        format!(" {} {} ", verb, noun)
    }

    pub fn fields(&self) -> Vec<FormField> {
        match self.draft {
            Draft::Student(_) => StudentField::ALL.into_iter().map(FormField::Student).collect(),
            Draft::Teacher(_) => TeacherField::ALL.into_iter().map(FormField::Teacher).collect(),
        }
    }

    pub fn focused_field(&self) -> FormField {
        let fields = self.fields();
        fields[self.focus.min(fields.len() - 1)]
    }

    pub fn value(&self, field: FormField) -> &str {
        match (&self.draft, field) {
            (Draft::Student(s), FormField::Student(f)) => s.field(f),
            (Draft::Teacher(t), FormField::Teacher(f)) => t.field(f),
            _ => "",
        }
    }

    fn set_value(&mut self, field: FormField, value: String) {
        match (&mut self.draft, field) {
            (Draft::Student(s), FormField::Student(f)) => s.set_field(f, value),
            (Draft::Teacher(t), FormField::Teacher(f)) => t.set_field(f, value),
            _ => {}
        }
    }

    pub fn next_field(&mut self) {
        self.focus = (self.focus + 1) % self.fields().len();
    }

    pub fn prev_field(&mut self) {
        let len = self.fields().len();
        self.focus = (self.focus + len - 1) % len;
    }

    /// Type a character into the focused text field.
    pub fn push_char(&mut self, c: char) {
        let field = self.focused_field();
        if field.is_choice() || c.is_control() {
            return;
        }
        let mut value = self.value(field).to_string();
        if value.chars().count() >= MAX_FIELD_LENGTH {
            return;
        }
        value.push(c);
        self.set_value(field, value);
    }

    pub fn pop_char(&mut self) {
        let field = self.focused_field();
        if field.is_choice() {
            return;
        }
        let mut value = self.value(field).to_string();
        value.pop();
        self.set_value(field, value);
    }

    /// Step the student's teacher through "unassigned" and each teacher id.
    pub fn cycle_teacher(&mut self, teachers: &[Teacher], forward: bool) {
        let Draft::Student(student) = &mut self.draft else {
            return;
        };
        // Slot 0 is "unassigned"
        let options: Vec<Option<&str>> = std::iter::once(None)
            .chain(teachers.iter().filter_map(|t| t.id.as_deref()).map(Some))
            .collect();
        let current = options
            .iter()
            .position(|o| o.unwrap_or_default() == student.teacher)
            .unwrap_or(0);
        let next = if forward {
            (current + 1) % options.len()
        } else {
            (current + options.len() - 1) % options.len()
        };
        student.assign_teacher(options[next]);
    }
}
