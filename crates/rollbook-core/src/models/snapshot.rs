use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Record, Student, Teacher};

/// The local copy of the remote collection, split by category.
///
/// Rebuilt in full after every load; never patched in place.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub students: Vec<Student>,
    pub teachers: Vec<Teacher>,
    /// When the records were fetched. `None` until the first load.
    pub synced_at: Option<DateTime<Utc>>,
}

/// How a student's teacher reference resolves against a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeacherLink<'a> {
    Unassigned,
    Assigned(&'a Teacher),
    /// The reference names a teacher that is not in the collection.
    Missing(&'a str),
}

impl Snapshot {
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut students = Vec::new();
        let mut teachers = Vec::new();
        for record in records {
            match record {
                Record::Student(s) => students.push(s),
                Record::Teacher(t) => teachers.push(t),
            }
        }
        Self {
            students,
            teachers,
            synced_at: Some(Utc::now()),
        }
    }

    pub fn student(&self, id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id.as_deref() == Some(id))
    }

    pub fn teacher(&self, id: &str) -> Option<&Teacher> {
        self.teachers.iter().find(|t| t.id.as_deref() == Some(id))
    }

    /// Students whose teacher reference equals `teacher_id`.
    /// An empty id never matches, since empty means unassigned.
    pub fn students_of(&self, teacher_id: &str) -> Vec<&Student> {
        if teacher_id.is_empty() {
            return Vec::new();
        }
        self.students
            .iter()
            .filter(|s| s.teacher == teacher_id)
            .collect()
    }

    pub fn teacher_link<'a>(&'a self, student: &'a Student) -> TeacherLink<'a> {
        if !student.has_teacher() {
            return TeacherLink::Unassigned;
        }
        match self.teacher(&student.teacher) {
            Some(t) => TeacherLink::Assigned(t),
            None => TeacherLink::Missing(&student.teacher),
        }
    }

    /// Display name for a teacher reference: the teacher's name,
    /// "Unassigned" for an empty reference, or "Missing (id)".
    pub fn teacher_name_for(&self, teacher_id: &str) -> String {
        if teacher_id.is_empty() {
            return "Unassigned".to_string();
        }
        match self.teacher(teacher_id) {
            Some(t) => t.name.clone(),
            None => format!("Missing ({})", teacher_id),
        }
    }

    /// Students pointing at a teacher id that no longer exists.
    pub fn dangling_students(&self) -> Vec<&Student> {
        self.students
            .iter()
            .filter(|s| matches!(self.teacher_link(s), TeacherLink::Missing(_)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.students.len() + self.teachers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn age_minutes(&self) -> Option<i64> {
        self.synced_at.map(|at| (Utc::now() - at).num_minutes())
    }

    pub fn age_display(&self) -> String {
        let Some(minutes) = self.age_minutes() else {
            return "never".to_string();
        };
        if minutes < 1 {
            // Includes negative ages from clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}
