use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Discriminant stored in every record's `category` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Student,
    Teacher,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Student => write!(f, "student"),
            Category::Teacher => write!(f, "teacher"),
        }
    }
}

/// One entry of the remote collection.
///
/// The service keeps students and teachers in the same collection, so the
/// JSON carries a `category` tag that selects the variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "lowercase")]
pub enum Record {
    Student(Student),
    Teacher(Teacher),
}

impl Record {
    pub fn id(&self) -> Option<&str> {
        match self {
            Record::Student(s) => s.id.as_deref(),
            Record::Teacher(t) => t.id.as_deref(),
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Record::Student(_) => Category::Student,
            Record::Teacher(_) => Category::Teacher,
        }
    }

    /// Copy of this record with the id removed, as sent in a create request.
    pub fn without_id(&self) -> Self {
        match self {
            Record::Student(s) => Record::Student(Student {
                id: None,
                ..s.clone()
            }),
            Record::Teacher(t) => Record::Teacher(Teacher {
                id: None,
                ..t.clone()
            }),
        }
    }
}

/// A student record, also used as the student form draft.
///
/// `Student::default()` is the empty template for a new student; a draft
/// for an existing student carries its id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    #[serde(
        default,
        deserialize_with = "deserialize_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub batch: String,
    #[serde(default)]
    pub course: String,
    /// Id of the assigned teacher, or empty when unassigned.
    #[serde(default, deserialize_with = "deserialize_reference")]
    pub teacher: String,
    /// Server-side fields this app does not edit (`createdAt`, `avatar`, ...),
    /// written back unchanged on replace.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A teacher record, also used as the teacher form draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    #[serde(
        default,
        deserialize_with = "deserialize_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// Subjects taught, free text.
    #[serde(default)]
    pub fields: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Student {
    pub fn field(&self, field: StudentField) -> &str {
        match field {
            StudentField::Name => &self.name,
            StudentField::Email => &self.email,
            StudentField::Batch => &self.batch,
            StudentField::Course => &self.course,
            StudentField::Teacher => &self.teacher,
        }
    }

    pub fn set_field(&mut self, field: StudentField, value: impl Into<String>) {
        let value = value.into();
        match field {
            StudentField::Name => self.name = value,
            StudentField::Email => self.email = value,
            StudentField::Batch => self.batch = value,
            StudentField::Course => self.course = value,
            StudentField::Teacher => self.teacher = value,
        }
    }

    /// Point this student at a teacher, or clear the link with `None`.
    pub fn assign_teacher(&mut self, teacher_id: Option<&str>) {
        self.teacher = teacher_id.unwrap_or_default().to_string();
    }

    pub fn has_teacher(&self) -> bool {
        !self.teacher.is_empty()
    }
}

impl Teacher {
    pub fn field(&self, field: TeacherField) -> &str {
        match field {
            TeacherField::Name => &self.name,
            TeacherField::Email => &self.email,
            TeacherField::Fields => &self.fields,
        }
    }

    pub fn set_field(&mut self, field: TeacherField, value: impl Into<String>) {
        let value = value.into();
        match field {
            TeacherField::Name => self.name = value,
            TeacherField::Email => self.email = value,
            TeacherField::Fields => self.fields = value,
        }
    }
}

/// Editable fields of a student form, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StudentField {
    Name,
    Email,
    Batch,
    Course,
    Teacher,
}

impl StudentField {
    pub const ALL: [StudentField; 5] = [
        StudentField::Name,
        StudentField::Email,
        StudentField::Batch,
        StudentField::Course,
        StudentField::Teacher,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StudentField::Name => "Name",
            StudentField::Email => "Email",
            StudentField::Batch => "Batch",
            StudentField::Course => "Course",
            StudentField::Teacher => "Teacher",
        }
    }
}

/// Editable fields of a teacher form, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeacherField {
    Name,
    Email,
    Fields,
}

impl TeacherField {
    pub const ALL: [TeacherField; 3] = [TeacherField::Name, TeacherField::Email, TeacherField::Fields];

    pub fn label(&self) -> &'static str {
        match self {
            TeacherField::Name => "Name",
            TeacherField::Email => "Email",
            TeacherField::Fields => "Fields",
        }
    }
}

/// Ids arrive as strings from the service, but hand-seeded data sometimes
/// has numbers.
fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// A teacher reference may be missing, null, a string or a number.
fn deserialize_reference<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_id(deserializer)?.unwrap_or_default())
}
