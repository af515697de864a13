//! Data models for the record service.
//!
//! - `Record`: one entry of the shared collection, tagged by `category`
//! - `Student`, `Teacher`: the two record kinds, also used as form drafts
//! - `Snapshot`: the partitioned local copy of the collection

pub mod record;
pub mod snapshot;

pub use record::{Category, Record, Student, StudentField, Teacher, TeacherField};
pub use snapshot::{Snapshot, TeacherLink};
