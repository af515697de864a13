//! Core library for rollbook.
//!
//! Holds everything that talks to the student/teacher record service:
//!
//! - `api`: the `RecordApi` seam and its `reqwest` implementation
//! - `models`: `Record`, `Student`, `Teacher` and the `Snapshot` view
//! - `store`: the `DataStore` that keeps the local copy in sync
//! - `config`: endpoint and timeout settings

pub mod api;
pub mod config;
pub mod models;
pub mod store;

pub use api::{ApiClient, ApiError, ErrorKind, RecordApi};
pub use config::Config;
pub use models::{Category, Record, Snapshot, Student, StudentField, Teacher, TeacherField};
pub use store::{DataStore, Route, StoreError, SyncOutcome};
