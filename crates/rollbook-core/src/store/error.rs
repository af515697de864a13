//! Store error types.

use thiserror::Error;

use crate::api::{ApiError, ErrorKind};
use crate::models::Category;

use super::Route;

/// A student the cascading delete could not detach from its teacher.
#[derive(Debug)]
pub struct UnlinkFailure {
    pub student_id: String,
    pub error: ApiError,
}

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The remote call itself failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("no {0} id given")]
    MissingId(Category),

    /// The record exists but belongs to the other category.
    #[error("record {id} is a {found}, not a {expected}")]
    WrongCategory {
        id: String,
        expected: Category,
        found: Category,
    },

    /// Some dependents kept their reference, so the teacher was left in place.
    #[error(
        "could not unlink {} of {total} students from teacher {teacher_id}; teacher was not deleted",
        .failed.len()
    )]
    CascadeIncomplete {
        teacher_id: String,
        total: usize,
        failed: Vec<UnlinkFailure>,
    },

    /// The write went through but the follow-up reload did not.
    #[error("change saved but reloading records failed: {source}")]
    ReloadFailed { route: Route, source: ApiError },
}

impl StoreError {
    /// Remote failure class, if the error came from the remote at all.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            StoreError::Api(e) | StoreError::ReloadFailed { source: e, .. } => Some(e.kind()),
            StoreError::WrongCategory { .. } => Some(ErrorKind::Decode),
            StoreError::CascadeIncomplete { failed, .. } => failed.first().map(|f| f.error.kind()),
            StoreError::MissingId(_) => None,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
