//! The `DataStore`: local copy of the record collection plus the
//! operations that mutate it remotely.
//!
//! Every mutation is followed by a full reload, and the result says which
//! listing (students or teachers) the caller should show next.

pub mod data_store;
pub mod error;

pub use data_store::{DataStore, SyncOutcome};
pub use error::{Result, StoreError, UnlinkFailure};

/// Listing view to show after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Students,
    Teachers,
}
