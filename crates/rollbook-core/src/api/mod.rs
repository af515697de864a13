//! REST API access for the record service.
//!
//! The service exposes one collection holding both students and teachers,
//! told apart by their `category` field. `RecordApi` is the seam the
//! `DataStore` talks through; `ApiClient` is the HTTP implementation.

pub mod client;
pub mod error;
#[cfg(test)]
pub mod memory;

use async_trait::async_trait;

use crate::models::Record;

pub use client::ApiClient;
pub use error::{ApiError, ErrorKind};

/// Remote operations on the record collection.
#[async_trait]
pub trait RecordApi: Send + Sync {
    /// Fetch every record in the collection.
    async fn list(&self) -> Result<Vec<Record>, ApiError>;

    /// Fetch a single record by id.
    async fn get(&self, id: &str) -> Result<Record, ApiError>;

    /// Create a record. The server assigns the id.
    async fn create(&self, record: &Record) -> Result<Record, ApiError>;

    /// Replace the record stored under `id`.
    async fn replace(&self, id: &str, record: &Record) -> Result<Record, ApiError>;

    /// Remove the record stored under `id`.
    async fn delete(&self, id: &str) -> Result<(), ApiError>;
}
