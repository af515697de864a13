//! In-memory `RecordApi` for tests.
//!
//! Behaves like the record service (server-assigned ids, 404 for unknown
//! ids) and records every call so tests can assert on ordering.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::models::{Record, Student, Teacher};

use super::{ApiError, RecordApi};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    List,
    Get(String),
    Create(String),
    Replace(String),
    Delete(String),
}

/// A list call parked until the test releases it.
struct HeldList {
    entered: oneshot::Sender<()>,
    release: oneshot::Receiver<()>,
}

#[derive(Default)]
struct Inner {
    records: Vec<Record>,
    next_id: u64,
    log: Vec<Op>,
    fail_get: HashSet<String>,
    fail_replace: HashSet<String>,
    fail_list: bool,
    held_list: Option<HeldList>,
}

#[derive(Default)]
pub struct MemoryApi {
    inner: Mutex<Inner>,
    /// Yields inserted into every replace, to let concurrent calls interleave.
    replace_yields: usize,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replace_yields(mut self, yields: usize) -> Self {
        self.replace_yields = yields;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a record with a fixed id, bypassing the log.
    pub fn seed(&self, record: Record) {
        self.lock().records.push(record);
    }

    pub fn seed_student(&self, id: &str, name: &str, teacher: &str) {
        self.seed(Record::Student(Student {
            id: Some(id.to_string()),
            name: name.to_string(),
            email: format!("{}@school.test", name.to_lowercase()),
            batch: "B1".to_string(),
            course: "General".to_string(),
            teacher: teacher.to_string(),
            ..Default::default()
        }));
    }

    pub fn seed_teacher(&self, id: &str, name: &str) {
        self.seed(Record::Teacher(Teacher {
            id: Some(id.to_string()),
            name: name.to_string(),
            email: format!("{}@school.test", name.to_lowercase()),
            fields: "Math".to_string(),
            ..Default::default()
        }));
    }

    pub fn record(&self, id: &str) -> Option<Record> {
        self.lock().records.iter().find(|r| r.id() == Some(id)).cloned()
    }

    pub fn records(&self) -> Vec<Record> {
        self.lock().records.clone()
    }

    pub fn log(&self) -> Vec<Op> {
        self.lock().log.clone()
    }

    pub fn clear_log(&self) {
        self.lock().log.clear();
    }

    pub fn fail_get(&self, id: &str) {
        self.lock().fail_get.insert(id.to_string());
    }

    pub fn fail_replace(&self, id: &str) {
        self.lock().fail_replace.insert(id.to_string());
    }

    pub fn fail_list(&self, fail: bool) {
        self.lock().fail_list = fail;
    }

    /// Park the next `list` call after it has read the records. Resolves
    /// the first receiver once the call is parked; sending on the returned
    /// sender lets it finish.
    pub fn hold_next_list(&self) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (entered_tx, entered_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        self.lock().held_list = Some(HeldList {
            entered: entered_tx,
            release: release_rx,
        });
        (entered_rx, release_tx)
    }

    fn not_found(id: &str) -> ApiError {
        ApiError::NotFound(format!("\"{}\" not found", id))
    }

    fn injected(id: &str) -> ApiError {
        ApiError::ServerError(format!("injected failure for {}", id))
    }
}

#[async_trait]
impl RecordApi for MemoryApi {
    async fn list(&self) -> Result<Vec<Record>, ApiError> {
        let (records, held) = {
            let mut inner = self.lock();
            inner.log.push(Op::List);
            if inner.fail_list {
                return Err(ApiError::ServerError("injected list failure".to_string()));
            }
            (inner.records.clone(), inner.held_list.take())
        };
        if let Some(held) = held {
            let _ = held.entered.send(());
            let _ = held.release.await;
        }
        Ok(records)
    }

    async fn get(&self, id: &str) -> Result<Record, ApiError> {
        let mut inner = self.lock();
        inner.log.push(Op::Get(id.to_string()));
        if inner.fail_get.contains(id) {
            return Err(Self::injected(id));
        }
        inner
            .records
            .iter()
            .find(|r| r.id() == Some(id))
            .cloned()
            .ok_or_else(|| Self::not_found(id))
    }

    async fn create(&self, record: &Record) -> Result<Record, ApiError> {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = format!("new-{}", inner.next_id);
        let mut created = record.without_id();
        match &mut created {
            Record::Student(s) => s.id = Some(id.clone()),
            Record::Teacher(t) => t.id = Some(id.clone()),
        }
        inner.log.push(Op::Create(id));
        inner.records.push(created.clone());
        Ok(created)
    }

    async fn replace(&self, id: &str, record: &Record) -> Result<Record, ApiError> {
        for _ in 0..self.replace_yields {
            tokio::task::yield_now().await;
        }
        let mut inner = self.lock();
        inner.log.push(Op::Replace(id.to_string()));
        if inner.fail_replace.contains(id) {
            return Err(Self::injected(id));
        }
        let slot = inner
            .records
            .iter_mut()
            .find(|r| r.id() == Some(id))
            .ok_or_else(|| Self::not_found(id))?;
        // The path id wins over whatever id the body carries
        let mut stored = record.clone();
        match &mut stored {
            Record::Student(s) => s.id = Some(id.to_string()),
            Record::Teacher(t) => t.id = Some(id.to_string()),
        }
        *slot = stored.clone();
        Ok(stored)
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let mut inner = self.lock();
        inner.log.push(Op::Delete(id.to_string()));
        let before = inner.records.len();
        inner.records.retain(|r| r.id() != Some(id));
        if inner.records.len() == before {
            return Err(Self::not_found(id));
        }
        Ok(())
    }
}
