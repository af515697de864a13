use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::api::{ApiError, RecordApi};
use crate::models::{Category, Record, Snapshot, Student, Teacher};

use super::error::{Result, StoreError, UnlinkFailure};
use super::Route;

/// Result of a successful mutation: the reloaded records and where to go next.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub snapshot: Snapshot,
    pub route: Route,
}

#[derive(Default)]
struct State {
    snapshot: Snapshot,
    /// Sequence number of the load that produced `snapshot`.
    applied_seq: u64,
}

/// Remote-backed store for students and teachers.
///
/// Clones share the same remote and the same latest snapshot.
pub struct DataStore<A> {
    api: Arc<A>,
    state: Arc<RwLock<State>>,
    load_seq: Arc<AtomicU64>,
}

impl<A> Clone for DataStore<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            state: Arc::clone(&self.state),
            load_seq: Arc::clone(&self.load_seq),
        }
    }
}

impl<A: RecordApi> DataStore<A> {
    pub fn new(api: A) -> Self {
        Self {
            api: Arc::new(api),
            state: Arc::new(RwLock::new(State::default())),
            load_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    fn read_state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// The most recently applied snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.read_state().snapshot.clone()
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Fetch the whole collection and replace both local lists.
    ///
    /// A load only takes effect if no load started after it has already
    /// been applied; either way the latest applied snapshot is returned.
    pub async fn load_all(&self) -> Result<Snapshot> {
        Ok(self.refresh().await?)
    }

    async fn refresh(&self) -> std::result::Result<Snapshot, ApiError> {
        let seq = self.load_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let records = self.api.list().await?;
        let fresh = Snapshot::from_records(records);

        let mut state = self.write_state();
        if seq > state.applied_seq {
            debug!(
                seq,
                students = fresh.students.len(),
                teachers = fresh.teachers.len(),
                "Applied reload"
            );
            state.applied_seq = seq;
            state.snapshot = fresh;
        } else {
            debug!(seq, applied = state.applied_seq, "Discarding stale reload");
        }
        Ok(state.snapshot.clone())
    }

    async fn sync(&self, route: Route) -> Result<SyncOutcome> {
        match self.refresh().await {
            Ok(snapshot) => Ok(SyncOutcome { snapshot, route }),
            Err(source) => {
                warn!(error = %source, "Reload after write failed");
                Err(StoreError::ReloadFailed { route, source })
            }
        }
    }

    // =========================================================================
    // Students
    // =========================================================================

    /// Create the draft (no id) or replace the student stored under `id`.
    pub async fn submit_student(&self, draft: &Student, id: Option<&str>) -> Result<SyncOutcome> {
        self.submit(Record::Student(draft.clone()), id, Route::Students)
            .await
    }

    pub async fn delete_student(&self, id: &str) -> Result<SyncOutcome> {
        self.delete(id, Category::Student, Route::Students).await
    }

    /// Draft for the student form: the stored record for `id`, or the
    /// empty template.
    pub async fn fill_student_form(&self, id: Option<&str>) -> Result<Student> {
        let Some(id) = id else {
            return Ok(Student::default());
        };
        match self.api.get(id).await? {
            Record::Student(mut student) => {
                student.id.get_or_insert_with(|| id.to_string());
                Ok(student)
            }
            Record::Teacher(_) => Err(StoreError::WrongCategory {
                id: id.to_string(),
                expected: Category::Student,
                found: Category::Teacher,
            }),
        }
    }

    // =========================================================================
    // Teachers
    // =========================================================================

    pub async fn submit_teacher(&self, draft: &Teacher, id: Option<&str>) -> Result<SyncOutcome> {
        self.submit(Record::Teacher(draft.clone()), id, Route::Teachers)
            .await
    }

    pub async fn fill_teacher_form(&self, id: Option<&str>) -> Result<Teacher> {
        let Some(id) = id else {
            return Ok(Teacher::default());
        };
        match self.api.get(id).await? {
            Record::Teacher(mut teacher) => {
                teacher.id.get_or_insert_with(|| id.to_string());
                Ok(teacher)
            }
            Record::Student(_) => Err(StoreError::WrongCategory {
                id: id.to_string(),
                expected: Category::Teacher,
                found: Category::Student,
            }),
        }
    }

    /// Delete a teacher without touching the students that reference it.
    /// Those students are left dangling; prefer `delete_teacher`.
    pub async fn delete_teacher_only(&self, id: &str) -> Result<SyncOutcome> {
        self.delete(id, Category::Teacher, Route::Teachers).await
    }

    /// Delete a teacher after clearing the reference from every student
    /// that points at it.
    ///
    /// Dependents are taken from the current snapshot. Each one is
    /// re-fetched from the server, unlinked and written back; all of these
    /// run concurrently and must finish before the teacher is deleted. If
    /// any of them fails the teacher is kept and `CascadeIncomplete` lists
    /// the students that still reference it.
    pub async fn delete_teacher(&self, teacher_id: &str) -> Result<SyncOutcome> {
        if teacher_id.is_empty() {
            return Err(StoreError::MissingId(Category::Teacher));
        }

        let dependents: Vec<String> = {
            let state = self.read_state();
            state
                .snapshot
                .students_of(teacher_id)
                .into_iter()
                .filter_map(|s| s.id.clone())
                .collect()
        };
        info!(teacher_id, dependents = dependents.len(), "Deleting teacher");

        let results = join_all(
            dependents
                .iter()
                .map(|student_id| self.unlink_student(student_id, teacher_id)),
        )
        .await;

        let failed: Vec<UnlinkFailure> = dependents
            .iter()
            .zip(results)
            .filter_map(|(student_id, result)| {
                result.err().map(|error| UnlinkFailure {
                    student_id: student_id.clone(),
                    error,
                })
            })
            .collect();

        if !failed.is_empty() {
            for failure in &failed {
                warn!(
                    teacher_id,
                    student_id = %failure.student_id,
                    error = %failure.error,
                    "Failed to unlink student"
                );
            }
            // Pick up whichever unlinks did land
            if let Err(e) = self.refresh().await {
                warn!(error = %e, "Reload after incomplete unlink failed");
            }
            return Err(StoreError::CascadeIncomplete {
                teacher_id: teacher_id.to_string(),
                total: dependents.len(),
                failed,
            });
        }

        self.api.delete(teacher_id).await?;
        info!(teacher_id, unlinked = dependents.len(), "Teacher deleted");
        self.sync(Route::Teachers).await
    }

    /// Clear `teacher_id` from the server copy of a student.
    async fn unlink_student(
        &self,
        student_id: &str,
        teacher_id: &str,
    ) -> std::result::Result<(), ApiError> {
        let mut student = match self.api.get(student_id).await? {
            Record::Student(student) => student,
            Record::Teacher(_) => {
                return Err(ApiError::InvalidResponse(format!(
                    "record {} is no longer a student",
                    student_id
                )))
            }
        };
        if student.teacher != teacher_id {
            // Reassigned on the server since our snapshot was taken
            debug!(student_id, current = %student.teacher, "Student no longer linked, skipping");
            return Ok(());
        }
        student.teacher.clear();
        self.api
            .replace(student_id, &Record::Student(student))
            .await?;
        debug!(student_id, teacher_id, "Student unlinked");
        Ok(())
    }

    // =========================================================================
    // Shared
    // =========================================================================

    async fn submit(&self, record: Record, id: Option<&str>, route: Route) -> Result<SyncOutcome> {
        let category = record.category();
        match id.filter(|id| !id.is_empty()) {
            Some(id) => {
                self.api.replace(id, &record).await?;
                info!(%category, id, "Record updated");
            }
            None => {
                let created = self.api.create(&record).await?;
                info!(%category, id = ?created.id(), "Record created");
            }
        }
        self.sync(route).await
    }

    async fn delete(&self, id: &str, category: Category, route: Route) -> Result<SyncOutcome> {
        if id.is_empty() {
            return Err(StoreError::MissingId(category));
        }
        self.api.delete(id).await?;
        info!(%category, id, "Record deleted");
        self.sync(route).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::{MemoryApi, Op};
    use crate::api::ErrorKind;

    /// Teacher t1 with student s1; student s2 unassigned.
    fn seeded() -> DataStore<MemoryApi> {
        let api = MemoryApi::new();
        api.seed_teacher("t1", "Meera");
        api.seed_student("s1", "Arun", "t1");
        api.seed_student("s2", "Bina", "");
        DataStore::new(api)
    }

    fn student_on_server(store: &DataStore<MemoryApi>, id: &str) -> Student {
        match store.api().record(id) {
            Some(Record::Student(s)) => s,
            other => panic!("expected student {}, got {:?}", id, other),
        }
    }

    #[tokio::test]
    async fn test_load_all_partitions_every_record() {
        let store = seeded();
        store.api().seed_teacher("t2", "Kiran");

        let snap = store.load_all().await.unwrap();

        assert_eq!(snap.teachers.len(), 2);
        assert_eq!(snap.students.len(), 2);
        assert_eq!(snap.len(), store.api().records().len());
        for record in store.api().records() {
            let id = record.id().unwrap();
            let in_students = snap.student(id).is_some();
            let in_teachers = snap.teacher(id).is_some();
            assert!(in_students != in_teachers, "{} must be in exactly one list", id);
            assert_eq!(in_students, record.category() == Category::Student);
        }
        assert_eq!(store.snapshot().len(), 4);
    }

    #[tokio::test]
    async fn test_load_all_failure_keeps_previous_snapshot() {
        let store = seeded();
        store.load_all().await.unwrap();
        store.api().fail_list(true);

        let err = store.load_all().await.unwrap_err();

        assert_eq!(err.kind(), Some(ErrorKind::Status));
        assert_eq!(store.snapshot().len(), 3);
    }

    #[tokio::test]
    async fn test_submit_new_student_creates_one_record() {
        let store = seeded();
        store.load_all().await.unwrap();
        let before = store.api().records().len();

        let mut draft = store.fill_student_form(None).await.unwrap();
        draft.set_field(crate::models::StudentField::Name, "Chitra");
        draft.set_field(crate::models::StudentField::Email, "chitra@x.com");
        draft.set_field(crate::models::StudentField::Batch, "B7");
        draft.set_field(crate::models::StudentField::Course, "Biology");
        draft.assign_teacher(Some("t1"));

        let outcome = store.submit_student(&draft, None).await.unwrap();

        assert_eq!(outcome.route, Route::Students);
        assert_eq!(store.api().records().len(), before + 1);
        let created = outcome
            .snapshot
            .students
            .iter()
            .find(|s| s.name == "Chitra")
            .expect("new student should be listed");
        let id = created.id.clone().expect("server assigns an id");
        assert_eq!(
            *created,
            Student {
                id: Some(id),
                ..draft
            }
        );
    }

    #[tokio::test]
    async fn test_submit_existing_student_changes_only_that_record() {
        let store = seeded();
        store.load_all().await.unwrap();
        let s2_before = student_on_server(&store, "s2");

        let mut draft = store.fill_student_form(Some("s1")).await.unwrap();
        draft.course = "Chemistry".to_string();
        let outcome = store.submit_student(&draft, Some("s1")).await.unwrap();

        assert_eq!(outcome.route, Route::Students);
        assert_eq!(store.api().records().len(), 3);
        assert_eq!(student_on_server(&store, "s1"), draft);
        assert_eq!(student_on_server(&store, "s2"), s2_before);
        assert_eq!(outcome.snapshot.student("s1").unwrap().course, "Chemistry");
    }

    #[tokio::test]
    async fn test_empty_id_submits_as_create() {
        let store = seeded();
        let draft = Student {
            name: "Dev".to_string(),
            ..Default::default()
        };
        store.submit_student(&draft, Some("")).await.unwrap();
        assert!(matches!(store.api().log().as_slice(), [Op::Create(_), Op::List]));
    }

    #[tokio::test]
    async fn test_fill_student_form() {
        let store = seeded();

        let empty = store.fill_student_form(None).await.unwrap();
        assert_eq!(empty, Student::default());

        let filled = store.fill_student_form(Some("s1")).await.unwrap();
        assert_eq!(filled, student_on_server(&store, "s1"));

        let err = store.fill_student_form(Some("t1")).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::WrongCategory {
                expected: Category::Student,
                found: Category::Teacher,
                ..
            }
        ));

        let err = store.fill_student_form(Some("nope")).await.unwrap_err();
        assert!(matches!(err, StoreError::Api(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_fill_teacher_form() {
        let store = seeded();
        assert_eq!(store.fill_teacher_form(None).await.unwrap(), Teacher::default());
        let filled = store.fill_teacher_form(Some("t1")).await.unwrap();
        assert_eq!(Some(Record::Teacher(filled)), store.api().record("t1"));
        assert!(store.fill_teacher_form(Some("s1")).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_student() {
        let store = seeded();
        store.load_all().await.unwrap();

        let outcome = store.delete_student("s2").await.unwrap();

        assert_eq!(outcome.route, Route::Students);
        assert!(outcome.snapshot.student("s2").is_none());
        assert!(store.api().record("s2").is_none());
        assert!(matches!(
            store.delete_student("").await,
            Err(StoreError::MissingId(Category::Student))
        ));
    }

    #[tokio::test]
    async fn test_submit_new_teacher() {
        let store = seeded();
        let draft = Teacher {
            name: "A".to_string(),
            email: "a@x.com".to_string(),
            fields: "Math".to_string(),
            ..Default::default()
        };

        let outcome = store.submit_teacher(&draft, None).await.unwrap();

        assert_eq!(outcome.route, Route::Teachers);
        let created = outcome
            .snapshot
            .teachers
            .iter()
            .find(|t| t.name == "A")
            .expect("new teacher should be listed");
        assert!(created.id.as_deref().is_some_and(|id| !id.is_empty()));
        assert_eq!(created.email, "a@x.com");
        assert_eq!(created.fields, "Math");
    }

    #[tokio::test]
    async fn test_delete_teacher_unlinks_dependents() {
        let store = seeded();
        store.load_all().await.unwrap();
        let s2_before = student_on_server(&store, "s2");

        let outcome = store.delete_teacher("t1").await.unwrap();

        assert_eq!(outcome.route, Route::Teachers);
        assert!(store.api().record("t1").is_none());
        assert!(outcome.snapshot.teacher("t1").is_none());
        assert_eq!(student_on_server(&store, "s1").teacher, "");
        assert_eq!(student_on_server(&store, "s2"), s2_before);
        assert!(outcome.snapshot.dangling_students().is_empty());
    }

    #[tokio::test]
    async fn test_delete_teacher_waits_for_every_unlink() {
        let api = MemoryApi::new().with_replace_yields(3);
        api.seed_teacher("t1", "Meera");
        for i in 0..5 {
            api.seed_student(&format!("s{}", i), &format!("Kid{}", i), "t1");
        }
        let store = DataStore::new(api);
        store.load_all().await.unwrap();
        store.api().clear_log();

        store.delete_teacher("t1").await.unwrap();

        let log = store.api().log();
        let delete_at = log
            .iter()
            .position(|op| *op == Op::Delete("t1".to_string()))
            .expect("teacher delete should be issued");
        let replaces: Vec<usize> = log
            .iter()
            .enumerate()
            .filter(|(_, op)| matches!(op, Op::Replace(_)))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(replaces.len(), 5);
        assert!(replaces.iter().all(|&i| i < delete_at));
        for student in store.snapshot().students {
            assert_eq!(student.teacher, "");
        }
    }

    #[tokio::test]
    async fn test_delete_teacher_keeps_teacher_when_unlink_fails() {
        let store = seeded();
        store.api().seed_student("s3", "Charu", "t1");
        store.load_all().await.unwrap();
        store.api().fail_replace("s3");

        let err = store.delete_teacher("t1").await.unwrap_err();

        match &err {
            StoreError::CascadeIncomplete {
                teacher_id,
                total,
                failed,
            } => {
                assert_eq!(teacher_id, "t1");
                assert_eq!(*total, 2);
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].student_id, "s3");
            }
            other => panic!("expected CascadeIncomplete, got {:?}", other),
        }
        assert_eq!(err.kind(), Some(ErrorKind::Status));
        assert!(store.api().record("t1").is_some());
        assert!(!store.api().log().contains(&Op::Delete("t1".to_string())));
        // The unlink that succeeded stays applied and is visible locally
        assert_eq!(student_on_server(&store, "s1").teacher, "");
        assert_eq!(store.snapshot().student("s1").unwrap().teacher, "");
        assert_eq!(store.snapshot().student("s3").unwrap().teacher, "t1");
    }

    #[tokio::test]
    async fn test_delete_teacher_uses_server_copy_of_students() {
        let store = seeded();
        store.api().seed_teacher("t2", "Kiran");
        store.load_all().await.unwrap();

        // Edited elsewhere after our snapshot: new email, same teacher
        let mut s1 = student_on_server(&store, "s1");
        s1.email = "arun@new.example".to_string();
        store
            .api()
            .replace("s1", &Record::Student(s1))
            .await
            .unwrap();

        store.delete_teacher("t1").await.unwrap();

        let s1 = student_on_server(&store, "s1");
        assert_eq!(s1.teacher, "");
        assert_eq!(s1.email, "arun@new.example");
    }

    #[tokio::test]
    async fn test_delete_teacher_skips_reassigned_students() {
        let store = seeded();
        store.api().seed_teacher("t2", "Kiran");
        store.load_all().await.unwrap();

        let mut s1 = student_on_server(&store, "s1");
        s1.teacher = "t2".to_string();
        store
            .api()
            .replace("s1", &Record::Student(s1))
            .await
            .unwrap();
        store.api().clear_log();

        store.delete_teacher("t1").await.unwrap();

        assert_eq!(student_on_server(&store, "s1").teacher, "t2");
        assert!(!store.api().log().contains(&Op::Replace("s1".to_string())));
    }

    #[tokio::test]
    async fn test_delete_teacher_keeps_server_only_fields() {
        let store = seeded();
        let mut s1 = student_on_server(&store, "s1");
        s1.extra
            .insert("createdAt".to_string(), "2022-12-14T00:00:00Z".into());
        s1.extra
            .insert("avatar".to_string(), "https://img.test/s1.png".into());
        store
            .api()
            .replace("s1", &Record::Student(s1))
            .await
            .unwrap();
        store.load_all().await.unwrap();

        store.delete_teacher("t1").await.unwrap();

        let s1 = student_on_server(&store, "s1");
        assert_eq!(s1.teacher, "");
        assert_eq!(s1.extra["createdAt"], "2022-12-14T00:00:00Z");
        assert_eq!(s1.extra["avatar"], "https://img.test/s1.png");
    }

    #[tokio::test]
    async fn test_delete_teacher_keeps_teacher_when_get_fails() {
        let store = seeded();
        store.load_all().await.unwrap();
        store.api().fail_get("s1");

        let err = store.delete_teacher("t1").await.unwrap_err();

        match &err {
            StoreError::CascadeIncomplete { total, failed, .. } => {
                assert_eq!(*total, 1);
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].student_id, "s1");
            }
            other => panic!("expected CascadeIncomplete, got {:?}", other),
        }
        assert!(store.api().record("t1").is_some());
        assert!(!store.api().log().contains(&Op::Replace("s1".to_string())));
        assert_eq!(student_on_server(&store, "s1").teacher, "t1");
    }

    #[tokio::test]
    async fn test_delete_teacher_stops_when_dependent_is_no_longer_a_student() {
        let store = seeded();
        store.load_all().await.unwrap();

        // s1 was replaced by a teacher record after our snapshot
        store
            .api()
            .replace(
                "s1",
                &Record::Teacher(Teacher {
                    name: "Arun".to_string(),
                    ..Default::default()
                }),
            )
            .await
            .unwrap();

        let err = store.delete_teacher("t1").await.unwrap_err();

        let StoreError::CascadeIncomplete { failed, .. } = &err else {
            panic!("expected CascadeIncomplete, got {:?}", err);
        };
        assert_eq!(failed[0].student_id, "s1");
        assert!(matches!(failed[0].error, ApiError::InvalidResponse(_)));
        assert_eq!(err.kind(), Some(ErrorKind::Decode));
        assert!(store.api().record("t1").is_some());
    }

    #[tokio::test]
    async fn test_delete_teacher_only_leaves_dangling_students() {
        let store = seeded();
        store.load_all().await.unwrap();

        let outcome = store.delete_teacher_only("t1").await.unwrap();

        assert_eq!(outcome.route, Route::Teachers);
        let dangling: Vec<_> = outcome
            .snapshot
            .dangling_students()
            .into_iter()
            .filter_map(|s| s.id.clone())
            .collect();
        assert_eq!(dangling, vec!["s1".to_string()]);
        assert!(matches!(
            store.delete_teacher("").await,
            Err(StoreError::MissingId(Category::Teacher))
        ));
    }

    #[tokio::test]
    async fn test_reload_failure_after_write_is_reported() {
        let store = seeded();
        store.load_all().await.unwrap();
        store.api().fail_list(true);

        let draft = Teacher {
            name: "Z".to_string(),
            ..Default::default()
        };
        let err = store.submit_teacher(&draft, None).await.unwrap_err();

        assert!(matches!(
            err,
            StoreError::ReloadFailed {
                route: Route::Teachers,
                ..
            }
        ));
        // The write itself landed
        assert_eq!(store.api().records().len(), 4);
    }

    #[tokio::test]
    async fn test_stale_load_does_not_overwrite_newer_one() {
        let store = seeded();
        let (entered, release) = store.api().hold_next_list();

        let slow = store.clone();
        let stale = tokio::spawn(async move { slow.load_all().await });
        entered.await.expect("held load should start");

        // Change the server, then complete a newer load
        store.api().seed_teacher("t2", "Kiran");
        let fresh = store.load_all().await.unwrap();
        assert_eq!(fresh.teachers.len(), 2);

        release.send(()).expect("held load should be waiting");
        let returned = stale.await.unwrap().unwrap();

        assert_eq!(returned.teachers.len(), 2);
        assert_eq!(store.snapshot().teachers.len(), 2);
    }
}
