use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use storage::Database;
use storage::error::{Result as StorageResult, StorageError};
use storage::models::{NewContestParticipation, NewSubmission, Student};
use storage::repository::{ContestRepository, StudentRepository, SubmissionRepository};
use uuid::Uuid;

/// Persistence contract of the sync engine: natural-key idempotent writes
/// against the three collections. Inserting an entry whose natural key is
/// already present is a no-op, never an error.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn list_students(&self) -> StorageResult<Vec<Student>>;

    async fn find_student(&self, id: Uuid) -> StorageResult<Option<Student>>;

    async fn update_ratings(&self, id: Uuid, current: i32, max: i32) -> StorageResult<()>;

    async fn stamp_last_sync(&self, id: Uuid, at: DateTime<Utc>) -> StorageResult<()>;

    /// Bumps the reminder counter and returns the persisted value.
    async fn increment_reminder_count(&self, id: Uuid) -> StorageResult<i32>;

    async fn existing_contest_ids(&self, student_id: Uuid) -> StorageResult<HashSet<i64>>;

    /// Returns the number of rows actually inserted.
    async fn insert_contests(
        &self,
        student_id: Uuid,
        entries: &[NewContestParticipation],
    ) -> StorageResult<u64>;

    async fn existing_submission_ids(&self, student_id: Uuid) -> StorageResult<HashSet<i64>>;

    /// Returns the number of rows actually inserted.
    async fn insert_submissions(
        &self,
        student_id: Uuid,
        entries: &[NewSubmission],
    ) -> StorageResult<u64>;

    /// Whether any accepted submission exists at or after the cutoff.
    async fn has_accepted_since(&self, student_id: Uuid, cutoff: DateTime<Utc>)
    -> StorageResult<bool>;
}

/// Postgres-backed store, a thin adapter over the storage repositories.
pub struct PgStore {
    db: Database,
}

impl PgStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProgressStore for PgStore {
    async fn list_students(&self) -> StorageResult<Vec<Student>> {
        StudentRepository::new(self.db.pool()).list().await
    }

    async fn find_student(&self, id: Uuid) -> StorageResult<Option<Student>> {
        match StudentRepository::new(self.db.pool()).find_by_id(id).await {
            Ok(student) => Ok(Some(student)),
            Err(StorageError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn update_ratings(&self, id: Uuid, current: i32, max: i32) -> StorageResult<()> {
        StudentRepository::new(self.db.pool())
            .update_ratings(id, current, max)
            .await
    }

    async fn stamp_last_sync(&self, id: Uuid, at: DateTime<Utc>) -> StorageResult<()> {
        StudentRepository::new(self.db.pool())
            .stamp_last_sync(id, at)
            .await
    }

    async fn increment_reminder_count(&self, id: Uuid) -> StorageResult<i32> {
        StudentRepository::new(self.db.pool())
            .increment_reminder_count(id)
            .await
    }

    async fn existing_contest_ids(&self, student_id: Uuid) -> StorageResult<HashSet<i64>> {
        let ids = ContestRepository::new(self.db.pool())
            .existing_ids(student_id)
            .await?;
        Ok(ids.into_iter().collect())
    }

    async fn insert_contests(
        &self,
        student_id: Uuid,
        entries: &[NewContestParticipation],
    ) -> StorageResult<u64> {
        ContestRepository::new(self.db.pool())
            .insert_many(student_id, entries)
            .await
    }

    async fn existing_submission_ids(&self, student_id: Uuid) -> StorageResult<HashSet<i64>> {
        let ids = SubmissionRepository::new(self.db.pool())
            .existing_ids(student_id)
            .await?;
        Ok(ids.into_iter().collect())
    }

    async fn insert_submissions(
        &self,
        student_id: Uuid,
        entries: &[NewSubmission],
    ) -> StorageResult<u64> {
        SubmissionRepository::new(self.db.pool())
            .insert_many(student_id, entries)
            .await
    }

    async fn has_accepted_since(
        &self,
        student_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> StorageResult<bool> {
        SubmissionRepository::new(self.db.pool())
            .exists_accepted_since(student_id, cutoff)
            .await
    }
}
