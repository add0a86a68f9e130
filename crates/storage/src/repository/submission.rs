use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{NewSubmission, Submission, Verdict};

pub struct SubmissionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SubmissionRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Submission ids already stored for a student, for delta computation
    pub async fn existing_ids(&self, student_id: Uuid) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT submission_id FROM submissions WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_all(self.pool)
        .await?;

        Ok(ids)
    }

    /// Insert new submissions, skipping natural-key duplicates, and return
    /// how many rows actually landed
    pub async fn insert_many(&self, student_id: Uuid, entries: &[NewSubmission]) -> Result<u64> {
        let mut inserted = 0u64;

        for entry in entries {
            let result = sqlx::query(
                "INSERT INTO submissions
                     (student_id, submission_id, problem_id, problem_name,
                      problem_rating, verdict, submitted_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 ON CONFLICT (student_id, submission_id) DO NOTHING",
            )
            .bind(student_id)
            .bind(entry.submission_id)
            .bind(&entry.problem_id)
            .bind(&entry.problem_name)
            .bind(entry.problem_rating)
            .bind(entry.verdict)
            .bind(entry.submitted_at)
            .execute(self.pool)
            .await?;

            inserted += result.rows_affected();
        }

        Ok(inserted)
    }

    /// Accepted submissions for a student, optionally bounded to those
    /// submitted at or after `since`
    pub async fn list_accepted(
        &self,
        student_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Submission>> {
        let submissions = sqlx::query_as::<_, Submission>(
            "SELECT submission_row_id, student_id, submission_id, problem_id,
                    problem_name, problem_rating, verdict, submitted_at
             FROM submissions
             WHERE student_id = $1
               AND verdict = $2
               AND ($3::timestamptz IS NULL OR submitted_at >= $3)
             ORDER BY submitted_at",
        )
        .bind(student_id)
        .bind(Verdict::Accepted)
        .bind(since)
        .fetch_all(self.pool)
        .await?;

        Ok(submissions)
    }

    /// Whether any accepted submission exists at or after the cutoff
    pub async fn exists_accepted_since(
        &self,
        student_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                 SELECT 1 FROM submissions
                 WHERE student_id = $1 AND verdict = $2 AND submitted_at >= $3
             )",
        )
        .bind(student_id)
        .bind(Verdict::Accepted)
        .bind(cutoff)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }
}
