use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{ContestParticipation, NewContestParticipation};

pub struct ContestRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContestRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Contest ids already stored for a student, for delta computation
    pub async fn existing_ids(&self, student_id: Uuid) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT contest_id FROM contest_participations WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_all(self.pool)
        .await?;

        Ok(ids)
    }

    /// Insert new participations, skipping natural-key duplicates, and
    /// return how many rows actually landed. The rating change is derived
    /// here from the old/new pair, never trusted from upstream.
    pub async fn insert_many(
        &self,
        student_id: Uuid,
        entries: &[NewContestParticipation],
    ) -> Result<u64> {
        let mut inserted = 0u64;

        for entry in entries {
            let result = sqlx::query(
                "INSERT INTO contest_participations
                     (student_id, contest_id, contest_name, rank, old_rating,
                      new_rating, rating_change, ended_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 ON CONFLICT (student_id, contest_id) DO NOTHING",
            )
            .bind(student_id)
            .bind(entry.contest_id)
            .bind(&entry.contest_name)
            .bind(entry.rank)
            .bind(entry.old_rating)
            .bind(entry.new_rating)
            .bind(entry.rating_change())
            .bind(entry.ended_at)
            .execute(self.pool)
            .await?;

            inserted += result.rows_affected();
        }

        Ok(inserted)
    }

    /// Participation history for a student, oldest first, optionally
    /// bounded to contests ending at or after `since`
    pub async fn list_for_student(
        &self,
        student_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ContestParticipation>> {
        let contests = sqlx::query_as::<_, ContestParticipation>(
            "SELECT participation_id, student_id, contest_id, contest_name, rank,
                    old_rating, new_rating, rating_change, ended_at
             FROM contest_participations
             WHERE student_id = $1 AND ($2::timestamptz IS NULL OR ended_at >= $2)
             ORDER BY ended_at",
        )
        .bind(student_id)
        .bind(since)
        .fetch_all(self.pool)
        .await?;

        Ok(contests)
    }
}
