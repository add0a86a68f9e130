use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// One rated contest appearance for one student. Rows are append-only and
/// unique on (student_id, contest_id).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ContestParticipation {
    pub participation_id: Uuid,
    pub student_id: Uuid,
    pub contest_id: i64,
    pub contest_name: String,
    pub rank: i32,
    pub old_rating: i32,
    pub new_rating: i32,
    pub rating_change: i32,
    pub ended_at: DateTime<Utc>,
}

/// Insert payload for a contest participation. `rating_change` is derived
/// at construction time, never taken from upstream.
#[derive(Debug, Clone)]
pub struct NewContestParticipation {
    pub contest_id: i64,
    pub contest_name: String,
    pub rank: i32,
    pub old_rating: i32,
    pub new_rating: i32,
    pub ended_at: DateTime<Utc>,
}

impl NewContestParticipation {
    pub fn rating_change(&self) -> i32 {
        self.new_rating - self.old_rating
    }
}
