use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Student {
    pub student_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    /// Codeforces handle, unique across the roster.
    pub handle: String,
    pub current_rating: i32,
    pub max_rating: i32,
    /// None until the first successful sync.
    pub last_sync_date: Option<DateTime<Utc>>,
    pub reminder_emails_sent: i32,
    pub disable_reminders: bool,
    pub created_at: DateTime<Utc>,
}
