use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::Student;

/// Response containing one roster entry
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StudentResponse {
    pub student_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub handle: String,
    pub current_rating: i32,
    pub max_rating: i32,
    pub last_sync_date: Option<DateTime<Utc>>,
    pub reminder_emails_sent: i32,
    pub disable_reminders: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Student> for StudentResponse {
    fn from(student: Student) -> Self {
        Self {
            student_id: student.student_id,
            name: student.name,
            email: student.email,
            phone_number: student.phone_number,
            handle: student.handle,
            current_rating: student.current_rating,
            max_rating: student.max_rating,
            last_sync_date: student.last_sync_date,
            reminder_emails_sent: student.reminder_emails_sent,
            disable_reminders: student.disable_reminders,
            created_at: student.created_at,
        }
    }
}

/// Request payload for registering a new student
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateStudentRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "A valid email address is required"))]
    pub email: String,

    #[validate(length(max = 32))]
    pub phone_number: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Codeforces handle is required"))]
    pub handle: String,
}

/// Request payload for editing a student profile. Absent fields are left
/// unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateStudentRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,

    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(max = 32))]
    pub phone_number: Option<String>,

    #[validate(length(min = 1, max = 255))]
    pub handle: Option<String>,

    pub disable_reminders: Option<bool>,
}

/// Reminder bookkeeping for one student
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReminderStatusResponse {
    pub reminder_emails_sent: i32,
    pub disable_reminders: bool,
}
