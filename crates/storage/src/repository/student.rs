use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::student::{CreateStudentRequest, UpdateStudentRequest};
use crate::error::{Result, StorageError};
use crate::models::Student;

const STUDENT_COLUMNS: &str = "student_id, name, email, phone_number, handle, \
     current_rating, max_rating, last_sync_date, reminder_emails_sent, \
     disable_reminders, created_at";

pub struct StudentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StudentRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List the full roster
    pub async fn list(&self) -> Result<Vec<Student>> {
        let students = sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students ORDER BY name, created_at"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(students)
    }

    /// Find a student by id
    pub async fn find_by_id(&self, id: Uuid) -> Result<Student> {
        let student = sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE student_id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Ok(student)
    }

    /// Find any student holding the given email or handle, used for
    /// uniqueness checks before create/update
    pub async fn find_by_email_or_handle(
        &self,
        email: &str,
        handle: &str,
    ) -> Result<Option<Student>> {
        let student = sqlx::query_as::<_, Student>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE email = $1 OR handle = $2 LIMIT 1"
        ))
        .bind(email)
        .bind(handle)
        .fetch_optional(self.pool)
        .await?;

        Ok(student)
    }

    /// Register a new student. Ratings and counters start at their schema
    /// defaults until the first sync.
    pub async fn create(&self, req: &CreateStudentRequest) -> Result<Student> {
        let student = sqlx::query_as::<_, Student>(&format!(
            "INSERT INTO students (name, email, phone_number, handle)
             VALUES ($1, $2, $3, $4)
             RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(&req.name)
        .bind(&req.email)
        .bind(&req.phone_number)
        .bind(&req.handle)
        .fetch_one(self.pool)
        .await?;

        Ok(student)
    }

    /// Update profile fields, leaving absent request fields unchanged
    pub async fn update_profile(
        &self,
        id: Uuid,
        existing: &Student,
        req: &UpdateStudentRequest,
    ) -> Result<Student> {
        let name = req.name.as_ref().unwrap_or(&existing.name);
        let email = req.email.as_ref().unwrap_or(&existing.email);
        let phone_number = req.phone_number.as_ref().or(existing.phone_number.as_ref());
        let handle = req.handle.as_ref().unwrap_or(&existing.handle);
        let disable_reminders = req.disable_reminders.unwrap_or(existing.disable_reminders);

        let student = sqlx::query_as::<_, Student>(&format!(
            "UPDATE students
             SET name = $2, email = $3, phone_number = $4, handle = $5,
                 disable_reminders = $6
             WHERE student_id = $1
             RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(phone_number)
        .bind(handle)
        .bind(disable_reminders)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Ok(student)
    }

    /// Overwrite the rating pair after a successful user-info fetch
    pub async fn update_ratings(&self, id: Uuid, current: i32, max: i32) -> Result<()> {
        sqlx::query("UPDATE students SET current_rating = $2, max_rating = $3 WHERE student_id = $1")
            .bind(id)
            .bind(current)
            .bind(max)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Record the completion time of a sync pass
    pub async fn stamp_last_sync(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE students SET last_sync_date = $2 WHERE student_id = $1")
            .bind(id)
            .bind(at)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Bump the reminder counter and return the persisted value
    pub async fn increment_reminder_count(&self, id: Uuid) -> Result<i32> {
        let count = sqlx::query_scalar::<_, i32>(
            "UPDATE students SET reminder_emails_sent = reminder_emails_sent + 1
             WHERE student_id = $1
             RETURNING reminder_emails_sent",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Ok(count)
    }

    /// Delete a student; owned contest participations and submissions go
    /// with it via FK cascade
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM students WHERE student_id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        Ok(())
    }
}
