use chrono::{Duration, Utc};
use engine::SyncReport;
use engine::analytics::{self, ProblemAnalytics};
use sqlx::PgPool;
use storage::dto::student::{CreateStudentRequest, ReminderStatusResponse, UpdateStudentRequest};
use storage::error::Result as StorageResult;
use storage::models::{ContestParticipation, Student};
use storage::repository::{ContestRepository, StudentRepository, SubmissionRepository};
use tracing::warn;
use uuid::Uuid;

use crate::error::{WebError, WebResult};
use crate::state::AppState;

/// List the full roster
pub async fn list_students(pool: &PgPool) -> StorageResult<Vec<Student>> {
    StudentRepository::new(pool).list().await
}

/// Get one student by id
pub async fn get_student(pool: &PgPool, id: Uuid) -> StorageResult<Student> {
    StudentRepository::new(pool).find_by_id(id).await
}

/// Register a student and immediately run the first sync. A failed sync
/// leaves the student registered; the caller reports it as partial data.
pub async fn create_student(
    state: &AppState,
    req: &CreateStudentRequest,
) -> WebResult<(Student, bool)> {
    let repo = StudentRepository::new(state.db.pool());
    if repo
        .find_by_email_or_handle(&req.email, &req.handle)
        .await?
        .is_some()
    {
        return Err(WebError::Conflict(
            "A student with this email or Codeforces handle already exists".to_string(),
        ));
    }

    let student = repo.create(req).await?;
    let sync_ok = match state.sync.sync(student.student_id).await {
        Ok(_) => true,
        Err(err) => {
            warn!(handle = %student.handle, %err, "initial sync failed");
            false
        }
    };

    let refreshed = repo.find_by_id(student.student_id).await?;
    Ok((refreshed, sync_ok))
}

/// Edit a profile. Every edit doubles as a "sync now" for the (possibly
/// changed) handle, and re-enabling reminders triggers an immediate
/// inactivity check.
pub async fn update_student(
    state: &AppState,
    id: Uuid,
    req: &UpdateStudentRequest,
) -> WebResult<Student> {
    let repo = StudentRepository::new(state.db.pool());
    let existing = repo.find_by_id(id).await?;

    let email = req.email.as_deref().unwrap_or(&existing.email);
    let handle = req.handle.as_deref().unwrap_or(&existing.handle);
    if let Some(other) = repo.find_by_email_or_handle(email, handle).await? {
        if other.student_id != id {
            return Err(WebError::Conflict(
                "Email or Codeforces handle already belongs to another student".to_string(),
            ));
        }
    }

    let was_suppressed = existing.disable_reminders;
    let updated = repo.update_profile(id, &existing, req).await?;

    if let Err(err) = state.sync.sync(id).await {
        warn!(handle = %updated.handle, %err, "post-update sync failed");
    }

    if was_suppressed && !updated.disable_reminders {
        state.notifier.check_inactivity(id).await;
    }

    repo.find_by_id(id).await.map_err(WebError::from)
}

/// Delete a student and, via cascade, all owned contest participations and
/// submissions
pub async fn delete_student(pool: &PgPool, id: Uuid) -> StorageResult<()> {
    StudentRepository::new(pool).delete(id).await
}

/// Manual sync trigger: sync, then the inactivity check against the
/// refreshed record, then hand back the latest state
pub async fn sync_student(state: &AppState, id: Uuid) -> WebResult<(Student, SyncReport)> {
    let repo = StudentRepository::new(state.db.pool());
    repo.find_by_id(id).await?;

    let report = state.sync.sync(id).await?;
    state.notifier.check_inactivity(id).await;

    let refreshed = repo.find_by_id(id).await?;
    Ok((refreshed, report))
}

/// Contest history, optionally bounded by a `30d`/`90d`/`365d` filter.
/// Unknown filter values fall back to the unbounded history.
pub async fn contest_history(
    pool: &PgPool,
    id: Uuid,
    filter: Option<&str>,
) -> StorageResult<Vec<ContestParticipation>> {
    let since = window_from_filter(filter, &[("30d", 30), ("90d", 90), ("365d", 365)])
        .map(|window| Utc::now() - window);
    ContestRepository::new(pool).list_for_student(id, since).await
}

/// Solve analytics over the `7d`/`30d`/`90d` window (unbounded otherwise),
/// plus the fixed 90-day heatmap
pub async fn problem_data(
    pool: &PgPool,
    id: Uuid,
    filter: Option<&str>,
) -> StorageResult<ProblemAnalytics> {
    let window = window_from_filter(filter, &[("7d", 7), ("30d", 30), ("90d", 90)]);
    let submissions = SubmissionRepository::new(pool).list_accepted(id, None).await?;
    Ok(analytics::analyze(&submissions, window, Utc::now()))
}

/// Reminder bookkeeping for one student
pub async fn reminder_status(pool: &PgPool, id: Uuid) -> StorageResult<ReminderStatusResponse> {
    let student = StudentRepository::new(pool).find_by_id(id).await?;
    Ok(ReminderStatusResponse {
        reminder_emails_sent: student.reminder_emails_sent,
        disable_reminders: student.disable_reminders,
    })
}

fn window_from_filter(filter: Option<&str>, allowed: &[(&str, i64)]) -> Option<Duration> {
    let filter = filter?;
    allowed
        .iter()
        .find(|(label, _)| *label == filter)
        .map(|(_, days)| Duration::days(*days))
}
