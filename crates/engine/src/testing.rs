//! In-memory doubles for the store, judge client, and mailer seams.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use storage::error::{Result as StorageResult, StorageError};
use storage::models::{
    ContestParticipation, NewContestParticipation, NewSubmission, Student, Submission, Verdict,
};

use crate::codeforces::{CfContestEntry, CfSubmissionEntry, CfUserInfo, JudgeClient};
use crate::error::{EngineError, Result};
use crate::notifier::Mailer;
use crate::store::ProgressStore;

pub(crate) fn sample_student(handle: &str) -> Student {
    Student {
        student_id: Uuid::new_v4(),
        name: handle.to_string(),
        email: format!("{handle}@example.com"),
        phone_number: None,
        handle: handle.to_string(),
        current_rating: 0,
        max_rating: 0,
        last_sync_date: None,
        reminder_emails_sent: 0,
        disable_reminders: false,
        created_at: Utc::now(),
    }
}

pub(crate) fn accepted_submission(
    submission_id: i64,
    submitted_at: DateTime<Utc>,
) -> NewSubmission {
    NewSubmission {
        submission_id,
        problem_id: format!("1000-{submission_id}"),
        problem_name: format!("Problem {submission_id}"),
        problem_rating: 1000,
        verdict: Verdict::Accepted,
        submitted_at,
    }
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    students: Mutex<HashMap<Uuid, Student>>,
    /// Students returned by `list_students` but absent from `find_student`,
    /// simulating deletion between the roster read and the per-student work.
    phantoms: Mutex<Vec<Student>>,
    contests: Mutex<Vec<ContestParticipation>>,
    submissions: Mutex<Vec<Submission>>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_student(&self, student: Student) {
        self.students
            .lock()
            .unwrap()
            .insert(student.student_id, student);
    }

    pub(crate) fn add_phantom(&self, student: Student) {
        self.phantoms.lock().unwrap().push(student);
    }

    pub(crate) fn student(&self, id: Uuid) -> Student {
        self.students
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .expect("student seeded in test")
    }

    pub(crate) fn contest_rows(&self, student_id: Uuid) -> Vec<ContestParticipation> {
        self.contests
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.student_id == student_id)
            .cloned()
            .collect()
    }

    pub(crate) fn submission_rows(&self, student_id: Uuid) -> Vec<Submission> {
        self.submissions
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.student_id == student_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn list_students(&self) -> StorageResult<Vec<Student>> {
        let mut roster: Vec<Student> = self.students.lock().unwrap().values().cloned().collect();
        roster.extend(self.phantoms.lock().unwrap().iter().cloned());
        roster.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roster)
    }

    async fn find_student(&self, id: Uuid) -> StorageResult<Option<Student>> {
        Ok(self.students.lock().unwrap().get(&id).cloned())
    }

    async fn update_ratings(&self, id: Uuid, current: i32, max: i32) -> StorageResult<()> {
        if let Some(student) = self.students.lock().unwrap().get_mut(&id) {
            student.current_rating = current;
            student.max_rating = max;
        }
        Ok(())
    }

    async fn stamp_last_sync(&self, id: Uuid, at: DateTime<Utc>) -> StorageResult<()> {
        if let Some(student) = self.students.lock().unwrap().get_mut(&id) {
            student.last_sync_date = Some(at);
        }
        Ok(())
    }

    async fn increment_reminder_count(&self, id: Uuid) -> StorageResult<i32> {
        let mut students = self.students.lock().unwrap();
        let student = students.get_mut(&id).ok_or(StorageError::NotFound)?;
        student.reminder_emails_sent += 1;
        Ok(student.reminder_emails_sent)
    }

    async fn existing_contest_ids(&self, student_id: Uuid) -> StorageResult<HashSet<i64>> {
        Ok(self
            .contests
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.student_id == student_id)
            .map(|row| row.contest_id)
            .collect())
    }

    async fn insert_contests(
        &self,
        student_id: Uuid,
        entries: &[NewContestParticipation],
    ) -> StorageResult<u64> {
        let mut contests = self.contests.lock().unwrap();
        let mut inserted = 0u64;

        for entry in entries {
            let duplicate = contests
                .iter()
                .any(|row| row.student_id == student_id && row.contest_id == entry.contest_id);
            if duplicate {
                continue;
            }
            contests.push(ContestParticipation {
                participation_id: Uuid::new_v4(),
                student_id,
                contest_id: entry.contest_id,
                contest_name: entry.contest_name.clone(),
                rank: entry.rank,
                old_rating: entry.old_rating,
                new_rating: entry.new_rating,
                rating_change: entry.rating_change(),
                ended_at: entry.ended_at,
            });
            inserted += 1;
        }

        Ok(inserted)
    }

    async fn existing_submission_ids(&self, student_id: Uuid) -> StorageResult<HashSet<i64>> {
        Ok(self
            .submissions
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.student_id == student_id)
            .map(|row| row.submission_id)
            .collect())
    }

    async fn insert_submissions(
        &self,
        student_id: Uuid,
        entries: &[NewSubmission],
    ) -> StorageResult<u64> {
        let mut submissions = self.submissions.lock().unwrap();
        let mut inserted = 0u64;

        for entry in entries {
            let duplicate = submissions.iter().any(|row| {
                row.student_id == student_id && row.submission_id == entry.submission_id
            });
            if duplicate {
                continue;
            }
            submissions.push(Submission {
                submission_row_id: Uuid::new_v4(),
                student_id,
                submission_id: entry.submission_id,
                problem_id: entry.problem_id.clone(),
                problem_name: entry.problem_name.clone(),
                problem_rating: entry.problem_rating,
                verdict: entry.verdict,
                submitted_at: entry.submitted_at,
            });
            inserted += 1;
        }

        Ok(inserted)
    }

    async fn has_accepted_since(
        &self,
        student_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> StorageResult<bool> {
        Ok(self.submissions.lock().unwrap().iter().any(|row| {
            row.student_id == student_id
                && row.verdict.is_accepted()
                && row.submitted_at >= cutoff
        }))
    }
}

#[derive(Default)]
pub(crate) struct StubJudge {
    user_info: Mutex<Option<CfUserInfo>>,
    history: Mutex<Vec<CfContestEntry>>,
    submissions: Mutex<Vec<CfSubmissionEntry>>,
    pub(crate) info_calls: AtomicUsize,
}

impl StubJudge {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_user_info(&self, info: Option<CfUserInfo>) {
        *self.user_info.lock().unwrap() = info;
    }

    pub(crate) fn set_history(&self, history: Vec<CfContestEntry>) {
        *self.history.lock().unwrap() = history;
    }

    pub(crate) fn set_submissions(&self, submissions: Vec<CfSubmissionEntry>) {
        *self.submissions.lock().unwrap() = submissions;
    }
}

#[async_trait]
impl JudgeClient for StubJudge {
    async fn fetch_user_info(&self, _handle: &str) -> Option<CfUserInfo> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        self.user_info.lock().unwrap().clone()
    }

    async fn fetch_rating_history(&self, _handle: &str) -> Vec<CfContestEntry> {
        self.history.lock().unwrap().clone()
    }

    async fn fetch_submissions(&self, _handle: &str, _limit: u32) -> Vec<CfSubmissionEntry> {
        self.submissions.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SentEmail {
    pub(crate) to: String,
    pub(crate) subject: String,
    pub(crate) text: String,
    pub(crate) html: Option<String>,
}

#[derive(Default)]
pub(crate) struct RecordingMailer {
    sent: Mutex<Vec<SentEmail>>,
    pub(crate) fail: AtomicBool,
}

impl RecordingMailer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text: &str,
        html: Option<&str>,
    ) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EngineError::Mail("smtp unavailable".to_string()));
        }

        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            text: text.to_string(),
            html: html.map(str::to_string),
        });
        Ok(())
    }
}
