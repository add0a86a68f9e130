use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use storage::models::{NewContestParticipation, NewSubmission, Verdict};

use crate::codeforces::{CfContestEntry, CfSubmissionEntry, JudgeClient};
use crate::error::{EngineError, Result};
use crate::store::ProgressStore;

/// Outcome of one sync pass for one student.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SyncReport {
    pub student_id: Uuid,
    pub new_contests: u64,
    pub new_submissions: u64,
    /// False when the user-info fetch failed and stored ratings were kept.
    pub ratings_refreshed: bool,
    pub finished_at: DateTime<Utc>,
}

/// Orchestrates one student's full refresh: fetch, diff against existing
/// rows, append-only merge, rating refresh, timestamp. Re-running with
/// unchanged upstream data is a no-op on storage apart from the refreshed
/// `last_sync_date`.
pub struct SyncEngine {
    store: Arc<dyn ProgressStore>,
    client: Arc<dyn JudgeClient>,
    submission_fetch_limit: u32,
    locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn ProgressStore>,
        client: Arc<dyn JudgeClient>,
        submission_fetch_limit: u32,
    ) -> Self {
        Self {
            store,
            client,
            submission_fetch_limit,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Sync one student. Concurrent calls for the same student serialize
    /// on a per-student mutex; distinct students proceed independently.
    pub async fn sync(&self, student_id: Uuid) -> Result<SyncReport> {
        let lock = self.student_lock(student_id);
        let _guard = lock.lock().await;
        self.sync_locked(student_id).await
    }

    fn student_lock(&self, student_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().expect("student lock map poisoned");
        locks
            .entry(student_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    async fn sync_locked(&self, student_id: Uuid) -> Result<SyncReport> {
        let student = self
            .store
            .find_student(student_id)
            .await?
            .ok_or(EngineError::StudentNotFound(student_id))?;
        let handle = student.handle;
        info!(%handle, "starting sync");

        // A present user-info payload with absent rating fields means a
        // confirmed-unrated handle, so 0 is written. A failed fetch keeps
        // whatever is already stored.
        let ratings_refreshed = match self.client.fetch_user_info(&handle).await {
            Some(info) => {
                let current = info.rating.unwrap_or(0);
                let max = info.max_rating.unwrap_or(0);
                self.store.update_ratings(student_id, current, max).await?;
                info!(%handle, current, max, "ratings refreshed");
                true
            }
            None => {
                warn!(%handle, "user info unavailable; keeping stored ratings");
                false
            }
        };

        let history = self.client.fetch_rating_history(&handle).await;
        let new_contests = if history.is_empty() {
            0
        } else {
            let known = self.store.existing_contest_ids(student_id).await?;
            let fresh: Vec<NewContestParticipation> = history
                .into_iter()
                .filter(|entry| !known.contains(&entry.contest_id))
                .map(contest_row)
                .collect();
            if fresh.is_empty() {
                0
            } else {
                self.store.insert_contests(student_id, &fresh).await?
            }
        };

        let submissions = self
            .client
            .fetch_submissions(&handle, self.submission_fetch_limit)
            .await;
        let new_submissions = if submissions.is_empty() {
            0
        } else {
            let known = self.store.existing_submission_ids(student_id).await?;
            let fresh: Vec<NewSubmission> = submissions
                .into_iter()
                .filter(|entry| !known.contains(&entry.id))
                .map(submission_row)
                .collect();
            if fresh.is_empty() {
                0
            } else {
                self.store.insert_submissions(student_id, &fresh).await?
            }
        };

        let finished_at = Utc::now();
        self.store.stamp_last_sync(student_id, finished_at).await?;
        info!(%handle, new_contests, new_submissions, "sync finished");

        Ok(SyncReport {
            student_id,
            new_contests,
            new_submissions,
            ratings_refreshed,
            finished_at,
        })
    }
}

fn contest_row(entry: CfContestEntry) -> NewContestParticipation {
    NewContestParticipation {
        contest_id: entry.contest_id,
        contest_name: entry.contest_name,
        rank: entry.rank,
        old_rating: entry.old_rating,
        new_rating: entry.new_rating,
        ended_at: timestamp_utc(entry.rating_update_time_seconds),
    }
}

fn submission_row(entry: CfSubmissionEntry) -> NewSubmission {
    // Stable problem identity: contest id + index when the problem belongs
    // to a contest, otherwise the problem name.
    let problem_id = match (entry.problem.contest_id, entry.problem.index.as_deref()) {
        (Some(contest_id), Some(index)) => format!("{contest_id}-{index}"),
        _ => entry.problem.name.clone(),
    };

    NewSubmission {
        submission_id: entry.id,
        problem_id,
        problem_name: entry.problem.name,
        problem_rating: entry.problem.rating.unwrap_or(0),
        verdict: Verdict::from_api(entry.verdict.as_deref().unwrap_or("")),
        submitted_at: timestamp_utc(entry.creation_time_seconds),
    }
}

fn timestamp_utc(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codeforces::{CfProblem, CfUserInfo};
    use crate::testing::{MemoryStore, StubJudge, sample_student};

    fn contest_entry(contest_id: i64, old_rating: i32, new_rating: i32) -> CfContestEntry {
        CfContestEntry {
            contest_id,
            contest_name: format!("Round {contest_id}"),
            rank: 100,
            old_rating,
            new_rating,
            rating_update_time_seconds: 1_700_000_000 + contest_id,
        }
    }

    fn submission_entry(id: i64, verdict: &str) -> CfSubmissionEntry {
        CfSubmissionEntry {
            id,
            problem: CfProblem {
                contest_id: Some(1500),
                index: Some("A".to_string()),
                name: "Watermelon".to_string(),
                rating: Some(800),
            },
            verdict: Some(verdict.to_string()),
            creation_time_seconds: 1_700_000_000 + id,
        }
    }

    fn engine(store: Arc<MemoryStore>, judge: Arc<StubJudge>) -> SyncEngine {
        SyncEngine::new(store, judge, 1000)
    }

    #[tokio::test]
    async fn sync_of_missing_student_fails_fast() {
        let store = Arc::new(MemoryStore::new());
        let judge = Arc::new(StubJudge::new());
        let engine = engine(store, judge);

        let err = engine.sync(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, EngineError::StudentNotFound(_)));
    }

    #[tokio::test]
    async fn first_sync_persists_everything_and_stamps_the_student() {
        let store = Arc::new(MemoryStore::new());
        let student = sample_student("alice");
        let id = student.student_id;
        store.add_student(student);

        let judge = Arc::new(StubJudge::new());
        judge.set_user_info(Some(CfUserInfo {
            rating: Some(1400),
            max_rating: Some(1500),
        }));
        judge.set_history(vec![contest_entry(1, 1500, 1550), contest_entry(2, 1550, 1500)]);
        judge.set_submissions(vec![submission_entry(10, "OK"), submission_entry(11, "WRONG_ANSWER")]);

        let report = engine(store.clone(), judge).sync(id).await.unwrap();
        assert_eq!(report.new_contests, 2);
        assert_eq!(report.new_submissions, 2);
        assert!(report.ratings_refreshed);

        let student = store.student(id);
        assert_eq!(student.current_rating, 1400);
        assert_eq!(student.max_rating, 1500);
        assert!(student.last_sync_date.is_some());
    }

    #[tokio::test]
    async fn second_sync_with_unchanged_upstream_is_a_storage_noop() {
        let store = Arc::new(MemoryStore::new());
        let student = sample_student("alice");
        let id = student.student_id;
        store.add_student(student);

        let judge = Arc::new(StubJudge::new());
        judge.set_user_info(Some(CfUserInfo {
            rating: Some(1400),
            max_rating: Some(1500),
        }));
        judge.set_history(vec![contest_entry(1, 1500, 1550)]);
        judge.set_submissions(vec![submission_entry(10, "OK")]);

        let engine = engine(store.clone(), judge);
        let first = engine.sync(id).await.unwrap();
        let stamped_after_first = store.student(id).last_sync_date;

        let second = engine.sync(id).await.unwrap();
        assert_eq!(first.new_contests, 1);
        assert_eq!(second.new_contests, 0);
        assert_eq!(second.new_submissions, 0);

        let student = store.student(id);
        assert_eq!(store.contest_rows(id).len(), 1);
        assert_eq!(store.submission_rows(id).len(), 1);
        assert_eq!(student.current_rating, 1400);
        assert!(student.last_sync_date >= stamped_after_first);
    }

    #[tokio::test]
    async fn later_sync_inserts_exactly_the_upstream_delta() {
        let store = Arc::new(MemoryStore::new());
        let student = sample_student("bob");
        let id = student.student_id;
        store.add_student(student);

        let judge = Arc::new(StubJudge::new());
        judge.set_history(vec![contest_entry(1, 0, 100), contest_entry(2, 100, 200)]);

        let engine = engine(store.clone(), judge.clone());
        engine.sync(id).await.unwrap();

        judge.set_history(vec![
            contest_entry(1, 0, 100),
            contest_entry(2, 100, 200),
            contest_entry(3, 200, 350),
        ]);
        let report = engine.sync(id).await.unwrap();

        assert_eq!(report.new_contests, 1);
        let rows = store.contest_rows(id);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().any(|r| r.contest_id == 3 && r.rating_change == 150));
    }

    #[tokio::test]
    async fn rating_change_is_derived_from_the_old_new_pair() {
        let store = Arc::new(MemoryStore::new());
        let student = sample_student("carol");
        let id = student.student_id;
        store.add_student(student);

        let judge = Arc::new(StubJudge::new());
        judge.set_history(vec![contest_entry(77, 1500, 1550)]);

        engine(store.clone(), judge).sync(id).await.unwrap();

        let rows = store.contest_rows(id);
        assert_eq!(rows[0].rating_change, 50);
    }

    #[tokio::test]
    async fn failed_user_info_fetch_keeps_stored_ratings() {
        let store = Arc::new(MemoryStore::new());
        let mut student = sample_student("dave");
        student.current_rating = 1800;
        student.max_rating = 1900;
        let id = student.student_id;
        store.add_student(student);

        let judge = Arc::new(StubJudge::new());
        judge.set_user_info(None);

        let report = engine(store.clone(), judge).sync(id).await.unwrap();
        assert!(!report.ratings_refreshed);

        let student = store.student(id);
        assert_eq!(student.current_rating, 1800);
        assert_eq!(student.max_rating, 1900);
    }

    #[tokio::test]
    async fn confirmed_unrated_handle_zeroes_the_ratings() {
        let store = Arc::new(MemoryStore::new());
        let mut student = sample_student("erin");
        student.current_rating = 1200;
        student.max_rating = 1300;
        let id = student.student_id;
        store.add_student(student);

        let judge = Arc::new(StubJudge::new());
        judge.set_user_info(Some(CfUserInfo {
            rating: None,
            max_rating: None,
        }));

        engine(store.clone(), judge).sync(id).await.unwrap();

        let student = store.student(id);
        assert_eq!(student.current_rating, 0);
        assert_eq!(student.max_rating, 0);
    }

    #[tokio::test]
    async fn empty_contest_fetch_still_lets_submissions_sync() {
        let store = Arc::new(MemoryStore::new());
        let student = sample_student("frank");
        let id = student.student_id;
        store.add_student(student);

        let judge = Arc::new(StubJudge::new());
        judge.set_history(Vec::new());
        judge.set_submissions(vec![submission_entry(99, "OK")]);

        let report = engine(store.clone(), judge).sync(id).await.unwrap();
        assert_eq!(report.new_contests, 0);
        assert_eq!(report.new_submissions, 1);
        assert_eq!(store.submission_rows(id).len(), 1);
    }

    #[tokio::test]
    async fn problem_identity_prefers_contest_id_and_index() {
        let entry = submission_entry(1, "OK");
        let row = submission_row(entry);
        assert_eq!(row.problem_id, "1500-A");
        assert_eq!(row.verdict, Verdict::Accepted);

        let gym = CfSubmissionEntry {
            id: 2,
            problem: CfProblem {
                contest_id: None,
                index: None,
                name: "Gym Mystery".to_string(),
                rating: None,
            },
            verdict: None,
            creation_time_seconds: 1_700_000_000,
        };
        let row = submission_row(gym);
        assert_eq!(row.problem_id, "Gym Mystery");
        assert_eq!(row.problem_rating, 0);
        assert_eq!(row.verdict, Verdict::Other);
    }

    #[tokio::test]
    async fn same_student_syncs_serialize() {
        let store = Arc::new(MemoryStore::new());
        let student = sample_student("grace");
        let id = student.student_id;
        store.add_student(student);

        let judge = Arc::new(StubJudge::new());
        judge.set_submissions(vec![submission_entry(5, "OK")]);

        let engine = Arc::new(engine(store.clone(), judge));
        let (a, b) = tokio::join!(engine.sync(id), engine.sync(id));
        a.unwrap();
        b.unwrap();

        // Duplicate-insert races would show up as extra rows.
        assert_eq!(store.submission_rows(id).len(), 1);
    }
}
