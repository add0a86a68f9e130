use serde::Deserialize;

/// Common response wrapper of the Codeforces API. `result` is absent when
/// `status` is not "OK"; `comment` then usually explains why.
#[derive(Debug, Clone, Deserialize)]
pub struct CfEnvelope<T> {
    pub status: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub result: Option<T>,
}

/// `user.info` entry. Both rating fields are absent for handles that have
/// never been rated.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CfUserInfo {
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub max_rating: Option<i32>,
}

/// `user.rating` entry: one rated contest appearance.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CfContestEntry {
    pub contest_id: i64,
    pub contest_name: String,
    pub rank: i32,
    pub old_rating: i32,
    pub new_rating: i32,
    pub rating_update_time_seconds: i64,
}

/// `user.status` entry: one judged submission.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CfSubmissionEntry {
    pub id: i64,
    pub problem: CfProblem,
    /// Absent while the submission is still in the judging queue.
    #[serde(default)]
    pub verdict: Option<String>,
    pub creation_time_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CfProblem {
    #[serde(default)]
    pub contest_id: Option<i64>,
    #[serde(default)]
    pub index: Option<String>,
    pub name: String,
    #[serde(default)]
    pub rating: Option<i32>,
}
