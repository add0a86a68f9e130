mod client;
mod models;

pub use client::{CodeforcesClient, DEFAULT_API_BASE, extract_handle};
pub use models::{CfContestEntry, CfEnvelope, CfProblem, CfSubmissionEntry, CfUserInfo};

/// Read-only view of the external judge API. Every call fails soft: a
/// network error, non-OK status, or malformed payload yields `None`/empty
/// rather than an error, and callers treat absence as "no data available
/// this round".
#[async_trait::async_trait]
pub trait JudgeClient: Send + Sync {
    async fn fetch_user_info(&self, handle: &str) -> Option<CfUserInfo>;

    async fn fetch_rating_history(&self, handle: &str) -> Vec<CfContestEntry>;

    async fn fetch_submissions(&self, handle: &str, limit: u32) -> Vec<CfSubmissionEntry>;
}
