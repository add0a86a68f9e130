use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::warn;

use super::models::{CfContestEntry, CfEnvelope, CfSubmissionEntry, CfUserInfo};
use super::JudgeClient;
use crate::error::Result;

pub const DEFAULT_API_BASE: &str = "https://codeforces.com/api";

/// Profile-URL prefixes stripped from handle input. Checked in this exact
/// order; the first match wins.
const PROFILE_URL_PREFIXES: [&str; 3] = [
    "https://codeforces.com/profile/",
    "http://codeforces.com/profile/",
    "codeforces.com/profile/",
];

/// Normalizes raw handle input: trims whitespace, strips the first
/// matching profile-URL prefix, trims again.
pub fn extract_handle(input: &str) -> String {
    let mut cleaned = input.trim();
    for prefix in PROFILE_URL_PREFIXES {
        if let Some(rest) = cleaned.strip_prefix(prefix) {
            cleaned = rest;
            break;
        }
    }
    cleaned.trim().to_string()
}

pub struct CodeforcesClient {
    base_url: String,
    client: reqwest::Client,
}

impl CodeforcesClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    async fn get_envelope<T: DeserializeOwned + Default>(&self, query: &str) -> Result<CfEnvelope<T>> {
        let url = format!("{}/{}", self.base_url, query);
        let response = self.client.get(&url).send().await?;
        let envelope = response.json::<CfEnvelope<T>>().await?;
        Ok(envelope)
    }
}

#[async_trait::async_trait]
impl JudgeClient for CodeforcesClient {
    async fn fetch_user_info(&self, handle: &str) -> Option<CfUserInfo> {
        let handle = extract_handle(handle);
        if handle.is_empty() {
            warn!("fetch_user_info: no usable handle after normalization");
            return None;
        }

        match self
            .get_envelope::<Vec<CfUserInfo>>(&format!("user.info?handles={handle}"))
            .await
        {
            Ok(envelope) if envelope.status == "OK" => {
                envelope.result.unwrap_or_default().into_iter().next()
            }
            Ok(envelope) => {
                warn!(
                    %handle,
                    comment = envelope.comment.as_deref().unwrap_or("unknown error"),
                    "user.info returned a non-OK status"
                );
                None
            }
            Err(err) => {
                warn!(%handle, %err, "user.info request failed");
                None
            }
        }
    }

    async fn fetch_rating_history(&self, handle: &str) -> Vec<CfContestEntry> {
        let handle = extract_handle(handle);
        if handle.is_empty() {
            warn!("fetch_rating_history: no usable handle after normalization");
            return Vec::new();
        }

        match self
            .get_envelope::<Vec<CfContestEntry>>(&format!("user.rating?handle={handle}"))
            .await
        {
            Ok(envelope) if envelope.status == "OK" => envelope.result.unwrap_or_default(),
            Ok(envelope) => {
                warn!(
                    %handle,
                    comment = envelope.comment.as_deref().unwrap_or("unknown error"),
                    "user.rating returned a non-OK status"
                );
                Vec::new()
            }
            Err(err) => {
                warn!(%handle, %err, "user.rating request failed");
                Vec::new()
            }
        }
    }

    async fn fetch_submissions(&self, handle: &str, limit: u32) -> Vec<CfSubmissionEntry> {
        let handle = extract_handle(handle);
        if handle.is_empty() {
            warn!("fetch_submissions: no usable handle after normalization");
            return Vec::new();
        }

        match self
            .get_envelope::<Vec<CfSubmissionEntry>>(&format!(
                "user.status?handle={handle}&from=1&count={limit}"
            ))
            .await
        {
            Ok(envelope) if envelope.status == "OK" => envelope.result.unwrap_or_default(),
            Ok(envelope) => {
                warn!(
                    %handle,
                    comment = envelope.comment.as_deref().unwrap_or("unknown error"),
                    "user.status returned a non-OK status"
                );
                Vec::new()
            }
            Err(err) => {
                warn!(%handle, %err, "user.status request failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_handle_is_trimmed() {
        assert_eq!(extract_handle("  tourist  "), "tourist");
    }

    #[test]
    fn https_profile_url_is_stripped() {
        assert_eq!(
            extract_handle("https://codeforces.com/profile/tourist"),
            "tourist"
        );
    }

    #[test]
    fn prefix_priority_is_first_match_wins() {
        // The https prefix contains the bare one as a substring; only the
        // first matching prefix may be stripped, exactly once.
        assert_eq!(
            extract_handle("http://codeforces.com/profile/Petr"),
            "Petr"
        );
        assert_eq!(extract_handle("codeforces.com/profile/Petr"), "Petr");
        assert_eq!(
            extract_handle("https://codeforces.com/profile/codeforces.com/profile/x"),
            "codeforces.com/profile/x"
        );
    }

    #[test]
    fn whitespace_after_prefix_is_trimmed() {
        assert_eq!(
            extract_handle("  https://codeforces.com/profile/rng_58  "),
            "rng_58"
        );
    }

    #[test]
    fn empty_input_normalizes_to_empty() {
        assert_eq!(extract_handle("   "), "");
        assert_eq!(extract_handle("https://codeforces.com/profile/"), "");
    }

    #[test]
    fn user_info_envelope_parses_without_rating_fields() {
        let raw = r#"{"status":"OK","result":[{"handle":"newbie123"}]}"#;
        let envelope: CfEnvelope<Vec<CfUserInfo>> = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.status, "OK");
        let info = &envelope.result.unwrap()[0];
        assert_eq!(info.rating, None);
        assert_eq!(info.max_rating, None);
    }

    #[test]
    fn failed_envelope_parses_with_comment_and_no_result() {
        let raw = r#"{"status":"FAILED","comment":"handles: User with handle x not found"}"#;
        let envelope: CfEnvelope<Vec<CfUserInfo>> = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.status, "FAILED");
        assert!(envelope.result.is_none());
        assert!(envelope.comment.unwrap().contains("not found"));
    }

    #[test]
    fn submission_entry_parses_with_and_without_contest_id() {
        let raw = r#"{
            "id": 42,
            "problem": {"contestId": 1500, "index": "A", "name": "Two Sum", "rating": 800},
            "verdict": "OK",
            "creationTimeSeconds": 1700000000
        }"#;
        let entry: CfSubmissionEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.problem.contest_id, Some(1500));
        assert_eq!(entry.problem.index.as_deref(), Some("A"));
        assert_eq!(entry.problem.rating, Some(800));

        let raw = r#"{
            "id": 43,
            "problem": {"name": "Gym Mystery"},
            "creationTimeSeconds": 1700000001
        }"#;
        let entry: CfSubmissionEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.problem.contest_id, None);
        assert_eq!(entry.problem.rating, None);
        assert_eq!(entry.verdict, None);
    }

    #[test]
    fn contest_entry_parses_camel_case_fields() {
        let raw = r#"{
            "contestId": 1700,
            "contestName": "Round 900",
            "rank": 17,
            "oldRating": 1500,
            "newRating": 1550,
            "ratingUpdateTimeSeconds": 1700000000
        }"#;
        let entry: CfContestEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.contest_id, 1700);
        assert_eq!(entry.new_rating - entry.old_rating, 50);
    }
}
