use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Submission outcome as reported by the judge. The engine only needs to
/// distinguish an accepted solve from everything else; the remaining
/// variants keep the most common rejection reasons readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Verdict {
    Accepted,
    WrongAnswer,
    TimeLimit,
    Other,
}

impl Verdict {
    /// Maps a Codeforces verdict string; anything unrecognized is `Other`.
    pub fn from_api(raw: &str) -> Self {
        match raw {
            "OK" => Verdict::Accepted,
            "WRONG_ANSWER" => Verdict::WrongAnswer,
            "TIME_LIMIT_EXCEEDED" => Verdict::TimeLimit,
            _ => Verdict::Other,
        }
    }

    /// The wire string stored in the `verdict` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Accepted => "OK",
            Verdict::WrongAnswer => "WRONG_ANSWER",
            Verdict::TimeLimit => "TIME_LIMIT_EXCEEDED",
            Verdict::Other => "OTHER",
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

impl sqlx::Type<sqlx::Postgres> for Verdict {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for Verdict {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> std::result::Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Verdict {
    fn decode(
        value: sqlx::postgres::PgValueRef<'r>,
    ) -> std::result::Result<Self, sqlx::error::BoxDynError> {
        let raw = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        Ok(Verdict::from_api(raw))
    }
}

/// One judged submission for one student. Rows are append-only and unique
/// on (student_id, submission_id).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Submission {
    pub submission_row_id: Uuid,
    pub student_id: Uuid,
    pub submission_id: i64,
    pub problem_id: String,
    pub problem_name: String,
    /// 0 when the judge has not assigned a difficulty.
    pub problem_rating: i32,
    pub verdict: Verdict,
    pub submitted_at: DateTime<Utc>,
}

/// Insert payload for a submission.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub submission_id: i64,
    pub problem_id: String,
    pub problem_name: String,
    pub problem_rating: i32,
    pub verdict: Verdict,
    pub submitted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_maps_from_ok() {
        assert_eq!(Verdict::from_api("OK"), Verdict::Accepted);
        assert!(Verdict::from_api("OK").is_accepted());
    }

    #[test]
    fn known_rejections_map_to_their_variants() {
        assert_eq!(Verdict::from_api("WRONG_ANSWER"), Verdict::WrongAnswer);
        assert_eq!(Verdict::from_api("TIME_LIMIT_EXCEEDED"), Verdict::TimeLimit);
    }

    #[test]
    fn unknown_verdicts_collapse_to_other() {
        assert_eq!(Verdict::from_api("COMPILATION_ERROR"), Verdict::Other);
        assert_eq!(Verdict::from_api(""), Verdict::Other);
        assert!(!Verdict::from_api("TESTING").is_accepted());
    }
}
