//! Pure metrics over a student's persisted submissions. Everything here is
//! a function of its inputs; `now` is passed explicitly so results are
//! reproducible.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use storage::models::Submission;

pub const HEATMAP_DAYS: u64 = 90;

/// Aggregate problem-solving view for one student.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProblemAnalytics {
    pub metrics: SolveMetrics,
    pub rating_buckets: DifficultyHistogram,
    /// Accepted-submission counts per calendar day over the trailing 90
    /// days, zero-count days included. Always spans exactly 90 days ending
    /// today, regardless of the metrics window.
    #[schema(value_type = Object)]
    pub heatmap: BTreeMap<NaiveDate, u32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SolveMetrics {
    /// `"{name} ({rating})"` of the hardest accepted problem, or "N/A".
    pub most_difficult_problem: String,
    pub total_problems_solved: usize,
    pub average_rating: f64,
    pub average_problems_per_day: f64,
}

/// Fixed difficulty buckets. Ratings below 800 (including the unrated 0
/// default) fall into no bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DifficultyHistogram {
    #[serde(rename = "800-1000")]
    pub from_800: u32,
    #[serde(rename = "1000-1200")]
    pub from_1000: u32,
    #[serde(rename = "1200-1400")]
    pub from_1200: u32,
    #[serde(rename = "1400-1600")]
    pub from_1400: u32,
    #[serde(rename = "1600-1800")]
    pub from_1600: u32,
    #[serde(rename = "1800-2000")]
    pub from_1800: u32,
    #[serde(rename = "2000+")]
    pub from_2000: u32,
}

impl DifficultyHistogram {
    fn record(&mut self, rating: i32) {
        match rating {
            800..=999 => self.from_800 += 1,
            1000..=1199 => self.from_1000 += 1,
            1200..=1399 => self.from_1200 += 1,
            1400..=1599 => self.from_1400 += 1,
            1600..=1799 => self.from_1600 += 1,
            1800..=1999 => self.from_1800 += 1,
            2000.. => self.from_2000 += 1,
            _ => {}
        }
    }

    pub fn total(&self) -> u32 {
        self.from_800
            + self.from_1000
            + self.from_1200
            + self.from_1400
            + self.from_1600
            + self.from_1800
            + self.from_2000
    }
}

/// Computes the full analytics payload. Metrics cover accepted submissions
/// within `window` (unbounded when `None`); the heatmap always covers the
/// trailing 90 days.
pub fn analyze(
    submissions: &[Submission],
    window: Option<Duration>,
    now: DateTime<Utc>,
) -> ProblemAnalytics {
    let cutoff = window.map(|w| now - w);
    let accepted: Vec<&Submission> = submissions
        .iter()
        .filter(|s| s.verdict.is_accepted())
        .filter(|s| cutoff.is_none_or(|c| s.submitted_at >= c))
        .collect();

    let mut rating_buckets = DifficultyHistogram::default();
    let mut problem_ids: HashSet<&str> = HashSet::new();
    let mut rating_sum: i64 = 0;
    let mut hardest: Option<&Submission> = None;

    for submission in &accepted {
        rating_buckets.record(submission.problem_rating);
        problem_ids.insert(submission.problem_id.as_str());
        rating_sum += i64::from(submission.problem_rating);
        if hardest.is_none_or(|h| submission.problem_rating > h.problem_rating) {
            hardest = Some(submission);
        }
    }

    let total_problems_solved = problem_ids.len();
    let average_rating = if total_problems_solved > 0 {
        round2(rating_sum as f64 / total_problems_solved as f64)
    } else {
        0.0
    };
    let most_difficult_problem = hardest
        .map(|s| format!("{} ({})", s.problem_name, s.problem_rating))
        .unwrap_or_else(|| "N/A".to_string());

    let span_days = match window {
        Some(w) => w.num_seconds() as f64 / 86_400.0,
        None => now.timestamp() as f64 / 86_400.0,
    };
    let average_problems_per_day = if total_problems_solved > 0 && span_days > 0.0 {
        round2(total_problems_solved as f64 / span_days)
    } else {
        0.0
    };

    ProblemAnalytics {
        metrics: SolveMetrics {
            most_difficult_problem,
            total_problems_solved,
            average_rating,
            average_problems_per_day,
        },
        rating_buckets,
        heatmap: heatmap(submissions, now.date_naive()),
    }
}

/// Trailing 90-day activity map ending `today`: one key per calendar day,
/// valued by the count of accepted submissions on that day.
pub fn heatmap(submissions: &[Submission], today: NaiveDate) -> BTreeMap<NaiveDate, u32> {
    let mut days: BTreeMap<NaiveDate, u32> = (0..HEATMAP_DAYS)
        .filter_map(|back| today.checked_sub_days(chrono::Days::new(back)))
        .map(|day| (day, 0))
        .collect();

    for submission in submissions.iter().filter(|s| s.verdict.is_accepted()) {
        if let Some(count) = days.get_mut(&submission.submitted_at.date_naive()) {
            *count += 1;
        }
    }

    days
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use storage::models::Verdict;
    use uuid::Uuid;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).single().unwrap()
    }

    fn submission(
        problem_id: &str,
        rating: i32,
        verdict: Verdict,
        submitted_at: DateTime<Utc>,
    ) -> Submission {
        Submission {
            submission_row_id: Uuid::new_v4(),
            student_id: Uuid::nil(),
            submission_id: 0,
            problem_id: problem_id.to_string(),
            problem_name: format!("Problem {problem_id}"),
            problem_rating: rating,
            verdict,
            submitted_at,
        }
    }

    fn accepted(problem_id: &str, rating: i32) -> Submission {
        submission(problem_id, rating, Verdict::Accepted, fixed_now())
    }

    #[test]
    fn every_rated_solve_lands_in_exactly_one_bucket() {
        let submissions = vec![
            accepted("a", 800),
            accepted("b", 999),
            accepted("c", 1000),
            accepted("d", 1999),
            accepted("e", 2000),
            accepted("f", 2500),
            accepted("g", 700),
            accepted("h", 0),
        ];

        let result = analyze(&submissions, None, fixed_now());
        let buckets = &result.rating_buckets;
        assert_eq!(buckets.from_800, 2);
        assert_eq!(buckets.from_1000, 1);
        assert_eq!(buckets.from_1800, 1);
        assert_eq!(buckets.from_2000, 2);
        // Bucket totals cover exactly the solves rated >= 800.
        assert_eq!(buckets.total(), 6);
    }

    #[test]
    fn average_rating_divides_submission_sum_by_distinct_problems() {
        let submissions = vec![
            accepted("p1", 900),
            accepted("p2", 1400),
            accepted("p3", 1400),
        ];

        let result = analyze(&submissions, None, fixed_now());
        assert_eq!(result.metrics.total_problems_solved, 3);
        assert_eq!(result.metrics.average_rating, 1233.33);
    }

    #[test]
    fn resolving_the_same_problem_counts_once_in_the_distinct_total() {
        let submissions = vec![accepted("p1", 1000), accepted("p1", 1000)];

        let result = analyze(&submissions, None, fixed_now());
        assert_eq!(result.metrics.total_problems_solved, 1);
        // Every accepted submission contributes to the rating sum, the
        // divisor is the distinct count.
        assert_eq!(result.metrics.average_rating, 2000.0);
    }

    #[test]
    fn hardest_problem_ties_break_to_the_first_seen() {
        let submissions = vec![
            accepted("first", 1600),
            accepted("second", 1600),
            accepted("easy", 900),
        ];

        let result = analyze(&submissions, None, fixed_now());
        assert_eq!(result.metrics.most_difficult_problem, "Problem first (1600)");
    }

    #[test]
    fn empty_history_degrades_to_defaults() {
        let result = analyze(&[], Some(Duration::days(30)), fixed_now());
        assert_eq!(result.metrics.most_difficult_problem, "N/A");
        assert_eq!(result.metrics.total_problems_solved, 0);
        assert_eq!(result.metrics.average_rating, 0.0);
        assert_eq!(result.metrics.average_problems_per_day, 0.0);
        assert_eq!(result.rating_buckets, DifficultyHistogram::default());
    }

    #[test]
    fn window_excludes_older_solves_from_metrics() {
        let now = fixed_now();
        let submissions = vec![
            submission("old", 1500, Verdict::Accepted, now - Duration::days(40)),
            submission("new", 1200, Verdict::Accepted, now - Duration::days(3)),
        ];

        let result = analyze(&submissions, Some(Duration::days(7)), now);
        assert_eq!(result.metrics.total_problems_solved, 1);
        assert_eq!(result.metrics.most_difficult_problem, "Problem new (1200)");
        // The 40-day-old solve is outside the metrics window but inside the
        // fixed 90-day heatmap.
        let day = (now - Duration::days(40)).date_naive();
        assert_eq!(result.heatmap.get(&day), Some(&1));
    }

    #[test]
    fn rejected_submissions_never_count() {
        let submissions = vec![
            submission("p", 1500, Verdict::WrongAnswer, fixed_now()),
            submission("p", 1500, Verdict::TimeLimit, fixed_now()),
        ];

        let result = analyze(&submissions, None, fixed_now());
        assert_eq!(result.metrics.total_problems_solved, 0);
        assert_eq!(result.rating_buckets.total(), 0);
        assert!(result.heatmap.values().all(|&count| count == 0));
    }

    #[test]
    fn average_problems_per_day_spans_the_window() {
        let now = fixed_now();
        let submissions = vec![
            submission("a", 1000, Verdict::Accepted, now - Duration::days(1)),
            submission("b", 1000, Verdict::Accepted, now - Duration::days(2)),
            submission("c", 1000, Verdict::Accepted, now - Duration::days(3)),
        ];

        let result = analyze(&submissions, Some(Duration::days(30)), now);
        assert_eq!(result.metrics.average_problems_per_day, 0.1);
    }

    #[test]
    fn heatmap_always_holds_ninety_days() {
        let now = fixed_now();
        let today = now.date_naive();

        let map = heatmap(&[], today);
        assert_eq!(map.len(), 90);
        assert_eq!(map.keys().next_back(), Some(&today));
        assert!(map.values().all(|&count| count == 0));

        let submissions = vec![
            submission("in", 1000, Verdict::Accepted, now - Duration::days(89)),
            submission("out", 1000, Verdict::Accepted, now - Duration::days(90)),
            submission("today-1", 1000, Verdict::Accepted, now),
            submission("today-2", 1000, Verdict::Accepted, now),
        ];
        let map = heatmap(&submissions, today);
        assert_eq!(map.len(), 90);
        assert_eq!(map.get(&(today - Duration::days(89))), Some(&1));
        assert_eq!(map.get(&today), Some(&2));
        assert!(!map.contains_key(&(today - Duration::days(90))));
    }
}
