use std::time::Duration;

use chrono_tz::Tz;

use crate::codeforces::DEFAULT_API_BASE;

pub const DEFAULT_SWEEP_CRON: &str = "0 0 2 * * *";
pub const DEFAULT_PACING_MS: u64 = 1500;
pub const DEFAULT_SUBMISSION_LIMIT: u32 = 1000;

/// Engine tunables, read from the environment with working defaults.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub api_base: String,
    pub http_timeout: Duration,
    /// Most-recent submissions fetched per sync; deeper history is out of
    /// scope for a single pass.
    pub submission_fetch_limit: u32,
    /// Six-field cron expression for the roster sweep.
    pub cron: String,
    pub timezone: Tz,
    /// Delay between students during a sweep, keeping the upstream API
    /// under its rate limit.
    pub pacing: Duration,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self {
            api_base: std::env::var("CODEFORCES_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            http_timeout: Duration::from_secs(
                std::env::var("SYNC_HTTP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(20),
            ),
            submission_fetch_limit: std::env::var("SYNC_SUBMISSION_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SUBMISSION_LIMIT),
            cron: std::env::var("SYNC_CRON").unwrap_or_else(|_| DEFAULT_SWEEP_CRON.to_string()),
            timezone: std::env::var("SYNC_TIMEZONE")
                .ok()
                .and_then(|v| v.parse::<Tz>().ok())
                .unwrap_or(chrono_tz::Asia::Kolkata),
            pacing: Duration::from_millis(
                std::env::var("SYNC_PACING_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_PACING_MS),
            ),
        }
    }
}

/// SMTP delivery settings. Absent or incomplete configuration is not an
/// error; callers fall back to log-only delivery.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

impl SmtpSettings {
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("EMAIL_HOST").ok()?;
        let username = std::env::var("EMAIL_USER").ok()?;
        let password = std::env::var("EMAIL_PASS").ok()?;

        Some(Self {
            host,
            port: std::env::var("EMAIL_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(465),
            username,
            password,
            from_address: std::env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "Student Progress System <no-reply@example.com>".to_string()),
        })
    }
}
