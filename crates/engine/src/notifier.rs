use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::SmtpSettings;
use crate::error::{EngineError, Result};
use crate::store::ProgressStore;

pub const INACTIVITY_WINDOW_DAYS: i64 = 7;

/// Outbound mail seam. Delivery failures are the caller's to log; nothing
/// here retries.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text: &str,
        html: Option<&str>,
    ) -> Result<()>;
}

/// SMTP delivery via lettre's async transport.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
            .map_err(|err| EngineError::Mail(err.to_string()))?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();
        let from = settings
            .from_address
            .parse::<Mailbox>()
            .map_err(|err| EngineError::Mail(err.to_string()))?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text: &str,
        html: Option<&str>,
    ) -> Result<()> {
        let to = to
            .parse::<Mailbox>()
            .map_err(|err| EngineError::Mail(err.to_string()))?;
        let builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject);

        let message = match html {
            Some(html) => builder.multipart(MultiPart::alternative_plain_html(
                text.to_string(),
                html.to_string(),
            )),
            None => builder.body(text.to_string()),
        }
        .map_err(|err| EngineError::Mail(err.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|err| EngineError::Mail(err.to_string()))?;
        Ok(())
    }
}

/// Stand-in used when SMTP is not configured: the message is written to
/// the log instead of the wire, so the rest of the workflow still runs.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text: &str,
        _html: Option<&str>,
    ) -> Result<()> {
        info!(%to, %subject, body = %text, "smtp not configured; logging email instead of sending");
        Ok(())
    }
}

/// Checks a student's recent accepted activity and nudges them by email
/// when a week has gone by without a solve.
pub struct InactivityNotifier {
    store: Arc<dyn ProgressStore>,
    mailer: Arc<dyn Mailer>,
}

impl InactivityNotifier {
    pub fn new(store: Arc<dyn ProgressStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self { store, mailer }
    }

    /// Never fails: every problem along the way is logged and swallowed so
    /// a roster sweep is not disturbed.
    pub async fn check_inactivity(&self, student_id: Uuid) {
        let student = match self.store.find_student(student_id).await {
            Ok(Some(student)) => student,
            Ok(None) => {
                warn!(%student_id, "inactivity check: student not found");
                return;
            }
            Err(err) => {
                error!(%student_id, %err, "inactivity check: failed to load student");
                return;
            }
        };

        if student.disable_reminders {
            debug!(name = %student.name, "inactivity check: reminders disabled, skipping");
            return;
        }

        let cutoff = Utc::now() - Duration::days(INACTIVITY_WINDOW_DAYS);
        let active = match self.store.has_accepted_since(student_id, cutoff).await {
            Ok(active) => active,
            Err(err) => {
                error!(%student_id, %err, "inactivity check: failed to read submissions");
                return;
            }
        };
        if active {
            debug!(name = %student.name, "active within the window; no reminder");
            return;
        }

        // The counter only ever moves forward; resumed activity does not
        // rewind it.
        let count = match self.store.increment_reminder_count(student_id).await {
            Ok(count) => count,
            Err(err) => {
                error!(%student_id, %err, "inactivity check: failed to bump reminder counter");
                return;
            }
        };

        let (subject, text, html) = reminder_email(&student.name, count);
        match self
            .mailer
            .send_email(&student.email, &subject, &text, Some(&html))
            .await
        {
            Ok(()) => info!(name = %student.name, count, "inactivity reminder sent"),
            Err(err) => {
                error!(email = %student.email, %err, "failed to send inactivity reminder");
            }
        }
    }
}

fn reminder_email(name: &str, count: i32) -> (String, String, String) {
    let subject = format!("Time to get back to problem solving, {name}!");
    let text = format!(
        "Hi {name},\n\nWe noticed you haven't made any Codeforces submissions in the \
         last 7 days. Time to get back into action and sharpen your skills!\n\n\
         Keep practicing!\n\nThis is reminder number {count}.\n\n\
         Your Progress Management System"
    );
    let html = format!(
        "<p>Hi {name},</p>\
         <p>We noticed you haven't made any Codeforces submissions in the last 7 days. \
         Time to get back into action and sharpen your skills!</p>\
         <p>Keep practicing!</p>\
         <p>This is reminder number {count}.</p>\
         <p>Your Progress Management System</p>"
    );
    (subject, text, html)
}
