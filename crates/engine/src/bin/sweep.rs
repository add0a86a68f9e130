use std::sync::Arc;

use clap::Parser;
use engine::{
    CodeforcesClient, EngineConfig, InactivityNotifier, JudgeClient, LogMailer, Mailer, PgStore,
    ProgressStore, SmtpMailer, SmtpSettings, SweepScheduler, SyncEngine,
};
use storage::Database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "sweep")]
#[command(about = "One-shot Codeforces sync sweep", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Sync a single student instead of the whole roster
    #[arg(long)]
    student: Option<Uuid>,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("sweep={log_level},engine={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EngineConfig::from_env();

    let db = Database::new(&cli.database_url).await?;
    db.run_migrations().await?;

    let store: Arc<dyn ProgressStore> = Arc::new(PgStore::new(db));
    let client: Arc<dyn JudgeClient> = Arc::new(CodeforcesClient::new(
        config.api_base.clone(),
        config.http_timeout,
    )?);
    let mailer: Arc<dyn Mailer> = match SmtpSettings::from_env() {
        Some(settings) => Arc::new(SmtpMailer::new(&settings)?),
        None => {
            tracing::warn!("SMTP not configured; reminder emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let sync = Arc::new(SyncEngine::new(
        store.clone(),
        client,
        config.submission_fetch_limit,
    ));
    let notifier = Arc::new(InactivityNotifier::new(store.clone(), mailer));

    match cli.student {
        Some(student_id) => {
            let report = sync.sync(student_id).await?;
            tracing::info!(
                new_contests = report.new_contests,
                new_submissions = report.new_submissions,
                ratings_refreshed = report.ratings_refreshed,
                "sync complete"
            );
            notifier.check_inactivity(student_id).await;
        }
        None => {
            let scheduler = SweepScheduler::new(sync, notifier, store, &config);
            scheduler.run_sweep().await;
        }
    }

    Ok(())
}
