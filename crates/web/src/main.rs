use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use engine::{
    CodeforcesClient, EngineConfig, InactivityNotifier, JudgeClient, LogMailer, Mailer, PgStore,
    ProgressStore, SmtpMailer, SmtpSettings, SweepScheduler, SyncEngine,
};
use storage::Database;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod error;
mod features;
mod state;

use config::Config;
use state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        features::students::handlers::list_students,
        features::students::handlers::get_student,
        features::students::handlers::create_student,
        features::students::handlers::update_student,
        features::students::handlers::delete_student,
        features::students::handlers::sync_student,
        features::students::handlers::contest_history,
        features::students::handlers::problem_data,
        features::students::handlers::reminder_status,
        features::schedule::handlers::get_schedule,
        features::schedule::handlers::update_schedule,
    ),
    components(
        schemas(
            storage::dto::student::StudentResponse,
            storage::dto::student::CreateStudentRequest,
            storage::dto::student::UpdateStudentRequest,
            storage::dto::student::ReminderStatusResponse,
            storage::models::Student,
            storage::models::ContestParticipation,
            storage::models::Submission,
            storage::models::Verdict,
            engine::SyncReport,
            engine::analytics::ProblemAnalytics,
            engine::analytics::SolveMetrics,
            engine::analytics::DifficultyHistogram,
            features::students::handlers::CreateStudentResponse,
            features::students::handlers::SyncStudentResponse,
            features::schedule::handlers::ScheduleResponse,
            features::schedule::handlers::UpdateScheduleRequest,
        )
    ),
    tags(
        (name = "students", description = "Roster management, sync triggers and analytics"),
        (name = "schedule", description = "Recurring sweep schedule"),
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(true)
        .init();

    tracing::info!("Starting Student Progress API");

    let config = Config::from_env().context("Failed to load API configuration")?;
    let engine_config = EngineConfig::from_env();

    tracing::info!(
        "Connecting to database at: {}",
        config
            .database_url
            .split('@')
            .next_back()
            .unwrap_or("unknown")
    );
    let db = Database::new(&config.database_url)
        .await
        .context("Failed to initialize database")?;

    tracing::info!("Running database migrations");
    db.run_migrations()
        .await
        .context("Failed to run migrations")?;

    let store: Arc<dyn ProgressStore> = Arc::new(PgStore::new(db.clone()));
    let client: Arc<dyn JudgeClient> = Arc::new(
        CodeforcesClient::new(engine_config.api_base.clone(), engine_config.http_timeout)
            .context("Failed to build the Codeforces client")?,
    );
    let mailer: Arc<dyn Mailer> = match SmtpSettings::from_env() {
        Some(settings) => Arc::new(
            SmtpMailer::new(&settings).context("Failed to build the SMTP transport")?,
        ),
        None => {
            tracing::warn!("SMTP not configured; reminder emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let sync = Arc::new(SyncEngine::new(
        store.clone(),
        client,
        engine_config.submission_fetch_limit,
    ));
    let notifier = Arc::new(InactivityNotifier::new(store.clone(), mailer));
    let scheduler = SweepScheduler::new(sync.clone(), notifier.clone(), store, &engine_config);
    scheduler
        .start()
        .await
        .context("Failed to start the sweep scheduler")?;

    let state = AppState {
        db,
        sync,
        notifier,
        scheduler,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api/students", features::students::routes::routes())
        .nest("/api/schedule", features::schedule::routes::routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .with_state(state);

    let bind_address = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server at http://{}", bind_address);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", bind_address);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
