use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use engine::SyncReport;
use engine::analytics::ProblemAnalytics;
use serde::{Deserialize, Serialize};
use storage::dto::student::{
    CreateStudentRequest, ReminderStatusResponse, StudentResponse, UpdateStudentRequest,
};
use storage::models::ContestParticipation;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::WebError;
use crate::state::AppState;

use super::services;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreateStudentResponse {
    pub message: String,
    pub student: StudentResponse,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SyncStudentResponse {
    pub message: String,
    pub student: StudentResponse,
    pub report: SyncReport,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Time window such as `7d`, `30d`, `90d` or `365d`; unbounded when
    /// absent or unrecognized
    pub filter: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/students",
    responses(
        (status = 200, description = "List the student roster", body = Vec<StudentResponse>)
    ),
    tag = "students"
)]
pub async fn list_students(State(state): State<AppState>) -> Result<Response, WebError> {
    let students = services::list_students(state.db.pool()).await?;

    let response: Vec<StudentResponse> = students.into_iter().map(StudentResponse::from).collect();

    Ok(Json(response).into_response())
}

#[utoipa::path(
    get,
    path = "/api/students/{id}",
    params(
        ("id" = Uuid, Path, description = "Student id")
    ),
    responses(
        (status = 200, description = "Student found", body = StudentResponse),
        (status = 404, description = "Student not found")
    ),
    tag = "students"
)]
pub async fn get_student(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let student = services::get_student(state.db.pool(), id).await?;

    Ok(Json(StudentResponse::from(student)).into_response())
}

#[utoipa::path(
    post,
    path = "/api/students",
    request_body = CreateStudentRequest,
    responses(
        (status = 201, description = "Student registered and synced", body = CreateStudentResponse),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Email or handle already in use")
    ),
    tag = "students"
)]
pub async fn create_student(
    State(state): State<AppState>,
    Json(req): Json<CreateStudentRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let (student, sync_ok) = services::create_student(&state, &req).await?;

    let message = if sync_ok {
        "Student added and Codeforces data synced successfully".to_string()
    } else {
        "Student added but the Codeforces sync failed; try syncing manually later".to_string()
    };

    Ok((
        StatusCode::CREATED,
        Json(CreateStudentResponse {
            message,
            student: StudentResponse::from(student),
        }),
    )
        .into_response())
}

#[utoipa::path(
    put,
    path = "/api/students/{id}",
    params(
        ("id" = Uuid, Path, description = "Student id")
    ),
    request_body = UpdateStudentRequest,
    responses(
        (status = 200, description = "Student updated and re-synced", body = StudentResponse),
        (status = 404, description = "Student not found"),
        (status = 409, description = "Email or handle already in use")
    ),
    tag = "students"
)]
pub async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStudentRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let student = services::update_student(&state, id, &req).await?;

    Ok(Json(StudentResponse::from(student)).into_response())
}

#[utoipa::path(
    delete,
    path = "/api/students/{id}",
    params(
        ("id" = Uuid, Path, description = "Student id")
    ),
    responses(
        (status = 204, description = "Student and all owned data deleted"),
        (status = 404, description = "Student not found")
    ),
    tag = "students"
)]
pub async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    services::delete_student(state.db.pool(), id).await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

#[utoipa::path(
    post,
    path = "/api/students/{id}/sync",
    params(
        ("id" = Uuid, Path, description = "Student id")
    ),
    responses(
        (status = 200, description = "Sync completed", body = SyncStudentResponse),
        (status = 404, description = "Student not found")
    ),
    tag = "students"
)]
pub async fn sync_student(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let (student, report) = services::sync_student(&state, id).await?;

    Ok(Json(SyncStudentResponse {
        message: "Codeforces data synced successfully".to_string(),
        student: StudentResponse::from(student),
        report,
    })
    .into_response())
}

#[utoipa::path(
    get,
    path = "/api/students/{id}/contest-history",
    params(
        ("id" = Uuid, Path, description = "Student id"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "Contest history, oldest first", body = Vec<ContestParticipation>)
    ),
    tag = "students"
)]
pub async fn contest_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Response, WebError> {
    let contests =
        services::contest_history(state.db.pool(), id, query.filter.as_deref()).await?;

    Ok(Json(contests).into_response())
}

#[utoipa::path(
    get,
    path = "/api/students/{id}/problem-data",
    params(
        ("id" = Uuid, Path, description = "Student id"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "Solve metrics, difficulty histogram and 90-day heatmap", body = ProblemAnalytics)
    ),
    tag = "students"
)]
pub async fn problem_data(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Response, WebError> {
    let analytics = services::problem_data(state.db.pool(), id, query.filter.as_deref()).await?;

    Ok(Json(analytics).into_response())
}

#[utoipa::path(
    get,
    path = "/api/students/{id}/reminder-status",
    params(
        ("id" = Uuid, Path, description = "Student id")
    ),
    responses(
        (status = 200, description = "Reminder bookkeeping", body = ReminderStatusResponse),
        (status = 404, description = "Student not found")
    ),
    tag = "students"
)]
pub async fn reminder_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, WebError> {
    let status = services::reminder_status(state.db.pool(), id).await?;

    Ok(Json(status).into_response())
}
