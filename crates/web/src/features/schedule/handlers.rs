use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::WebError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScheduleResponse {
    /// Six-field cron expression driving the roster sweep
    pub cron: String,
    pub timezone: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateScheduleRequest {
    #[validate(length(min = 1, message = "A cron expression is required"))]
    pub cron: String,
}

#[utoipa::path(
    get,
    path = "/api/schedule",
    responses(
        (status = 200, description = "Active sweep schedule", body = ScheduleResponse)
    ),
    tag = "schedule"
)]
pub async fn get_schedule(State(state): State<AppState>) -> Result<Response, WebError> {
    let response = ScheduleResponse {
        cron: state.scheduler.current_schedule().await,
        timezone: state.scheduler.timezone().to_string(),
    };

    Ok(Json(response).into_response())
}

#[utoipa::path(
    put,
    path = "/api/schedule",
    request_body = UpdateScheduleRequest,
    responses(
        (status = 200, description = "Schedule replaced", body = ScheduleResponse),
        (status = 400, description = "Invalid cron expression")
    ),
    tag = "schedule"
)]
pub async fn update_schedule(
    State(state): State<AppState>,
    Json(req): Json<UpdateScheduleRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    state
        .scheduler
        .reschedule(&req.cron)
        .await
        .map_err(|err| WebError::BadRequest(format!("Invalid schedule: {err}")))?;

    let response = ScheduleResponse {
        cron: state.scheduler.current_schedule().await,
        timezone: state.scheduler.timezone().to_string(),
    };

    Ok(Json(response).into_response())
}
