use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::handlers::{
    contest_history, create_student, delete_student, get_student, list_students, problem_data,
    reminder_status, sync_student, update_student,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_students).post(create_student))
        .route(
            "/:id",
            get(get_student).put(update_student).delete(delete_student),
        )
        .route("/:id/sync", post(sync_student))
        .route("/:id/contest-history", get(contest_history))
        .route("/:id/problem-data", get(problem_data))
        .route("/:id/reminder-status", get(reminder_status))
}
