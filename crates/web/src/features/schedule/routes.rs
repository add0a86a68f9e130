use axum::{Router, routing::get};

use crate::state::AppState;

use super::handlers::{get_schedule, update_schedule};

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(get_schedule).put(update_schedule))
}
