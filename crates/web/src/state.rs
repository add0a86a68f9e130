use std::sync::Arc;

use engine::{InactivityNotifier, SweepScheduler, SyncEngine};
use storage::Database;

/// Everything the handlers need, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub sync: Arc<SyncEngine>,
    pub notifier: Arc<InactivityNotifier>,
    pub scheduler: Arc<SweepScheduler>,
}
