use crate::gateway::RecordBackend;
use crate::tracker::HabitTracker;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<HabitTracker<RecordBackend>>,
}

impl AppState {
    pub fn new(tracker: HabitTracker<RecordBackend>) -> Self {
        Self {
            tracker: Arc::new(tracker),
        }
    }
}
