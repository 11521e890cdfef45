use axum::extract::FromRef;
use domain::ReportEvent;
use storage::Db;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub tx_events: broadcast::Sender<ReportEvent>,
    pub allow_edit: bool,
}

impl AppState {
    pub fn new(db: Db, event_capacity: usize, allow_edit: bool) -> Self {
        let (tx_events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            db,
            tx_events,
            allow_edit,
        }
    }

    /// Fans the event out to every open event stream.
    pub fn publish(&self, event: ReportEvent) {
        let name = event.name();
        if self.tx_events.send(event).is_err() {
            debug!("No event listeners for {}", name);
        }
    }
}

impl FromRef<AppState> for Db {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
