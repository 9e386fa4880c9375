use std::sync::Arc;
use aerotrack_core::{SimClock, SimTime};
use aerotrack_ops::FlightOps;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub ops: Arc<FlightOps>,
    /// Held for the whole cycle so commands see one consistent `now`.
    pub clock: Arc<Mutex<SimClock>>,
}

impl AppState {
    pub fn new(ops: FlightOps, clock: SimClock) -> Self {
        Self {
            ops: Arc::new(ops),
            clock: Arc::new(Mutex::new(clock)),
        }
    }

    pub async fn now(&self) -> SimTime {
        self.clock.lock().await.now()
    }
}
