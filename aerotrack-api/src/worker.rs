use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

use crate::state::AppState;

/// Runs a simulation cycle every `period`, standing in for an operator
/// pressing "next step".
pub async fn start_cycle_worker(state: AppState, period: Duration) {
    info!("Cycle worker started, one cycle every {:?}", period);

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let mut clock = state.clock.lock().await;
        match state.ops.simulation_cycle(&mut clock).await {
            Ok(report) if !report.failed.is_empty() => {
                error!("Cycle at {} left {} flight(s) unlanded", report.now, report.failed.len());
            }
            Ok(_) => {}
            Err(e) => error!("Simulation cycle failed: {}", e),
        }
    }
}
