use aerotrack_core::{CoreResult, FlightId, SimClock, SimTime};
use aerotrack_shared::FlightEvent;
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::lifecycle;
use crate::service::FlightOps;

#[derive(Debug, Clone, Serialize)]
pub struct CycleFailure {
    pub flight_id: FlightId,
    pub error: String,
    pub retryable: bool,
}

/// What one simulation cycle did, in ascending flight id.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub now: SimTime,
    pub landed: Vec<FlightId>,
    pub failed: Vec<CycleFailure>,
}

impl FlightOps {
    /// Advance the clock one tick and land every airborne flight whose
    /// next_time has come. Grounded flights wait for an explicit takeoff.
    ///
    /// Only a failure to read the network aborts the cycle, and in that case
    /// the clock is left untouched.
    pub async fn simulation_cycle(&self, clock: &mut SimClock) -> CoreResult<CycleReport> {
        let snapshot = self.bounded("simulation_cycle", self.store().snapshot()).await?;
        let now = clock.advance()?;

        let mut due: Vec<FlightId> = snapshot
            .flights
            .iter()
            .filter(|f| lifecycle::is_due(f, now))
            .map(|f| f.id.clone())
            .collect();
        due.sort();

        let outcomes = join_all(due.iter().map(|id| self.land_if_due(id, now))).await;

        let mut report = CycleReport {
            now,
            landed: Vec::new(),
            failed: Vec::new(),
        };
        for (id, outcome) in due.into_iter().zip(outcomes) {
            match outcome {
                Ok(Some(_)) => report.landed.push(id),
                Ok(None) => {}
                Err(e) => {
                    if e.is_retryable() {
                        error!("Landing {} failed: {}", id, e);
                    } else {
                        warn!("Landing {} rejected: {}", id, e);
                    }
                    report.failed.push(CycleFailure {
                        flight_id: id,
                        error: e.to_string(),
                        retryable: e.is_retryable(),
                    });
                }
            }
        }

        info!(
            "Cycle {} at {}: {} landed, {} failed",
            clock.cycles(),
            now,
            report.landed.len(),
            report.failed.len()
        );
        self.publish(FlightEvent::ClockAdvanced {
            now: now.as_naive(),
            landed: report.landed.len(),
            failed: report.failed.len(),
        });
        Ok(report)
    }
}
