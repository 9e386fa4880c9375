use aerotrack_core::{
    Airplane, CoreError, CoreResult, EntityStore, Flight, FlightId, FlightStatus, LicenseType, Location,
    Person, PersonId, Route, SimTime, StoreTx,
};
use aerotrack_shared::{EventEnvelope, FlightEvent};
use chrono::Duration;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::crew::{self, AssignTarget, BoardingOutcome};
use crate::lifecycle::{self, OfferRequest};
use crate::locks::FlightLocks;

/// Tunables for the command service.
#[derive(Debug, Clone)]
pub struct OpsRules {
    pub turnaround: Duration,
    pub cockpit_capacity: usize,
    pub store_timeout: std::time::Duration,
}

impl Default for OpsRules {
    fn default() -> Self {
        Self {
            turnaround: Duration::minutes(60),
            cockpit_capacity: 2,
            store_timeout: std::time::Duration::from_secs(3),
        }
    }
}

/// Entry point for every state-changing command.
///
/// Each command locks the flight(s) it touches, runs in one store
/// transaction, and publishes a [`FlightEvent`] once committed. Locks are
/// always taken before the transaction is opened.
pub struct FlightOps {
    store: Arc<dyn EntityStore>,
    locks: FlightLocks,
    rules: OpsRules,
    events: broadcast::Sender<EventEnvelope>,
}

// ============================================================================
// Loading helpers
// ============================================================================

pub(crate) async fn load_flight(tx: &mut dyn StoreTx, id: &FlightId) -> CoreResult<Flight> {
    tx.flight(id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("flight {}", id)))
}

pub(crate) async fn load_route(tx: &mut dyn StoreTx, flight: &Flight) -> CoreResult<Route> {
    tx.route(&flight.route_id).await?.ok_or_else(|| {
        CoreError::InconsistentState(format!("flight {} references missing route {}", flight.id, flight.route_id))
    })
}

pub(crate) async fn load_airplane(tx: &mut dyn StoreTx, flight: &Flight) -> CoreResult<Option<Airplane>> {
    match &flight.airplane {
        Some(key) => tx.airplane(key).await?.map(Some).ok_or_else(|| {
            CoreError::InconsistentState(format!("flight {} references missing airplane {}", flight.id, key))
        }),
        None => Ok(None),
    }
}

async fn load_person(tx: &mut dyn StoreTx, id: &PersonId) -> CoreResult<Person> {
    tx.person(id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("person {}", id)))
}

impl FlightOps {
    pub fn new(store: Arc<dyn EntityStore>, rules: OpsRules) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            store,
            locks: FlightLocks::new(),
            rules,
            events,
        }
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    pub fn rules(&self) -> &OpsRules {
        &self.rules
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events.subscribe()
    }

    pub(crate) fn publish(&self, event: FlightEvent) {
        let name = event.name();
        if self.events.send(EventEnvelope::new(event)).is_err() {
            debug!("No subscribers for {} event", name);
        }
    }

    /// Run `work` under the store timeout. Expiry is a transient failure.
    pub(crate) async fn bounded<T, F>(&self, command: &str, work: F) -> CoreResult<T>
    where
        F: Future<Output = CoreResult<T>>,
    {
        match tokio::time::timeout(self.rules.store_timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{} timed out after {:?}", command, self.rules.store_timeout);
                Err(CoreError::Transient(format!("{} timed out", command)))
            }
        }
    }

    // ========================================================================
    // Flight state machine
    // ========================================================================

    pub async fn offer_flight(&self, request: OfferRequest) -> CoreResult<Flight> {
        let flight = self
            .bounded("offer_flight", async {
                let key = request.airplane_key()?;
                let _guard = self.locks.lock(&request.flight_id).await;
                let mut tx = self.store.begin().await?;

                if tx.flight(&request.flight_id).await?.is_some() {
                    return Err(CoreError::Validation(format!("flight {} already exists", request.flight_id)));
                }
                let route = tx
                    .route(&request.route_id)
                    .await?
                    .ok_or_else(|| CoreError::Validation(format!("unknown route {}", request.route_id)))?;

                let airplane = match &key {
                    Some(key) => Some(
                        tx.airplane(key)
                            .await?
                            .ok_or_else(|| CoreError::Validation(format!("unknown airplane {}", key)))?,
                    ),
                    None => None,
                };
                if let Some(key) = &key {
                    if let Some(other) = tx.active_flight_for(key).await? {
                        return Err(CoreError::Conflict(format!(
                            "airplane {} already supports flight {}",
                            key, other.id
                        )));
                    }
                }

                let flight = lifecycle::offer(&request, &route, airplane.as_ref())?;
                tx.insert_flight(&flight).await?;
                tx.commit().await?;
                Ok(flight)
            })
            .await?;

        info!("Offered flight {} on route {}", flight.id, flight.route_id);
        self.publish(FlightEvent::Offered {
            flight_id: flight.id.to_string(),
            route_id: flight.route_id.to_string(),
            airplane: flight.airplane.as_ref().map(|k| k.to_string()),
            next_time: flight.next_time.as_naive(),
        });
        Ok(flight)
    }

    pub async fn flight_takeoff(&self, flight_id: &FlightId, now: SimTime) -> CoreResult<Flight> {
        let (flight, route) = self
            .bounded("flight_takeoff", async {
                let _guard = self.locks.lock(flight_id).await;
                let mut tx = self.store.begin().await?;

                let mut flight = load_flight(&mut *tx, flight_id).await?;
                let route = load_route(&mut *tx, &flight).await?;
                let mut airplane = load_airplane(&mut *tx, &flight).await?;
                let mut crew = tx.crew_of(flight_id).await?;

                lifecycle::takeoff(&mut flight, &route, airplane.as_mut(), &mut crew, now)?;

                tx.save_flight(&flight).await?;
                if let Some(airplane) = &airplane {
                    tx.save_airplane(airplane).await?;
                }
                for pilot in &crew {
                    tx.save_person(pilot).await?;
                }
                tx.commit().await?;
                Ok((flight, route))
            })
            .await?;

        let leg = route.leg(flight.progress);
        info!("Flight {} took off, due {}", flight.id, flight.next_time);
        self.publish(FlightEvent::TookOff {
            flight_id: flight.id.to_string(),
            airplane: flight.airplane.as_ref().map(|k| k.to_string()).unwrap_or_default(),
            departing_from: leg.map(|l| l.departure.to_string()).unwrap_or_default(),
            arriving_at: leg.map(|l| l.arrival.to_string()).unwrap_or_default(),
            next_time: flight.next_time.as_naive(),
        });
        Ok(flight)
    }

    pub async fn flight_landing(&self, flight_id: &FlightId, now: SimTime) -> CoreResult<Flight> {
        self.land(flight_id, now, false)
            .await?
            .ok_or_else(|| CoreError::Internal(format!("flight {} landing produced no result", flight_id)))
    }

    /// Land the flight only if it is still due at `now`. `Ok(None)` means
    /// there was nothing to do.
    pub async fn land_if_due(&self, flight_id: &FlightId, now: SimTime) -> CoreResult<Option<Flight>> {
        self.land(flight_id, now, true).await
    }

    async fn land(&self, flight_id: &FlightId, now: SimTime, only_if_due: bool) -> CoreResult<Option<Flight>> {
        let landed = self
            .bounded("flight_landing", async {
                let _guard = self.locks.lock(flight_id).await;
                let mut tx = self.store.begin().await?;

                let mut flight = load_flight(&mut *tx, flight_id).await?;
                if only_if_due && !lifecycle::is_due(&flight, now) {
                    return Ok(None);
                }
                let route = load_route(&mut *tx, &flight).await?;
                let mut airplane = if flight.status == FlightStatus::InAir {
                    load_airplane(&mut *tx, &flight).await?
                } else {
                    None
                };

                lifecycle::land(&mut flight, &route, airplane.as_mut(), now, self.rules.turnaround)?;

                tx.save_flight(&flight).await?;
                if let Some(airplane) = &airplane {
                    tx.save_airplane(airplane).await?;
                }
                tx.commit().await?;
                let complete = flight.is_complete(&route);
                Ok(Some((flight, airplane, complete)))
            })
            .await?;

        let Some((flight, airplane, complete)) = landed else {
            return Ok(None);
        };
        let airport = airplane
            .as_ref()
            .and_then(|a| a.parked_at())
            .map(|c| c.to_string())
            .unwrap_or_default();
        info!("Flight {} landed at {} (progress {})", flight.id, airport, flight.progress);
        self.publish(FlightEvent::Landed {
            flight_id: flight.id.to_string(),
            airplane: flight.airplane.as_ref().map(|k| k.to_string()).unwrap_or_default(),
            airport,
            progress: flight.progress,
            complete,
            next_time: flight.next_time.as_naive(),
        });
        Ok(Some(flight))
    }

    pub async fn retire_flight(&self, flight_id: &FlightId) -> CoreResult<Flight> {
        let flight = self
            .bounded("retire_flight", async {
                let _guard = self.locks.lock(flight_id).await;
                let mut tx = self.store.begin().await?;

                let mut flight = load_flight(&mut *tx, flight_id).await?;
                let aboard = match &flight.airplane {
                    Some(key) => tx.people_at(&Location::Airplane(key.clone())).await?.len(),
                    None => 0,
                };
                lifecycle::retire(&mut flight, aboard)?;

                // Nobody is aboard, so releasing never moves anyone.
                let mut crew = tx.crew_of(flight_id).await?;
                crew::recycle(&mut crew, flight_id, None)?;

                tx.save_flight(&flight).await?;
                for pilot in &crew {
                    tx.save_person(pilot).await?;
                }
                tx.commit().await?;
                Ok(flight)
            })
            .await?;

        info!("Retired flight {}", flight.id);
        self.publish(FlightEvent::Retired {
            flight_id: flight.id.to_string(),
        });
        Ok(flight)
    }

    // ========================================================================
    // Crew & passengers
    // ========================================================================

    pub async fn passengers_board(&self, flight_id: &FlightId) -> CoreResult<BoardingOutcome> {
        let outcome = self
            .bounded("passengers_board", async {
                let _guard = self.locks.lock(flight_id).await;
                let mut tx = self.store.begin().await?;

                let flight = load_flight(&mut *tx, flight_id).await?;
                let route = load_route(&mut *tx, &flight).await?;
                let airplane = load_airplane(&mut *tx, &flight).await?;
                let airport = crew::boarding_airport(&flight, &route, airplane.as_ref())?.clone();
                let Some(airplane) = airplane else {
                    return Err(CoreError::Precondition(format!("flight {} has no airplane", flight.id)));
                };

                let aboard = tx.people_at(&Location::Airplane(airplane.key.clone())).await?;
                let passengers_aboard = aboard.iter().filter(|p| p.is_passenger()).count();
                let waiting = tx.people_at(&Location::Airport(airport)).await?;

                let outcome = crew::plan_boarding(airplane.seat_capacity, passengers_aboard, &waiting)?;
                for mut person in waiting.into_iter().filter(|p| outcome.boarded.contains(&p.id)) {
                    person.location = Location::Airplane(airplane.key.clone());
                    tx.save_person(&person).await?;
                }
                tx.commit().await?;
                Ok(outcome)
            })
            .await?;

        info!(
            "Boarded {} passenger(s) on flight {}, {} left behind",
            outcome.boarded.len(),
            flight_id,
            outcome.left_behind.len()
        );
        self.publish(FlightEvent::Boarded {
            flight_id: flight_id.to_string(),
            passengers: outcome.boarded.iter().map(|p| p.to_string()).collect(),
            left_behind: outcome.left_behind.len(),
        });
        Ok(outcome)
    }

    pub async fn passengers_disembark(&self, flight_id: &FlightId) -> CoreResult<Vec<PersonId>> {
        let (moved, airport) = self
            .bounded("passengers_disembark", async {
                let _guard = self.locks.lock(flight_id).await;
                let mut tx = self.store.begin().await?;

                let flight = load_flight(&mut *tx, flight_id).await?;
                if flight.status != FlightStatus::OnGround {
                    return Err(CoreError::Precondition(format!("flight {} is {}", flight.id, flight.status)));
                }
                let airplane = load_airplane(&mut *tx, &flight)
                    .await?
                    .ok_or_else(|| CoreError::Precondition(format!("flight {} has no airplane", flight.id)))?;
                let airport = airplane.parked_at().cloned().ok_or_else(|| {
                    CoreError::InconsistentState(format!("airplane {} of grounded flight {} is airborne", airplane.key, flight.id))
                })?;

                let mut aboard = tx.people_at(&Location::Airplane(airplane.key.clone())).await?;
                let moved = crew::disembark(&mut aboard, &airport);
                for person in &aboard {
                    tx.save_person(person).await?;
                }
                tx.commit().await?;
                Ok((moved, airport))
            })
            .await?;

        info!("Disembarked {} person(s) from flight {} at {}", moved.len(), flight_id, airport);
        self.publish(FlightEvent::Disembarked {
            flight_id: flight_id.to_string(),
            airport: airport.to_string(),
            persons: moved.iter().map(|p| p.to_string()).collect(),
        });
        Ok(moved)
    }

    /// Set or clear a pilot's command.
    pub async fn assign_pilot(&self, person_id: &PersonId, flight_id: Option<&FlightId>) -> CoreResult<Person> {
        let person = self
            .bounded("assign_pilot", async {
                // 1. Find the current assignment so both flights can be locked
                let previous_id = {
                    let mut tx = self.store.begin().await?;
                    let person = load_person(&mut *tx, person_id).await?;
                    person.commanding_flight().cloned()
                };
                let to_lock: Vec<FlightId> = previous_id.iter().chain(flight_id).cloned().collect();
                let _guards = self.locks.lock_many(&to_lock).await;

                // 2. Re-read under the locks
                let mut tx = self.store.begin().await?;
                let mut person = load_person(&mut *tx, person_id).await?;
                crew::pilot_mut(&mut person)?;
                if person.commanding_flight() != previous_id.as_ref() {
                    return Err(CoreError::Transient(format!(
                        "assignment of pilot {} changed concurrently",
                        person_id
                    )));
                }
                if previous_id.as_ref().is_some_and(|prev| Some(prev) == flight_id) {
                    return Ok(person);
                }

                let previous = match &previous_id {
                    Some(id) => tx.flight(id).await?,
                    None => None,
                };

                // 3. Release from the previous flight unless it is airborne
                let previous_airborne = previous.as_ref().is_some_and(|f| f.status == FlightStatus::InAir);
                match flight_id {
                    None => {
                        let airplane = match &previous {
                            Some(prev) => load_airplane(&mut *tx, prev).await?,
                            None => None,
                        };
                        crew::release(&mut person, airplane.as_ref())?;
                    }
                    Some(target_id) => {
                        if !previous_airborne {
                            let airplane = match &previous {
                                Some(prev) => load_airplane(&mut *tx, prev).await?,
                                None => None,
                            };
                            crew::release(&mut person, airplane.as_ref())?;
                        }

                        // 4. Validate and assign the target
                        let target = tx
                            .flight(target_id)
                            .await?
                            .ok_or_else(|| CoreError::Validation(format!("unknown flight {}", target_id)))?;
                        let airplane = match &target.airplane {
                            Some(key) => tx.airplane(key).await?,
                            None => None,
                        };
                        let crew_size = tx.crew_of(target_id).await?.len();
                        crew::assign(
                            &mut person,
                            previous.as_ref(),
                            AssignTarget {
                                flight: &target,
                                airplane: airplane.as_ref(),
                                crew_size,
                                cockpit_capacity: self.rules.cockpit_capacity,
                            },
                        )?;
                    }
                }

                tx.save_person(&person).await?;
                tx.commit().await?;
                Ok(person)
            })
            .await?;

        info!(
            "Pilot {} now commands {}",
            person.id,
            person.commanding_flight().map(|f| f.as_str()).unwrap_or("nothing")
        );
        self.publish(FlightEvent::PilotAssigned {
            person_id: person.id.to_string(),
            flight_id: person.commanding_flight().map(|f| f.to_string()),
        });
        Ok(person)
    }

    /// Grant or revoke one license. Returns the pilot afterwards.
    pub async fn toggle_license(&self, person_id: &PersonId, license: &str) -> CoreResult<Person> {
        if license.trim().is_empty() {
            return Err(CoreError::Validation("license is required".into()));
        }
        let license = LicenseType::new(license);
        let (person, granted) = self
            .bounded("toggle_license", async {
                let mut tx = self.store.begin().await?;
                let mut person = load_person(&mut *tx, person_id).await?;
                let profile = person
                    .pilot_mut()
                    .ok_or_else(|| CoreError::NotFound(format!("pilot {}", person_id)))?;
                let granted = crew::toggle_license(profile, license.clone());
                tx.save_person(&person).await?;
                tx.commit().await?;
                Ok((person, granted))
            })
            .await?;

        info!(
            "License {} {} pilot {}",
            license,
            if granted { "granted to" } else { "revoked from" },
            person.id
        );
        self.publish(FlightEvent::LicenseToggled {
            person_id: person.id.to_string(),
            license: license.to_string(),
            granted,
        });
        Ok(person)
    }

    pub async fn recycle_crew(&self, flight_id: &FlightId) -> CoreResult<Vec<PersonId>> {
        let released = self
            .bounded("recycle_crew", async {
                let _guard = self.locks.lock(flight_id).await;
                let mut tx = self.store.begin().await?;

                let flight = load_flight(&mut *tx, flight_id).await?;
                if flight.status == FlightStatus::InAir {
                    return Err(CoreError::Precondition(format!("flight {} is in the air", flight.id)));
                }
                let airplane = load_airplane(&mut *tx, &flight).await?;
                let mut crew = tx.crew_of(flight_id).await?;
                let released = crew::recycle(&mut crew, flight_id, airplane.as_ref())?;
                for pilot in &crew {
                    tx.save_person(pilot).await?;
                }
                tx.commit().await?;
                Ok(released)
            })
            .await?;

        info!("Recycled {} pilot(s) from flight {}", released.len(), flight_id);
        self.publish(FlightEvent::CrewRecycled {
            flight_id: flight_id.to_string(),
            pilots: released.iter().map(|p| p.to_string()).collect(),
        });
        Ok(released)
    }
}
