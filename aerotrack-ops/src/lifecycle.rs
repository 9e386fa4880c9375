//! Flight state machine: offer, takeoff, landing and retirement of a single
//! flight. Functions here operate on already loaded entities and never touch
//! the store; the command service loads, calls, then saves.

use aerotrack_core::{
    Airplane, AirplaneKey, AirplaneLocation, CoreError, CoreResult, Flight, FlightId, FlightStatus, Location,
    Person, Route, RouteId, SimTime,
};
use chrono::Duration;

/// Input to [`offer`].
#[derive(Debug, Clone)]
pub struct OfferRequest {
    pub flight_id: FlightId,
    pub route_id: RouteId,
    pub support_airline: Option<String>,
    pub support_tail: Option<String>,
    pub progress: u32,
    pub next_time: SimTime,
    pub cost: i64,
}

impl OfferRequest {
    /// Both halves of the airplane key, or neither.
    pub fn airplane_key(&self) -> CoreResult<Option<AirplaneKey>> {
        let airline = self.support_airline.as_deref().filter(|s| !s.trim().is_empty());
        let tail = self.support_tail.as_deref().filter(|s| !s.trim().is_empty());
        match (airline, tail) {
            (Some(airline), Some(tail)) => Ok(Some(AirplaneKey::new(airline, tail))),
            (None, None) => Ok(None),
            _ => Err(CoreError::Validation(
                "supportAirline and supportTail must be given together".into(),
            )),
        }
    }
}

/// Minutes needed to fly `distance` at `speed`, rounded up.
pub fn leg_duration(distance: u32, speed: u32) -> Duration {
    let speed = u64::from(speed.max(1));
    let minutes = (u64::from(distance) * 60).div_ceil(speed);
    Duration::minutes(minutes as i64)
}

/// Build the new on_ground flight once the caller resolved the route and the
/// airplane. The one-active-flight-per-airplane check needs the store and is
/// done by the caller.
pub fn offer(request: &OfferRequest, route: &Route, airplane: Option<&Airplane>) -> CoreResult<Flight> {
    if request.flight_id.as_str().trim().is_empty() {
        return Err(CoreError::Validation("flightID is required".into()));
    }
    if request.progress > route.leg_count() {
        return Err(CoreError::Validation(format!(
            "progress {} exceeds the {} legs of route {}",
            request.progress,
            route.leg_count(),
            route.id
        )));
    }
    let cost = u32::try_from(request.cost)
        .map_err(|_| CoreError::Validation(format!("cost must be between 0 and {}", u32::MAX)))?;

    if let Some(airplane) = airplane {
        let expected = route.ground_airport(request.progress).ok_or_else(|| {
            CoreError::InconsistentState(format!("route {} has no airport at progress {}", route.id, request.progress))
        })?;
        if airplane.parked_at() != Some(expected) {
            return Err(CoreError::InconsistentState(format!(
                "airplane {} is at {}, not at departure airport {}",
                airplane.key, airplane.location, expected
            )));
        }
    }

    Ok(Flight {
        id: request.flight_id.clone(),
        route_id: route.id.clone(),
        progress: request.progress,
        next_time: request.next_time,
        cost,
        status: FlightStatus::OnGround,
        airplane: airplane.map(|a| a.key.clone()),
    })
}

fn require_status(flight: &Flight, expected: FlightStatus) -> CoreResult<()> {
    if flight.status != expected {
        return Err(CoreError::Precondition(format!(
            "flight {} is {}, expected {}",
            flight.id, flight.status, expected
        )));
    }
    Ok(())
}

/// on_ground -> in_air. `crew` are the pilots commanding this flight; they
/// are moved aboard on success.
pub fn takeoff(
    flight: &mut Flight,
    route: &Route,
    airplane: Option<&mut Airplane>,
    crew: &mut [Person],
    now: SimTime,
) -> CoreResult<()> {
    require_status(flight, FlightStatus::OnGround)?;
    let leg = route
        .leg(flight.progress)
        .ok_or_else(|| CoreError::Precondition(format!("flight {} has completed its route", flight.id)))?;

    // 1. Airplane ready at the departure airport
    let airplane = match airplane {
        Some(airplane) if !airplane.maintenanced && airplane.parked_at() == Some(&leg.departure) => airplane,
        _ => {
            return Err(CoreError::Precondition(format!(
                "airplane unavailable for flight {} at {}",
                flight.id, leg.departure
            )));
        }
    };

    // 2. Someone in command
    if crew.is_empty() {
        return Err(CoreError::Precondition("no commanding pilot".into()));
    }

    // 3. Someone licensed for this type
    let required = airplane.required_license();
    let licensed = crew
        .iter()
        .filter_map(|p| p.pilot())
        .any(|pilot| pilot.is_licensed_for(&required));
    if !licensed {
        return Err(CoreError::Precondition(format!(
            "no commanding pilot licensed for {}",
            required
        )));
    }

    // 4. Crew can actually get on board
    let departure = Location::Airport(leg.departure.clone());
    if let Some(stray) = crew
        .iter()
        .find(|p| p.location != departure && !p.location.is_aboard(&airplane.key))
    {
        return Err(CoreError::Precondition(format!(
            "commanding pilot {} is at {}, not at {}",
            stray.id, stray.location, leg.departure
        )));
    }

    let arrival = now.plus(leg_duration(leg.distance, airplane.speed))?;
    for pilot in crew.iter_mut() {
        pilot.location = Location::Airplane(airplane.key.clone());
    }
    flight.transition(FlightStatus::InAir)?;
    flight.next_time = arrival;
    airplane.location = AirplaneLocation::Airborne;
    Ok(())
}

/// in_air -> on_ground at the current leg's arrival airport. Everyone aboard
/// stays aboard.
pub fn land(
    flight: &mut Flight,
    route: &Route,
    airplane: Option<&mut Airplane>,
    now: SimTime,
    turnaround: Duration,
) -> CoreResult<()> {
    require_status(flight, FlightStatus::InAir)?;
    let leg = route.leg(flight.progress).ok_or_else(|| {
        CoreError::InconsistentState(format!("flight {} is airborne past the end of its route", flight.id))
    })?;
    let airplane = airplane.ok_or_else(|| {
        CoreError::InconsistentState(format!("flight {} is airborne without an airplane", flight.id))
    })?;

    let ready = now.plus(turnaround)?;
    flight.transition(FlightStatus::OnGround)?;
    flight.progress += 1;
    flight.next_time = ready;
    airplane.location = AirplaneLocation::Airport(leg.arrival.clone());
    Ok(())
}

/// on_ground -> retired. `aboard` counts everyone still on the airplane.
pub fn retire(flight: &mut Flight, aboard: usize) -> CoreResult<()> {
    require_status(flight, FlightStatus::OnGround)?;
    if aboard > 0 {
        return Err(CoreError::Precondition(format!(
            "{} person(s) still aboard flight {}",
            aboard, flight.id
        )));
    }
    flight.transition(FlightStatus::Retired)
}

/// Landing predicate used by the simulation cycle.
pub fn is_due(flight: &Flight, now: SimTime) -> bool {
    flight.status == FlightStatus::InAir && flight.next_time <= now
}
