//! Crew and passenger movements: boarding, disembarking, pilot assignment,
//! licensing and crew recycling.

use aerotrack_core::{
    Airplane, AirportCode, CoreError, CoreResult, Flight, FlightId, FlightStatus, LicenseType, Location, Person,
    PersonId, PilotProfile, Route,
};
use serde::Serialize;

/// Result of a boarding pass over the waiting passengers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BoardingOutcome {
    pub boarded: Vec<PersonId>,
    pub left_behind: Vec<PersonId>,
}

/// Airport a flight may board at: on_ground, route not complete, airplane
/// parked.
pub fn boarding_airport<'a>(flight: &Flight, route: &Route, airplane: Option<&'a Airplane>) -> CoreResult<&'a AirportCode> {
    if flight.status != FlightStatus::OnGround {
        return Err(CoreError::Precondition(format!("flight {} is {}", flight.id, flight.status)));
    }
    if flight.is_complete(route) {
        return Err(CoreError::Precondition(format!("flight {} has completed its route", flight.id)));
    }
    airplane
        .and_then(|a| a.parked_at())
        .ok_or_else(|| CoreError::Precondition(format!("flight {} has no airplane parked at an airport", flight.id)))
}

/// Pick who boards. `waiting` must already be sorted by person id.
pub fn plan_boarding(seat_capacity: u32, passengers_aboard: usize, waiting: &[Person]) -> CoreResult<BoardingOutcome> {
    let candidates: Vec<&Person> = waiting.iter().filter(|p| p.is_passenger()).collect();
    let free = (seat_capacity as usize).saturating_sub(passengers_aboard);

    if !candidates.is_empty() && free == 0 {
        return Err(CoreError::Capacity(format!(
            "no seats left for {} waiting passenger(s)",
            candidates.len()
        )));
    }

    let (boarded, left_behind) = candidates.split_at(free.min(candidates.len()));
    Ok(BoardingOutcome {
        boarded: boarded.iter().map(|p| p.id.clone()).collect(),
        left_behind: left_behind.iter().map(|p| p.id.clone()).collect(),
    })
}

/// Move everyone in `aboard` to `airport`. Assignments are kept.
pub fn disembark(aboard: &mut [Person], airport: &AirportCode) -> Vec<PersonId> {
    aboard
        .iter_mut()
        .map(|person| {
            person.location = Location::Airport(airport.clone());
            person.id.clone()
        })
        .collect()
}

pub fn pilot_mut(person: &mut Person) -> CoreResult<&mut PilotProfile> {
    let id = person.id.clone();
    person
        .pilot_mut()
        .ok_or_else(|| CoreError::Validation(format!("person {} is not a pilot", id)))
}

/// Drop a pilot's command. A pilot aboard `airplane` while it is parked steps
/// off to its airport; aboard an airborne airplane they stay put.
pub fn release(pilot: &mut Person, airplane: Option<&Airplane>) -> CoreResult<()> {
    pilot_mut(pilot)?.commanding_flight = None;
    if let Some(airplane) = airplane {
        if let (true, Some(airport)) = (pilot.location.is_aboard(&airplane.key), airplane.parked_at()) {
            pilot.location = Location::Airport(airport.clone());
        }
    }
    Ok(())
}

/// Everything `assign_pilot` needs to know about the target flight.
pub struct AssignTarget<'a> {
    pub flight: &'a Flight,
    pub airplane: Option<&'a Airplane>,
    pub crew_size: usize,
    pub cockpit_capacity: usize,
}

/// Give `pilot` command of the target flight. The pilot must already be
/// released from any previous on_ground flight; `previous` is the flight they
/// commanded before that.
pub fn assign(pilot: &mut Person, previous: Option<&Flight>, target: AssignTarget<'_>) -> CoreResult<()> {
    let flight = target.flight;
    if flight.status == FlightStatus::Retired {
        return Err(CoreError::Validation(format!("flight {} is retired", flight.id)));
    }
    let airplane = target
        .airplane
        .ok_or_else(|| CoreError::Validation(format!("flight {} has no airplane", flight.id)))?;
    if target.crew_size >= target.cockpit_capacity {
        return Err(CoreError::Validation(format!(
            "cockpit of flight {} is full ({} pilots)",
            flight.id, target.cockpit_capacity
        )));
    }
    if let Some(previous) = previous.filter(|f| f.status == FlightStatus::InAir && f.id != flight.id) {
        return Err(CoreError::Validation(format!(
            "pilot {} commands flight {} which is in the air",
            pilot.id, previous.id
        )));
    }

    let at_airport = airplane
        .parked_at()
        .is_some_and(|code| pilot.location == Location::Airport(code.clone()));
    if !at_airport && !pilot.location.is_aboard(&airplane.key) {
        return Err(CoreError::Validation(format!(
            "pilot {} is at {}, not with airplane {}",
            pilot.id, pilot.location, airplane.key
        )));
    }

    pilot_mut(pilot)?.commanding_flight = Some(flight.id.clone());
    Ok(())
}

/// Grant the license when absent, revoke it when held. Returns whether the
/// pilot holds it afterwards.
pub fn toggle_license(pilot: &mut PilotProfile, license: LicenseType) -> bool {
    if pilot.licenses.remove(&license) {
        false
    } else {
        pilot.licenses.insert(license);
        true
    }
}

/// Release every pilot commanding `flight`.
pub fn recycle(crew: &mut [Person], flight: &FlightId, airplane: Option<&Airplane>) -> CoreResult<Vec<PersonId>> {
    let mut released = Vec::with_capacity(crew.len());
    for pilot in crew.iter_mut().filter(|p| p.commanding_flight() == Some(flight)) {
        release(pilot, airplane)?;
        released.push(pilot.id.clone());
    }
    Ok(released)
}
