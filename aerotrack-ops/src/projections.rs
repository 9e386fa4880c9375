//! Read-side views. Each one is computed from a single snapshot, so a flight
//! is never seen half way through a transition.

use aerotrack_core::{
    AirportCode, CoreResult, Flight, FlightId, FlightStatus, Location, NetworkSnapshot, Person, PersonId, SimTime,
};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::service::FlightOps;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightsInAirRow {
    pub departing_from: AirportCode,
    pub arriving_at: AirportCode,
    pub num_flights: usize,
    pub flight_list: Vec<FlightId>,
    pub earliest_arrival: SimTime,
    pub latest_arrival: SimTime,
    pub airplane_list: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightsOnGroundRow {
    pub departing_from: AirportCode,
    pub num_flights: usize,
    pub flight_list: Vec<FlightId>,
    pub earliest_arrival: SimTime,
    pub latest_arrival: SimTime,
    pub airplane_list: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeopleInAirRow {
    pub departing_from: AirportCode,
    pub arriving_at: AirportCode,
    pub num_airplanes: usize,
    pub airplane_list: Vec<String>,
    pub flight_list: Vec<FlightId>,
    pub earliest_arrival: SimTime,
    pub latest_arrival: SimTime,
    pub num_pilots: usize,
    pub num_passengers: usize,
    pub joint_pilots_passengers: usize,
    pub person_list: Vec<PersonId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeopleOnGroundRow {
    pub departing_from: AirportCode,
    pub airport: String,
    pub airport_name: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub num_pilots: usize,
    pub num_passengers: usize,
    pub joint_pilots_passengers: usize,
    pub person_list: Vec<PersonId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSummaryRow {
    pub route: String,
    pub num_legs: usize,
    pub leg_sequence: Vec<String>,
    pub route_length: u64,
    pub num_flights: usize,
    pub flight_list: Vec<FlightId>,
    pub airport_sequence: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlternateAirportsRow {
    pub city: String,
    pub state: String,
    pub country: String,
    pub num_airports: usize,
    pub airport_code_list: Vec<AirportCode>,
    pub airport_name_list: Vec<String>,
}

/// Accumulates the flight columns shared by several views.
struct FlightGroup {
    flights: Vec<FlightId>,
    airplanes: Vec<String>,
    earliest: SimTime,
    latest: SimTime,
}

impl FlightGroup {
    fn start(flight: &Flight) -> Self {
        let mut group = Self {
            flights: Vec::new(),
            airplanes: Vec::new(),
            earliest: flight.next_time,
            latest: flight.next_time,
        };
        group.add(flight);
        group
    }

    fn add(&mut self, flight: &Flight) {
        self.flights.push(flight.id.clone());
        if let Some(key) = &flight.airplane {
            self.airplanes.push(key.to_string());
        }
        self.earliest = self.earliest.min(flight.next_time);
        self.latest = self.latest.max(flight.next_time);
    }
}

fn group_flight<K: Ord>(groups: &mut BTreeMap<K, FlightGroup>, key: K, flight: &Flight) {
    groups
        .entry(key)
        .and_modify(|group| group.add(flight))
        .or_insert_with(|| FlightGroup::start(flight));
}

/// Current leg endpoints of an airborne flight.
fn airborne_leg(snapshot: &NetworkSnapshot, flight: &Flight) -> Option<(AirportCode, AirportCode)> {
    let leg = snapshot.route(&flight.route_id)?.leg(flight.progress)?;
    Some((leg.departure.clone(), leg.arrival.clone()))
}

pub fn flights_in_the_air(snapshot: &NetworkSnapshot) -> Vec<FlightsInAirRow> {
    let mut groups: BTreeMap<(AirportCode, AirportCode), FlightGroup> = BTreeMap::new();
    for flight in snapshot.flights.iter().filter(|f| f.status == FlightStatus::InAir) {
        if let Some(key) = airborne_leg(snapshot, flight) {
            group_flight(&mut groups, key, flight);
        }
    }
    groups
        .into_iter()
        .map(|((departing_from, arriving_at), group)| FlightsInAirRow {
            departing_from,
            arriving_at,
            num_flights: group.flights.len(),
            earliest_arrival: group.earliest,
            latest_arrival: group.latest,
            flight_list: group.flights,
            airplane_list: group.airplanes,
        })
        .collect()
}

pub fn flights_on_the_ground(snapshot: &NetworkSnapshot) -> Vec<FlightsOnGroundRow> {
    let mut groups: BTreeMap<AirportCode, FlightGroup> = BTreeMap::new();
    for flight in snapshot.flights.iter().filter(|f| f.status == FlightStatus::OnGround) {
        let parked = flight
            .airplane
            .as_ref()
            .and_then(|key| snapshot.airplane(key))
            .and_then(|a| a.parked_at().cloned());
        let airport = parked.or_else(|| {
            snapshot
                .route(&flight.route_id)
                .and_then(|r| r.ground_airport(flight.progress).cloned())
        });
        if let Some(airport) = airport {
            group_flight(&mut groups, airport, flight);
        }
    }
    groups
        .into_iter()
        .map(|(departing_from, group)| FlightsOnGroundRow {
            departing_from,
            num_flights: group.flights.len(),
            earliest_arrival: group.earliest,
            latest_arrival: group.latest,
            flight_list: group.flights,
            airplane_list: group.airplanes,
        })
        .collect()
}

fn count_roles(people: &[&Person]) -> (usize, usize) {
    let pilots = people.iter().filter(|p| p.is_pilot()).count();
    (pilots, people.len() - pilots)
}

pub fn people_in_the_air(snapshot: &NetworkSnapshot) -> Vec<PeopleInAirRow> {
    let mut flights: BTreeMap<(AirportCode, AirportCode), FlightGroup> = BTreeMap::new();
    let mut people: BTreeMap<(AirportCode, AirportCode), Vec<&Person>> = BTreeMap::new();
    for flight in snapshot.flights.iter().filter(|f| f.status == FlightStatus::InAir) {
        let (Some(key), Some(leg)) = (&flight.airplane, airborne_leg(snapshot, flight)) else {
            continue;
        };
        let aboard = Location::Airplane(key.clone());
        let onboard: Vec<&Person> = snapshot.people.iter().filter(|p| p.location == aboard).collect();
        if onboard.is_empty() {
            continue;
        }
        group_flight(&mut flights, leg.clone(), flight);
        people.entry(leg).or_default().extend(onboard);
    }

    flights
        .into_iter()
        .map(|(leg, group)| {
            let mut persons = people.remove(&leg).unwrap_or_default();
            persons.sort_by(|a, b| a.id.cmp(&b.id));
            let (num_pilots, num_passengers) = count_roles(&persons);
            let (departing_from, arriving_at) = leg;
            PeopleInAirRow {
                departing_from,
                arriving_at,
                num_airplanes: group.airplanes.len(),
                earliest_arrival: group.earliest,
                latest_arrival: group.latest,
                airplane_list: group.airplanes,
                flight_list: group.flights,
                num_pilots,
                num_passengers,
                joint_pilots_passengers: num_pilots + num_passengers,
                person_list: persons.iter().map(|p| p.id.clone()).collect(),
            }
        })
        .collect()
}

pub fn people_on_the_ground(snapshot: &NetworkSnapshot) -> Vec<PeopleOnGroundRow> {
    let mut groups: BTreeMap<AirportCode, Vec<&Person>> = BTreeMap::new();
    for person in &snapshot.people {
        if let Location::Airport(code) = &person.location {
            groups.entry(code.clone()).or_default().push(person);
        }
    }

    groups
        .into_iter()
        .filter_map(|(code, people)| {
            let airport = snapshot.airport(&code)?;
            let (num_pilots, num_passengers) = count_roles(&people);
            Some(PeopleOnGroundRow {
                airport: Location::Airport(code.clone()).to_string(),
                departing_from: code,
                airport_name: airport.name.clone(),
                city: airport.city.clone(),
                state: airport.state.clone(),
                country: airport.country.clone(),
                num_pilots,
                num_passengers,
                joint_pilots_passengers: num_pilots + num_passengers,
                person_list: people.iter().map(|p| p.id.clone()).collect(),
            })
        })
        .collect()
}

pub fn route_summary(snapshot: &NetworkSnapshot) -> Vec<RouteSummaryRow> {
    snapshot
        .routes
        .iter()
        .map(|route| {
            let flight_list: Vec<FlightId> = snapshot
                .flights
                .iter()
                .filter(|f| f.route_id == route.id)
                .map(|f| f.id.clone())
                .collect();
            RouteSummaryRow {
                route: route.id.to_string(),
                num_legs: route.legs.len(),
                leg_sequence: route.legs.iter().map(|l| l.leg_id.clone()).collect(),
                route_length: route.length(),
                num_flights: flight_list.len(),
                flight_list,
                airport_sequence: route
                    .legs
                    .iter()
                    .map(|l| format!("{}->{}", l.departure, l.arrival))
                    .collect(),
            }
        })
        .collect()
}

pub fn alternate_airports(snapshot: &NetworkSnapshot) -> Vec<AlternateAirportsRow> {
    let mut groups: BTreeMap<(String, String, String), Vec<(AirportCode, String)>> = BTreeMap::new();
    for airport in &snapshot.airports {
        groups
            .entry((airport.city.clone(), airport.state.clone(), airport.country.clone()))
            .or_default()
            .push((airport.code.clone(), airport.name.clone()));
    }
    groups
        .into_iter()
        .filter(|(_, airports)| airports.len() > 1)
        .map(|((city, state, country), airports)| {
            let (airport_code_list, airport_name_list): (Vec<_>, Vec<_>) = airports.into_iter().unzip();
            AlternateAirportsRow {
                city,
                state,
                country,
                num_airports: airport_code_list.len(),
                airport_code_list,
                airport_name_list,
            }
        })
        .collect()
}

impl FlightOps {
    pub async fn flights_in_the_air(&self) -> CoreResult<Vec<FlightsInAirRow>> {
        Ok(flights_in_the_air(&self.snapshot().await?))
    }

    pub async fn flights_on_the_ground(&self) -> CoreResult<Vec<FlightsOnGroundRow>> {
        Ok(flights_on_the_ground(&self.snapshot().await?))
    }

    pub async fn people_in_the_air(&self) -> CoreResult<Vec<PeopleInAirRow>> {
        Ok(people_in_the_air(&self.snapshot().await?))
    }

    pub async fn people_on_the_ground(&self) -> CoreResult<Vec<PeopleOnGroundRow>> {
        Ok(people_on_the_ground(&self.snapshot().await?))
    }

    pub async fn route_summary(&self) -> CoreResult<Vec<RouteSummaryRow>> {
        Ok(route_summary(&self.snapshot().await?))
    }

    pub async fn alternate_airports(&self) -> CoreResult<Vec<AlternateAirportsRow>> {
        Ok(alternate_airports(&self.snapshot().await?))
    }
}
