use async_trait::async_trait;
use serde::Serialize;

use crate::iata::AirportCode;
use crate::location::Location;
use crate::models::{Airplane, AirplaneKey, Airport, Flight, FlightId, Person, PersonId, Route, RouteId};
use crate::CoreResult;

/// Persistence interface for the airline network.
///
/// The store enforces referential integrity only. Business rules live in the
/// command layer above it.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Open a transactional scope. Dropping it without [`StoreTx::commit`]
    /// discards every write made through it.
    async fn begin(&self) -> CoreResult<Box<dyn StoreTx>>;

    /// Consistent point-in-time copy of every table.
    async fn snapshot(&self) -> CoreResult<NetworkSnapshot>;
}

/// One unit of work against the store.
#[async_trait]
pub trait StoreTx: Send {
    async fn airport(&mut self, code: &AirportCode) -> CoreResult<Option<Airport>>;

    async fn airplane(&mut self, key: &AirplaneKey) -> CoreResult<Option<Airplane>>;

    async fn person(&mut self, id: &PersonId) -> CoreResult<Option<Person>>;

    async fn route(&mut self, id: &RouteId) -> CoreResult<Option<Route>>;

    async fn flight(&mut self, id: &FlightId) -> CoreResult<Option<Flight>>;

    /// Everyone at `location`, ascending person id.
    async fn people_at(&mut self, location: &Location) -> CoreResult<Vec<Person>>;

    /// Pilots whose `commanding_flight` is `flight`, ascending person id.
    async fn crew_of(&mut self, flight: &FlightId) -> CoreResult<Vec<Person>>;

    /// The non-retired flight supported by the airplane, if any.
    async fn active_flight_for(&mut self, key: &AirplaneKey) -> CoreResult<Option<Flight>>;

    async fn insert_airport(&mut self, airport: &Airport) -> CoreResult<()>;

    async fn insert_airplane(&mut self, airplane: &Airplane) -> CoreResult<()>;

    async fn insert_person(&mut self, person: &Person) -> CoreResult<()>;

    async fn insert_route(&mut self, route: &Route) -> CoreResult<()>;

    async fn insert_flight(&mut self, flight: &Flight) -> CoreResult<()>;

    async fn save_airplane(&mut self, airplane: &Airplane) -> CoreResult<()>;

    async fn save_person(&mut self, person: &Person) -> CoreResult<()>;

    async fn save_flight(&mut self, flight: &Flight) -> CoreResult<()>;

    async fn commit(self: Box<Self>) -> CoreResult<()>;
}

/// Read-only copy of the whole network, each list sorted by key.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkSnapshot {
    pub airports: Vec<Airport>,
    pub airplanes: Vec<Airplane>,
    pub people: Vec<Person>,
    pub routes: Vec<Route>,
    pub flights: Vec<Flight>,
}

impl NetworkSnapshot {
    pub fn airport(&self, code: &AirportCode) -> Option<&Airport> {
        self.airports.iter().find(|a| &a.code == code)
    }

    pub fn airplane(&self, key: &AirplaneKey) -> Option<&Airplane> {
        self.airplanes.iter().find(|a| &a.key == key)
    }

    pub fn route(&self, id: &RouteId) -> Option<&Route> {
        self.routes.iter().find(|r| &r.id == id)
    }

    pub fn flight(&self, id: &FlightId) -> Option<&Flight> {
        self.flights.iter().find(|f| &f.id == id)
    }

    /// Active flight an airplane is currently performing.
    pub fn flight_for(&self, key: &AirplaneKey) -> Option<&Flight> {
        self.flights
            .iter()
            .find(|f| f.is_active() && f.airplane.as_ref() == Some(key))
    }

    pub fn people_at<'a>(&'a self, location: &'a Location) -> impl Iterator<Item = &'a Person> + 'a {
        self.people.iter().filter(move |p| &p.location == location)
    }
}
