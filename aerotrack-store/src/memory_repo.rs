use aerotrack_core::repository::{EntityStore, NetworkSnapshot, StoreTx};
use aerotrack_core::{
    Airplane, AirplaneKey, AirplaneLocation, Airport, AirportCode, CoreError, CoreResult, Flight, FlightId,
    Location, Person, PersonId, Route, RouteId,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

#[derive(Debug, Clone, Default)]
struct NetworkState {
    airports: BTreeMap<AirportCode, Airport>,
    airplanes: BTreeMap<AirplaneKey, Airplane>,
    people: BTreeMap<PersonId, Person>,
    routes: BTreeMap<RouteId, Route>,
    flights: BTreeMap<FlightId, Flight>,
}

impl NetworkState {
    fn require_airport(&self, code: &AirportCode) -> CoreResult<()> {
        if self.airports.contains_key(code) {
            Ok(())
        } else {
            Err(CoreError::Validation(format!("unknown airport {}", code)))
        }
    }

    fn require_airplane(&self, key: &AirplaneKey) -> CoreResult<()> {
        if self.airplanes.contains_key(key) {
            Ok(())
        } else {
            Err(CoreError::Validation(format!("unknown airplane {}", key)))
        }
    }

    fn check_airplane(&self, airplane: &Airplane) -> CoreResult<()> {
        match &airplane.location {
            AirplaneLocation::Airport(code) => self.require_airport(code),
            AirplaneLocation::Airborne => Ok(()),
        }
    }

    fn check_person(&self, person: &Person) -> CoreResult<()> {
        match &person.location {
            Location::Airport(code) => self.require_airport(code)?,
            Location::Airplane(key) => self.require_airplane(key)?,
        }
        if let Some(flight) = person.commanding_flight() {
            if !self.flights.contains_key(flight) {
                return Err(CoreError::Validation(format!("unknown flight {}", flight)));
            }
        }
        Ok(())
    }

    fn check_route(&self, route: &Route) -> CoreResult<()> {
        for leg in &route.legs {
            self.require_airport(&leg.departure)?;
            self.require_airport(&leg.arrival)?;
        }
        Ok(())
    }

    fn check_flight(&self, flight: &Flight) -> CoreResult<()> {
        if !self.routes.contains_key(&flight.route_id) {
            return Err(CoreError::Validation(format!("unknown route {}", flight.route_id)));
        }
        if let Some(key) = &flight.airplane {
            self.require_airplane(key)?;
            let taken = self.flights.values().any(|other| {
                other.id != flight.id && other.is_active() && other.airplane.as_ref() == Some(key)
            });
            if flight.is_active() && taken {
                return Err(CoreError::Conflict(format!("airplane {} already supports an active flight", key)));
            }
        }
        Ok(())
    }

    fn snapshot(&self) -> NetworkSnapshot {
        NetworkSnapshot {
            airports: self.airports.values().cloned().collect(),
            airplanes: self.airplanes.values().cloned().collect(),
            people: self.people.values().cloned().collect(),
            routes: self.routes.values().cloned().collect(),
            flights: self.flights.values().cloned().collect(),
        }
    }
}

/// In-process store. A transaction owns the write lock and works on a copy,
/// which replaces the shared state on commit.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<NetworkState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn begin(&self) -> CoreResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().write_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn snapshot(&self) -> CoreResult<NetworkSnapshot> {
        Ok(self.state.read().await.snapshot())
    }
}

struct MemoryTx {
    guard: OwnedRwLockWriteGuard<NetworkState>,
    working: NetworkState,
}

fn duplicate(kind: &str, id: impl std::fmt::Display) -> CoreError {
    CoreError::Validation(format!("{} {} already exists", kind, id))
}

fn missing(kind: &str, id: impl std::fmt::Display) -> CoreError {
    CoreError::NotFound(format!("{} {}", kind, id))
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn airport(&mut self, code: &AirportCode) -> CoreResult<Option<Airport>> {
        Ok(self.working.airports.get(code).cloned())
    }

    async fn airplane(&mut self, key: &AirplaneKey) -> CoreResult<Option<Airplane>> {
        Ok(self.working.airplanes.get(key).cloned())
    }

    async fn person(&mut self, id: &PersonId) -> CoreResult<Option<Person>> {
        Ok(self.working.people.get(id).cloned())
    }

    async fn route(&mut self, id: &RouteId) -> CoreResult<Option<Route>> {
        Ok(self.working.routes.get(id).cloned())
    }

    async fn flight(&mut self, id: &FlightId) -> CoreResult<Option<Flight>> {
        Ok(self.working.flights.get(id).cloned())
    }

    async fn people_at(&mut self, location: &Location) -> CoreResult<Vec<Person>> {
        Ok(self
            .working
            .people
            .values()
            .filter(|p| &p.location == location)
            .cloned()
            .collect())
    }

    async fn crew_of(&mut self, flight: &FlightId) -> CoreResult<Vec<Person>> {
        Ok(self
            .working
            .people
            .values()
            .filter(|p| p.commanding_flight() == Some(flight))
            .cloned()
            .collect())
    }

    async fn active_flight_for(&mut self, key: &AirplaneKey) -> CoreResult<Option<Flight>> {
        Ok(self
            .working
            .flights
            .values()
            .find(|f| f.is_active() && f.airplane.as_ref() == Some(key))
            .cloned())
    }

    async fn insert_airport(&mut self, airport: &Airport) -> CoreResult<()> {
        if self.working.airports.contains_key(&airport.code) {
            return Err(duplicate("airport", &airport.code));
        }
        self.working.airports.insert(airport.code.clone(), airport.clone());
        Ok(())
    }

    async fn insert_airplane(&mut self, airplane: &Airplane) -> CoreResult<()> {
        if self.working.airplanes.contains_key(&airplane.key) {
            return Err(duplicate("airplane", &airplane.key));
        }
        self.working.check_airplane(airplane)?;
        self.working.airplanes.insert(airplane.key.clone(), airplane.clone());
        Ok(())
    }

    async fn insert_person(&mut self, person: &Person) -> CoreResult<()> {
        if self.working.people.contains_key(&person.id) {
            return Err(duplicate("person", &person.id));
        }
        self.working.check_person(person)?;
        self.working.people.insert(person.id.clone(), person.clone());
        Ok(())
    }

    async fn insert_route(&mut self, route: &Route) -> CoreResult<()> {
        if self.working.routes.contains_key(&route.id) {
            return Err(duplicate("route", &route.id));
        }
        self.working.check_route(route)?;
        self.working.routes.insert(route.id.clone(), route.clone());
        Ok(())
    }

    async fn insert_flight(&mut self, flight: &Flight) -> CoreResult<()> {
        if self.working.flights.contains_key(&flight.id) {
            return Err(duplicate("flight", &flight.id));
        }
        self.working.check_flight(flight)?;
        self.working.flights.insert(flight.id.clone(), flight.clone());
        Ok(())
    }

    async fn save_airplane(&mut self, airplane: &Airplane) -> CoreResult<()> {
        if !self.working.airplanes.contains_key(&airplane.key) {
            return Err(missing("airplane", &airplane.key));
        }
        self.working.check_airplane(airplane)?;
        self.working.airplanes.insert(airplane.key.clone(), airplane.clone());
        Ok(())
    }

    async fn save_person(&mut self, person: &Person) -> CoreResult<()> {
        if !self.working.people.contains_key(&person.id) {
            return Err(missing("person", &person.id));
        }
        self.working.check_person(person)?;
        self.working.people.insert(person.id.clone(), person.clone());
        Ok(())
    }

    async fn save_flight(&mut self, flight: &Flight) -> CoreResult<()> {
        if !self.working.flights.contains_key(&flight.id) {
            return Err(missing("flight", &flight.id));
        }
        self.working.check_flight(flight)?;
        self.working.flights.insert(flight.id.clone(), flight.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> CoreResult<()> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
