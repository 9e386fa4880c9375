use aerotrack_core::{
    Airplane, AirplaneKey, AirplaneLocation, Airport, AirportCode, CoreError, CoreResult, EntityStore, FlightId,
    FlightStatus, Leg, LicenseType, Location, NetworkSnapshot, PassengerProfile, Person, PersonId, PersonRole,
    PilotProfile, Route, RouteId, SimClock, SimTime, StoreTx,
};
use aerotrack_ops::{FlightOps, OfferRequest, OpsRules};
use aerotrack_shared::FlightEvent;
use aerotrack_store::MemoryStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

fn code(raw: &str) -> AirportCode {
    AirportCode::parse(raw).unwrap()
}

fn at(hh: u32, mm: u32) -> SimTime {
    SimTime::new(
        chrono::NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(hh, mm, 0)
            .unwrap(),
    )
}

fn n100() -> AirplaneKey {
    AirplaneKey::new("AA", "N100")
}

fn fl(id: &str) -> FlightId {
    FlightId::new(id)
}

fn pid(id: &str) -> PersonId {
    PersonId::new(id)
}

fn airport(raw: &str, city: &str) -> Airport {
    Airport {
        code: code(raw),
        name: format!("{} airport", raw),
        city: city.into(),
        state: "XX".into(),
        country: "USA".into(),
    }
}

fn airplane(tail: &str, at_airport: &str, seats: u32) -> Airplane {
    Airplane {
        key: AirplaneKey::new("AA", tail),
        seat_capacity: seats,
        speed: 400,
        location: AirplaneLocation::Airport(code(at_airport)),
        plane_type: Some("Boeing".into()),
        model: None,
        maintenanced: false,
        neo: false,
    }
}

fn pilot(id: &str, at_airport: &str, licenses: &[&str]) -> Person {
    Person {
        id: pid(id),
        first_name: id.to_uppercase(),
        last_name: Some("Pilot".into()),
        location: Location::Airport(code(at_airport)),
        role: PersonRole::Pilot(PilotProfile {
            tax_id: format!("tax-{id}"),
            experience: 12,
            licenses: licenses.iter().map(|l| LicenseType::new(l)).collect(),
            commanding_flight: None,
        }),
    }
}

fn passenger(id: &str, at_airport: &str) -> Person {
    Person {
        id: pid(id),
        first_name: id.to_uppercase(),
        last_name: None,
        location: Location::Airport(code(at_airport)),
        role: PersonRole::Passenger(PassengerProfile { miles: 100, funds: 50 }),
    }
}

fn offer(id: &str, tail: Option<&str>, progress: u32) -> OfferRequest {
    OfferRequest {
        flight_id: fl(id),
        route_id: RouteId::new("R1"),
        support_airline: tail.map(|_| "AA".to_string()),
        support_tail: tail.map(String::from),
        progress,
        next_time: at(10, 0),
        cost: 500,
    }
}

/// ATL -> JFK -> BOS, one Boeing with a single seat at ATL, one licensed
/// pilot and two passengers waiting at ATL.
async fn network() -> FlightOps {
    network_on(Arc::new(MemoryStore::new())).await
}

async fn network_on(store: Arc<dyn EntityStore>) -> FlightOps {
    let ops = FlightOps::new(store, OpsRules::default());
    for (raw, city) in [("ATL", "Atlanta"), ("JFK", "New York"), ("BOS", "Boston")] {
        ops.add_airport(airport(raw, city)).await.unwrap();
    }
    ops.add_airplane(airplane("N100", "ATL", 1)).await.unwrap();
    ops.add_route(Route {
        id: RouteId::new("R1"),
        legs: vec![
            Leg { leg_id: "L1".into(), departure: code("ATL"), arrival: code("JFK"), distance: 760 },
            Leg { leg_id: "L2".into(), departure: code("JFK"), arrival: code("BOS"), distance: 190 },
        ],
    })
    .await
    .unwrap();
    ops.add_person(pilot("p1", "ATL", &["Boeing"])).await.unwrap();
    ops.add_person(passenger("p2", "ATL")).await.unwrap();
    ops.add_person(passenger("p3", "ATL")).await.unwrap();
    ops
}

async fn person(ops: &FlightOps, id: &str) -> Person {
    ops.snapshot()
        .await
        .unwrap()
        .people
        .into_iter()
        .find(|p| p.id == pid(id))
        .unwrap()
}

async fn flight_status(ops: &FlightOps, id: &str) -> FlightStatus {
    ops.snapshot().await.unwrap().flight(&fl(id)).unwrap().status
}

#[tokio::test]
async fn test_flight_lifecycle_end_to_end() {
    let ops = network().await;

    // Offer at the route origin
    let flight = ops.offer_flight(offer("FL1", Some("N100"), 0)).await.unwrap();
    assert_eq!(flight.status, FlightStatus::OnGround);

    // No pilot yet
    let err = ops.flight_takeoff(&fl("FL1"), at(10, 0)).await.unwrap_err();
    assert_eq!(err, CoreError::Precondition("no commanding pilot".into()));

    // Single seat: lowest id boards, the other waits
    ops.assign_pilot(&pid("p1"), Some(&fl("FL1"))).await.unwrap();
    let outcome = ops.passengers_board(&fl("FL1")).await.unwrap();
    assert_eq!(outcome.boarded, vec![pid("p2")]);
    assert_eq!(outcome.left_behind, vec![pid("p3")]);
    assert_eq!(person(&ops, "p3").await.location, Location::Airport(code("ATL")));

    let flight = ops.flight_takeoff(&fl("FL1"), at(10, 0)).await.unwrap();
    assert_eq!(flight.status, FlightStatus::InAir);
    assert_eq!(flight.next_time, at(11, 54));
    assert!(person(&ops, "p1").await.location.is_aboard(&n100()));

    // First tick is too early, the second lands it
    let mut clock = SimClock::new(at(10, 0), chrono::Duration::minutes(60));
    let report = ops.simulation_cycle(&mut clock).await.unwrap();
    assert!(report.landed.is_empty());
    let report = ops.simulation_cycle(&mut clock).await.unwrap();
    assert_eq!(report.now, at(12, 0));
    assert_eq!(report.landed, vec![fl("FL1")]);

    let snapshot = ops.snapshot().await.unwrap();
    let landed = snapshot.flight(&fl("FL1")).unwrap();
    assert_eq!(landed.status, FlightStatus::OnGround);
    assert_eq!(landed.progress, 1);
    assert_eq!(landed.next_time, at(13, 0));
    assert_eq!(snapshot.airplane(&n100()).unwrap().parked_at(), Some(&code("JFK")));
    assert!(person(&ops, "p2").await.location.is_aboard(&n100()));

    // Retire guard
    let err = ops.retire_flight(&fl("FL1")).await.unwrap_err();
    assert!(matches!(err, CoreError::Precondition(_)));
    assert_eq!(flight_status(&ops, "FL1").await, FlightStatus::OnGround);

    let moved = ops.passengers_disembark(&fl("FL1")).await.unwrap();
    assert_eq!(moved, vec![pid("p1"), pid("p2")]);
    let p1 = person(&ops, "p1").await;
    assert_eq!(p1.location, Location::Airport(code("JFK")));
    assert_eq!(p1.commanding_flight(), Some(&fl("FL1")));

    let retired = ops.retire_flight(&fl("FL1")).await.unwrap();
    assert_eq!(retired.status, FlightStatus::Retired);
    assert!(person(&ops, "p1").await.commanding_flight().is_none());

    // The airplane is free again
    ops.offer_flight(offer("FL2", Some("N100"), 1)).await.unwrap();
}

#[tokio::test]
async fn test_offer_rejections() {
    let ops = network().await;
    ops.offer_flight(offer("FL1", Some("N100"), 0)).await.unwrap();

    let err = ops.offer_flight(offer("FL1", None, 0)).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    let err = ops.offer_flight(offer("FL2", Some("N100"), 0)).await.unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));

    let err = ops.offer_flight(offer("FL3", Some("N999"), 0)).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    let mut unknown_route = offer("FL4", None, 0);
    unknown_route.route_id = RouteId::new("R9");
    assert!(matches!(ops.offer_flight(unknown_route).await, Err(CoreError::Validation(_))));

    ops.add_airplane(airplane("N200", "BOS", 4)).await.unwrap();
    let err = ops.offer_flight(offer("FL5", Some("N200"), 0)).await.unwrap_err();
    assert!(matches!(err, CoreError::InconsistentState(_)));

    // Nothing was written by the failures
    assert_eq!(ops.flights().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_boarding_capacity_never_exceeded() {
    let ops = network().await;
    ops.offer_flight(offer("FL1", Some("N100"), 0)).await.unwrap();

    ops.passengers_board(&fl("FL1")).await.unwrap();
    let err = ops.passengers_board(&fl("FL1")).await.unwrap_err();
    assert!(matches!(err, CoreError::Capacity(_)));

    let aboard = ops.boarded_passengers(&fl("FL1")).await.unwrap();
    assert_eq!(aboard.len(), 1);
    assert_eq!(person(&ops, "p3").await.location, Location::Airport(code("ATL")));
}

#[tokio::test]
async fn test_toggle_license_is_an_involution() {
    let ops = network().await;
    let before = ops.licenses_of(&pid("p1")).await.unwrap();

    let granted = ops.toggle_license(&pid("p1"), "airbus").await.unwrap();
    assert!(granted.pilot().unwrap().licenses.contains(&LicenseType::new("Airbus")));
    ops.toggle_license(&pid("p1"), "Airbus").await.unwrap();
    assert_eq!(ops.licenses_of(&pid("p1")).await.unwrap(), before);

    let err = ops.toggle_license(&pid("p2"), "Boeing").await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
    let err = ops.toggle_license(&pid("nobody"), "Boeing").await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test]
async fn test_assign_pilot_rules() {
    let ops = network().await;
    ops.offer_flight(offer("FL1", Some("N100"), 0)).await.unwrap();

    let err = ops.assign_pilot(&pid("ghost"), Some(&fl("FL1"))).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));

    let err = ops.assign_pilot(&pid("p2"), Some(&fl("FL1"))).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    let err = ops.assign_pilot(&pid("p1"), Some(&fl("FL9"))).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    // Pilot waiting at the wrong airport
    ops.add_person(pilot("p4", "BOS", &["Boeing"])).await.unwrap();
    let err = ops.assign_pilot(&pid("p4"), Some(&fl("FL1"))).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    // Cockpit holds two
    ops.add_person(pilot("p5", "ATL", &["general"])).await.unwrap();
    ops.add_person(pilot("p6", "ATL", &["general"])).await.unwrap();
    ops.assign_pilot(&pid("p1"), Some(&fl("FL1"))).await.unwrap();
    ops.assign_pilot(&pid("p5"), Some(&fl("FL1"))).await.unwrap();
    let err = ops.assign_pilot(&pid("p6"), Some(&fl("FL1"))).await.unwrap_err();
    assert!(err.to_string().contains("full"));

    // Clearing always works
    let cleared = ops.assign_pilot(&pid("p5"), None).await.unwrap();
    assert!(cleared.commanding_flight().is_none());
    ops.assign_pilot(&pid("p6"), None).await.unwrap();
}

#[tokio::test]
async fn test_pilot_in_the_air_cannot_switch_flights() {
    let ops = network().await;
    ops.add_airplane(airplane("N200", "ATL", 2)).await.unwrap();
    ops.add_route(Route {
        id: RouteId::new("R2"),
        legs: vec![Leg { leg_id: "L3".into(), departure: code("ATL"), arrival: code("BOS"), distance: 400 }],
    })
    .await
    .unwrap();
    ops.offer_flight(offer("FL1", Some("N100"), 0)).await.unwrap();
    let mut second = offer("FL2", Some("N200"), 0);
    second.route_id = RouteId::new("R2");
    ops.offer_flight(second).await.unwrap();

    ops.assign_pilot(&pid("p1"), Some(&fl("FL1"))).await.unwrap();
    ops.flight_takeoff(&fl("FL1"), at(10, 0)).await.unwrap();

    let err = ops.assign_pilot(&pid("p1"), Some(&fl("FL2"))).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    // Clearing mid-air keeps the pilot aboard
    let cleared = ops.assign_pilot(&pid("p1"), None).await.unwrap();
    assert!(cleared.location.is_aboard(&n100()));
}

#[tokio::test]
async fn test_recycle_crew_after_landing() {
    let ops = network().await;
    ops.offer_flight(offer("FL1", Some("N100"), 0)).await.unwrap();
    ops.assign_pilot(&pid("p1"), Some(&fl("FL1"))).await.unwrap();
    ops.flight_takeoff(&fl("FL1"), at(10, 0)).await.unwrap();

    let err = ops.recycle_crew(&fl("FL1")).await.unwrap_err();
    assert!(matches!(err, CoreError::Precondition(_)));

    ops.flight_landing(&fl("FL1"), at(12, 0)).await.unwrap();
    let released = ops.recycle_crew(&fl("FL1")).await.unwrap();
    assert_eq!(released, vec![pid("p1")]);

    let p1 = person(&ops, "p1").await;
    assert_eq!(p1.location, Location::Airport(code("JFK")));
    assert!(p1.commanding_flight().is_none());

    assert!(matches!(ops.recycle_crew(&fl("FL9")).await, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn test_invalid_edges_leave_state_unchanged() {
    let ops = network().await;
    ops.offer_flight(offer("FL1", Some("N100"), 0)).await.unwrap();

    let err = ops.flight_landing(&fl("FL1"), at(11, 0)).await.unwrap_err();
    assert!(matches!(err, CoreError::Precondition(_)));

    ops.assign_pilot(&pid("p1"), Some(&fl("FL1"))).await.unwrap();
    ops.flight_takeoff(&fl("FL1"), at(10, 0)).await.unwrap();
    assert!(matches!(ops.flight_takeoff(&fl("FL1"), at(10, 5)).await, Err(CoreError::Precondition(_))));
    assert!(matches!(ops.retire_flight(&fl("FL1")).await, Err(CoreError::Precondition(_))));
    assert!(matches!(ops.passengers_disembark(&fl("FL1")).await, Err(CoreError::Precondition(_))));
    assert_eq!(flight_status(&ops, "FL1").await, FlightStatus::InAir);

    assert!(matches!(ops.flight_takeoff(&fl("FL9"), at(10, 0)).await, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn test_cycle_lands_each_due_flight_once_in_id_order() {
    let ops = network().await;
    ops.add_airplane(airplane("N200", "ATL", 2)).await.unwrap();
    ops.add_person(pilot("p4", "ATL", &["Boeing"])).await.unwrap();
    ops.offer_flight(offer("FL2", Some("N100"), 0)).await.unwrap();
    ops.offer_flight(offer("FL1", Some("N200"), 0)).await.unwrap();
    ops.assign_pilot(&pid("p1"), Some(&fl("FL2"))).await.unwrap();
    ops.assign_pilot(&pid("p4"), Some(&fl("FL1"))).await.unwrap();
    ops.flight_takeoff(&fl("FL2"), at(10, 0)).await.unwrap();
    ops.flight_takeoff(&fl("FL1"), at(10, 0)).await.unwrap();

    // Far in the future: both due, but each lands only once per cycle
    let mut clock = SimClock::new(at(20, 0), chrono::Duration::minutes(1));
    let report = ops.simulation_cycle(&mut clock).await.unwrap();
    assert_eq!(report.landed, vec![fl("FL1"), fl("FL2")]);
    assert!(report.failed.is_empty());

    let snapshot = ops.snapshot().await.unwrap();
    assert!(snapshot.flights.iter().all(|f| f.progress == 1 && f.status == FlightStatus::OnGround));

    // Grounded flights are left for an explicit takeoff
    let report = ops.simulation_cycle(&mut clock).await.unwrap();
    assert!(report.landed.is_empty());
    assert_eq!(clock.cycles(), 2);

    assert_eq!(ops.land_if_due(&fl("FL1"), clock.now()).await.unwrap(), None);
}

#[tokio::test]
async fn test_events_follow_commits() {
    let ops = network().await;
    let mut events = ops.subscribe();

    ops.offer_flight(offer("FL1", Some("N100"), 0)).await.unwrap();
    assert!(ops.flight_takeoff(&fl("FL1"), at(10, 0)).await.is_err());
    ops.retire_flight(&fl("FL1")).await.unwrap();

    let first = events.recv().await.unwrap();
    assert!(matches!(first.event, FlightEvent::Offered { .. }));
    let second = events.recv().await.unwrap();
    assert_eq!(second.event, FlightEvent::Retired { flight_id: "FL1".into() });
}

/// Store whose transactions never open.
struct StalledStore;

#[async_trait]
impl EntityStore for StalledStore {
    async fn begin(&self) -> CoreResult<Box<dyn StoreTx>> {
        std::future::pending().await
    }

    async fn snapshot(&self) -> CoreResult<NetworkSnapshot> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_slow_store_surfaces_transient_error() {
    let rules = OpsRules {
        store_timeout: Duration::from_millis(50),
        ..OpsRules::default()
    };
    let ops = FlightOps::new(Arc::new(StalledStore), rules);

    let err = ops.retire_flight(&fl("FL1")).await.unwrap_err();
    assert!(err.is_retryable());

    let mut clock = SimClock::new(at(10, 0), chrono::Duration::minutes(30));
    assert!(ops.simulation_cycle(&mut clock).await.is_err());
    assert_eq!(clock.now(), at(10, 0));
}

#[tokio::test]
async fn test_concurrent_commands_on_one_flight_stay_consistent() {
    let ops = Arc::new(network().await);
    ops.offer_flight(offer("FL1", Some("N100"), 0)).await.unwrap();

    let board = {
        let ops = ops.clone();
        tokio::spawn(async move { ops.passengers_board(&fl("FL1")).await })
    };
    let retire = {
        let ops = ops.clone();
        tokio::spawn(async move { ops.retire_flight(&fl("FL1")).await })
    };
    let boarded = board.await.unwrap();
    let retired = retire.await.unwrap();

    // Either the flight retired empty, or it boarded and refused to retire
    let snapshot = ops.snapshot().await.unwrap();
    let aboard = snapshot.people_at(&Location::Airplane(n100())).count();
    match (boarded, retired) {
        (Ok(_), Err(_)) => assert_eq!(aboard, 1),
        (Err(_), Ok(_)) => assert_eq!(aboard, 0),
        other => panic!("unexpected outcome {:?}", other),
    }
}

/// Memory store whose transactions refuse to save one chosen flight.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    failing: std::sync::Mutex<Option<FlightId>>,
}

impl FlakyStore {
    fn fail_saves_of(&self, flight: Option<FlightId>) {
        *self.failing.lock().unwrap() = flight;
    }
}

#[async_trait]
impl EntityStore for FlakyStore {
    async fn begin(&self) -> CoreResult<Box<dyn StoreTx>> {
        let failing = self.failing.lock().unwrap().clone();
        Ok(Box::new(FlakyTx {
            inner: self.inner.begin().await?,
            failing,
        }))
    }

    async fn snapshot(&self) -> CoreResult<NetworkSnapshot> {
        self.inner.snapshot().await
    }
}

struct FlakyTx {
    inner: Box<dyn StoreTx>,
    failing: Option<FlightId>,
}

#[async_trait]
impl StoreTx for FlakyTx {
    async fn airport(&mut self, code: &AirportCode) -> CoreResult<Option<Airport>> {
        self.inner.airport(code).await
    }

    async fn airplane(&mut self, key: &AirplaneKey) -> CoreResult<Option<Airplane>> {
        self.inner.airplane(key).await
    }

    async fn person(&mut self, id: &PersonId) -> CoreResult<Option<Person>> {
        self.inner.person(id).await
    }

    async fn route(&mut self, id: &RouteId) -> CoreResult<Option<Route>> {
        self.inner.route(id).await
    }

    async fn flight(&mut self, id: &FlightId) -> CoreResult<Option<aerotrack_core::Flight>> {
        self.inner.flight(id).await
    }

    async fn people_at(&mut self, location: &Location) -> CoreResult<Vec<Person>> {
        self.inner.people_at(location).await
    }

    async fn crew_of(&mut self, flight: &FlightId) -> CoreResult<Vec<Person>> {
        self.inner.crew_of(flight).await
    }

    async fn active_flight_for(&mut self, key: &AirplaneKey) -> CoreResult<Option<aerotrack_core::Flight>> {
        self.inner.active_flight_for(key).await
    }

    async fn insert_airport(&mut self, airport: &Airport) -> CoreResult<()> {
        self.inner.insert_airport(airport).await
    }

    async fn insert_airplane(&mut self, airplane: &Airplane) -> CoreResult<()> {
        self.inner.insert_airplane(airplane).await
    }

    async fn insert_person(&mut self, person: &Person) -> CoreResult<()> {
        self.inner.insert_person(person).await
    }

    async fn insert_route(&mut self, route: &Route) -> CoreResult<()> {
        self.inner.insert_route(route).await
    }

    async fn insert_flight(&mut self, flight: &aerotrack_core::Flight) -> CoreResult<()> {
        self.inner.insert_flight(flight).await
    }

    async fn save_airplane(&mut self, airplane: &Airplane) -> CoreResult<()> {
        self.inner.save_airplane(airplane).await
    }

    async fn save_person(&mut self, person: &Person) -> CoreResult<()> {
        self.inner.save_person(person).await
    }

    async fn save_flight(&mut self, flight: &aerotrack_core::Flight) -> CoreResult<()> {
        if self.failing.as_ref() == Some(&flight.id) {
            return Err(CoreError::Transient(format!("could not serialize write of {}", flight.id)));
        }
        self.inner.save_flight(flight).await
    }

    async fn commit(self: Box<Self>) -> CoreResult<()> {
        self.inner.commit().await
    }
}

#[tokio::test]
async fn test_cycle_reports_failed_landing_and_retries_it_next_cycle() {
    let store = Arc::new(FlakyStore::default());
    let ops = network_on(store.clone()).await;
    ops.add_airplane(airplane("N200", "ATL", 2)).await.unwrap();
    ops.add_person(pilot("p4", "ATL", &["Boeing"])).await.unwrap();
    ops.offer_flight(offer("FL1", Some("N100"), 0)).await.unwrap();
    ops.offer_flight(offer("FL2", Some("N200"), 0)).await.unwrap();
    ops.assign_pilot(&pid("p1"), Some(&fl("FL1"))).await.unwrap();
    ops.assign_pilot(&pid("p4"), Some(&fl("FL2"))).await.unwrap();
    ops.flight_takeoff(&fl("FL1"), at(10, 0)).await.unwrap();
    ops.flight_takeoff(&fl("FL2"), at(10, 0)).await.unwrap();

    store.fail_saves_of(Some(fl("FL1")));
    let mut clock = SimClock::new(at(20, 0), chrono::Duration::minutes(1));
    let report = ops.simulation_cycle(&mut clock).await.unwrap();
    assert_eq!(report.landed, vec![fl("FL2")]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].flight_id, fl("FL1"));
    assert!(report.failed[0].retryable);

    // The failed landing rolled back completely
    let snapshot = ops.snapshot().await.unwrap();
    assert_eq!(snapshot.flight(&fl("FL1")).unwrap().status, FlightStatus::InAir);
    assert_eq!(snapshot.flight(&fl("FL1")).unwrap().progress, 0);
    assert_eq!(snapshot.airplane(&n100()).unwrap().location, AirplaneLocation::Airborne);
    assert_eq!(snapshot.flight(&fl("FL2")).unwrap().status, FlightStatus::OnGround);

    store.fail_saves_of(None);
    let report = ops.simulation_cycle(&mut clock).await.unwrap();
    assert_eq!(report.landed, vec![fl("FL1")]);
    assert!(report.failed.is_empty());
    assert_eq!(flight_status(&ops, "FL1").await, FlightStatus::OnGround);
}

#[tokio::test]
async fn test_takeoff_past_calendar_end_is_rejected() {
    let ops = network().await;
    ops.add_airport(airport("SEA", "Seattle")).await.unwrap();
    let mut slow = airplane("N900", "ATL", 4);
    slow.speed = 1;
    ops.add_airplane(slow).await.unwrap();
    ops.add_route(Route {
        id: RouteId::new("R9"),
        legs: vec![Leg { leg_id: "L9".into(), departure: code("ATL"), arrival: code("SEA"), distance: u32::MAX }],
    })
    .await
    .unwrap();
    let mut request = offer("FL9", Some("N900"), 0);
    request.route_id = RouteId::new("R9");
    ops.offer_flight(request).await.unwrap();
    ops.assign_pilot(&pid("p1"), Some(&fl("FL9"))).await.unwrap();

    let err = ops.flight_takeoff(&fl("FL9"), at(10, 0)).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    assert_eq!(flight_status(&ops, "FL9").await, FlightStatus::OnGround);
    assert_eq!(person(&ops, "p1").await.location, Location::Airport(code("ATL")));
}
