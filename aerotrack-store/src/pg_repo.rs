use aerotrack_core::repository::{EntityStore, NetworkSnapshot, StoreTx};
use aerotrack_core::{
    Airplane, AirplaneKey, AirplaneLocation, Airport, AirportCode, CoreError, CoreResult, Flight, FlightId,
    FlightStatus, Leg, LicenseType, Location, PassengerProfile, Person, PersonId, PersonRole, PilotProfile,
    Route, RouteId, SimTime,
};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::postgres::PgConnection;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::warn;

const UNIQUE_ACTIVE_FLIGHT: &str = "flights_one_active_per_airplane";

/// Map driver errors onto the core taxonomy.
pub fn db_err(err: sqlx::Error) -> CoreError {
    match &err {
        sqlx::Error::Database(db) => {
            let code = db.code().map(|c| c.into_owned()).unwrap_or_default();
            match code.as_str() {
                "40001" | "40P01" => {
                    warn!("Serialization failure: {}", db.message());
                    CoreError::Transient(db.message().to_string())
                }
                "23505" if db.constraint() == Some(UNIQUE_ACTIVE_FLIGHT) => {
                    CoreError::Conflict("airplane already supports an active flight".into())
                }
                "23505" | "23503" | "23514" | "23502" => CoreError::Validation(db.message().to_string()),
                _ => CoreError::Internal(err.to_string()),
            }
        }
        sqlx::Error::RowNotFound => CoreError::NotFound("row not found".into()),
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed => {
            warn!("Database unavailable: {}", err);
            CoreError::Transient(err.to_string())
        }
        _ => CoreError::Internal(err.to_string()),
    }
}

fn to_db(value: u32, field: &str) -> CoreResult<i32> {
    i32::try_from(value).map_err(|_| CoreError::Validation(format!("{} out of range: {}", field, value)))
}

fn from_db(value: i32, field: &str) -> CoreResult<u32> {
    u32::try_from(value).map_err(|_| CoreError::Internal(format!("negative {} in storage: {}", field, value)))
}

fn stored_code(raw: &str) -> CoreResult<AirportCode> {
    AirportCode::parse(raw).map_err(|e| CoreError::Internal(format!("stored airport code: {}", e)))
}

// ============================================================================
// Row types
// ============================================================================

#[derive(sqlx::FromRow)]
struct AirportRow {
    code: String,
    name: String,
    city: String,
    state: String,
    country: String,
}

impl AirportRow {
    fn into_domain(self) -> CoreResult<Airport> {
        Ok(Airport {
            code: stored_code(&self.code)?,
            name: self.name,
            city: self.city,
            state: self.state,
            country: self.country,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AirplaneRow {
    airline_id: String,
    tail_num: String,
    seat_capacity: i32,
    speed: i32,
    location_airport: Option<String>,
    plane_type: Option<String>,
    model: Option<String>,
    maintenanced: bool,
    neo: bool,
}

impl AirplaneRow {
    fn into_domain(self) -> CoreResult<Airplane> {
        let location = match self.location_airport {
            Some(code) => AirplaneLocation::Airport(stored_code(&code)?),
            None => AirplaneLocation::Airborne,
        };
        Ok(Airplane {
            key: AirplaneKey::new(self.airline_id, self.tail_num),
            seat_capacity: from_db(self.seat_capacity, "seat_capacity")?,
            speed: from_db(self.speed, "speed")?,
            location,
            plane_type: self.plane_type,
            model: self.model,
            maintenanced: self.maintenanced,
            neo: self.neo,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PersonRow {
    person_id: String,
    first_name: String,
    last_name: Option<String>,
    location_airport: Option<String>,
    location_airline: Option<String>,
    location_tail: Option<String>,
    tax_id: Option<String>,
    experience: Option<i32>,
    commanding_flight: Option<String>,
    licenses: Vec<String>,
    miles: Option<i32>,
    funds: Option<i32>,
}

impl PersonRow {
    fn into_domain(self) -> CoreResult<Person> {
        let location = match (self.location_airport, self.location_airline, self.location_tail) {
            (Some(code), None, None) => Location::Airport(stored_code(&code)?),
            (None, Some(airline), Some(tail)) => Location::Airplane(AirplaneKey::new(airline, tail)),
            _ => {
                return Err(CoreError::Internal(format!("person {} has no single location", self.person_id)));
            }
        };

        let role = match (self.tax_id, self.miles) {
            (Some(tax_id), _) => PersonRole::Pilot(PilotProfile {
                tax_id,
                experience: from_db(self.experience.unwrap_or(0), "experience")?,
                licenses: self.licenses.iter().map(|l| LicenseType::new(l)).collect(),
                commanding_flight: self.commanding_flight.map(FlightId::new),
            }),
            (None, Some(miles)) => PersonRole::Passenger(PassengerProfile {
                miles: from_db(miles, "miles")?,
                funds: from_db(self.funds.unwrap_or(0), "funds")?,
            }),
            (None, None) => {
                return Err(CoreError::Internal(format!("person {} has no role", self.person_id)));
            }
        };

        Ok(Person {
            id: PersonId::new(self.person_id),
            first_name: self.first_name,
            last_name: self.last_name,
            location,
            role,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RouteLegRow {
    route_id: String,
    leg_id: String,
    departure: String,
    arrival: String,
    distance: i32,
}

#[derive(sqlx::FromRow)]
struct FlightRow {
    flight_id: String,
    route_id: String,
    progress: i32,
    next_time: NaiveDateTime,
    cost: i32,
    status: String,
    support_airline: Option<String>,
    support_tail: Option<String>,
}

impl FlightRow {
    fn into_domain(self) -> CoreResult<Flight> {
        let airplane = match (self.support_airline, self.support_tail) {
            (Some(airline), Some(tail)) => Some(AirplaneKey::new(airline, tail)),
            _ => None,
        };
        Ok(Flight {
            id: FlightId::new(self.flight_id),
            route_id: RouteId::new(self.route_id),
            progress: from_db(self.progress, "progress")?,
            next_time: SimTime::new(self.next_time),
            cost: from_db(self.cost, "cost")?,
            status: FlightStatus::parse(&self.status)?,
            airplane,
        })
    }
}

/// Group leg rows (ordered by route, then sequence) into routes.
fn assemble_routes(rows: Vec<RouteLegRow>) -> CoreResult<Vec<Route>> {
    let mut routes: Vec<Route> = Vec::new();
    for row in rows {
        let leg = Leg {
            leg_id: row.leg_id,
            departure: stored_code(&row.departure)?,
            arrival: stored_code(&row.arrival)?,
            distance: from_db(row.distance, "distance")?,
        };
        match routes.last_mut() {
            Some(route) if route.id.as_str() == row.route_id => route.legs.push(leg),
            _ => routes.push(Route {
                id: RouteId::new(row.route_id),
                legs: vec![leg],
            }),
        }
    }
    Ok(routes)
}

// ============================================================================
// Queries
// ============================================================================

const AIRPLANE_SELECT: &str = r#"
    SELECT airline_id, tail_num, seat_capacity, speed, location_airport,
           plane_type, model, maintenanced, neo
    FROM airplanes
"#;

const PERSON_SELECT: &str = r#"
    SELECT p.person_id, p.first_name, p.last_name,
           p.location_airport, p.location_airline, p.location_tail,
           pl.tax_id, pl.experience, pl.commanding_flight,
           ARRAY(
               SELECT l.license FROM pilot_licenses l
               WHERE l.person_id = p.person_id
               ORDER BY l.license COLLATE "C"
           ) AS licenses,
           pa.miles, pa.funds
    FROM persons p
    LEFT JOIN pilots pl ON pl.person_id = p.person_id
    LEFT JOIN passengers pa ON pa.person_id = p.person_id
"#;

const ROUTE_SELECT: &str = r#"
    SELECT rp.route_id, l.leg_id, l.departure, l.arrival, l.distance
    FROM route_path rp
    JOIN legs l ON l.leg_id = rp.leg_id
"#;

const FLIGHT_SELECT: &str = r#"
    SELECT flight_id, route_id, progress, next_time, cost, status, support_airline, support_tail
    FROM flights
"#;

async fn fetch_people(conn: &mut PgConnection, sql: &str, binds: &[&str]) -> CoreResult<Vec<Person>> {
    let mut query = sqlx::query_as::<_, PersonRow>(sql);
    for value in binds {
        query = query.bind(*value);
    }
    query
        .fetch_all(conn)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(PersonRow::into_domain)
        .collect()
}

async fn fetch_flights(conn: &mut PgConnection, sql: &str, binds: &[&str]) -> CoreResult<Vec<Flight>> {
    let mut query = sqlx::query_as::<_, FlightRow>(sql);
    for value in binds {
        query = query.bind(*value);
    }
    query
        .fetch_all(conn)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(FlightRow::into_domain)
        .collect()
}

async fn load_snapshot(conn: &mut PgConnection) -> CoreResult<NetworkSnapshot> {
    let airports = sqlx::query_as::<_, AirportRow>(
        r#"SELECT code, name, city, state, country FROM airports ORDER BY code COLLATE "C""#,
    )
    .fetch_all(&mut *conn)
    .await
    .map_err(db_err)?
    .into_iter()
    .map(AirportRow::into_domain)
    .collect::<CoreResult<Vec<_>>>()?;

    let airplanes = sqlx::query_as::<_, AirplaneRow>(&format!(
        r#"{} ORDER BY airline_id COLLATE "C", tail_num COLLATE "C""#,
        AIRPLANE_SELECT
    ))
    .fetch_all(&mut *conn)
    .await
    .map_err(db_err)?
    .into_iter()
    .map(AirplaneRow::into_domain)
    .collect::<CoreResult<Vec<_>>>()?;

    let people = fetch_people(
        &mut *conn,
        &format!(r#"{} ORDER BY p.person_id COLLATE "C""#, PERSON_SELECT),
        &[],
    )
    .await?;

    let legs = sqlx::query_as::<_, RouteLegRow>(&format!(
        r#"{} ORDER BY rp.route_id COLLATE "C", rp.sequence"#,
        ROUTE_SELECT
    ))
    .fetch_all(&mut *conn)
    .await
    .map_err(db_err)?;
    let routes = assemble_routes(legs)?;

    let flights = fetch_flights(
        &mut *conn,
        &format!(r#"{} ORDER BY flight_id COLLATE "C""#, FLIGHT_SELECT),
        &[],
    )
    .await?;

    Ok(NetworkSnapshot {
        airports,
        airplanes,
        people,
        routes,
        flights,
    })
}

fn location_columns(location: &Location) -> (Option<&str>, Option<&str>, Option<&str>) {
    match location {
        Location::Airport(code) => (Some(code.as_str()), None, None),
        Location::Airplane(key) => (None, Some(key.airline_id.as_str()), Some(key.tail_num.as_str())),
    }
}

// ============================================================================
// Store
// ============================================================================

/// Postgres-backed store. Commands run SERIALIZABLE; snapshots run
/// REPEATABLE READ so every projection sees one consistent state.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntityStore for PgStore {
    async fn begin(&self) -> CoreResult<Box<dyn StoreTx>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn snapshot(&self) -> CoreResult<NetworkSnapshot> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        let snapshot = load_snapshot(&mut tx).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(snapshot)
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

impl PgTx {
    async fn write_pilot_licenses(&mut self, person: &PersonId, licenses: &[LicenseType]) -> CoreResult<()> {
        sqlx::query("DELETE FROM pilot_licenses WHERE person_id = $1")
            .bind(person.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        for license in licenses {
            sqlx::query("INSERT INTO pilot_licenses (person_id, license) VALUES ($1, $2)")
                .bind(person.as_str())
                .bind(license.as_str())
                .execute(&mut *self.tx)
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }

    async fn write_leg(&mut self, leg: &Leg) -> CoreResult<()> {
        // Legs are shared between routes; an existing id must describe the same hop.
        let existing = sqlx::query_as::<_, (String, String, i32)>(
            "SELECT departure, arrival, distance FROM legs WHERE leg_id = $1",
        )
        .bind(&leg.leg_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err)?;

        match existing {
            Some((departure, arrival, distance)) => {
                let same = departure == leg.departure.as_str()
                    && arrival == leg.arrival.as_str()
                    && distance == to_db(leg.distance, "distance")?;
                if !same {
                    return Err(CoreError::Validation(format!(
                        "leg {} already exists with different endpoints",
                        leg.leg_id
                    )));
                }
            }
            None => {
                sqlx::query("INSERT INTO legs (leg_id, departure, arrival, distance) VALUES ($1, $2, $3, $4)")
                    .bind(&leg.leg_id)
                    .bind(leg.departure.as_str())
                    .bind(leg.arrival.as_str())
                    .bind(to_db(leg.distance, "distance")?)
                    .execute(&mut *self.tx)
                    .await
                    .map_err(db_err)?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn airport(&mut self, code: &AirportCode) -> CoreResult<Option<Airport>> {
        sqlx::query_as::<_, AirportRow>("SELECT code, name, city, state, country FROM airports WHERE code = $1")
            .bind(code.as_str())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?
            .map(AirportRow::into_domain)
            .transpose()
    }

    async fn airplane(&mut self, key: &AirplaneKey) -> CoreResult<Option<Airplane>> {
        sqlx::query_as::<_, AirplaneRow>(&format!("{} WHERE airline_id = $1 AND tail_num = $2", AIRPLANE_SELECT))
            .bind(&key.airline_id)
            .bind(&key.tail_num)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(db_err)?
            .map(AirplaneRow::into_domain)
            .transpose()
    }

    async fn person(&mut self, id: &PersonId) -> CoreResult<Option<Person>> {
        let sql = format!("{} WHERE p.person_id = $1", PERSON_SELECT);
        Ok(fetch_people(&mut self.tx, &sql, &[id.as_str()]).await?.into_iter().next())
    }

    async fn route(&mut self, id: &RouteId) -> CoreResult<Option<Route>> {
        let rows = sqlx::query_as::<_, RouteLegRow>(&format!("{} WHERE rp.route_id = $1 ORDER BY rp.sequence", ROUTE_SELECT))
            .bind(id.as_str())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(assemble_routes(rows)?.into_iter().next())
    }

    async fn flight(&mut self, id: &FlightId) -> CoreResult<Option<Flight>> {
        let sql = format!("{} WHERE flight_id = $1", FLIGHT_SELECT);
        Ok(fetch_flights(&mut self.tx, &sql, &[id.as_str()]).await?.into_iter().next())
    }

    async fn people_at(&mut self, location: &Location) -> CoreResult<Vec<Person>> {
        match location {
            Location::Airport(code) => {
                let sql = format!(r#"{} WHERE p.location_airport = $1 ORDER BY p.person_id COLLATE "C""#, PERSON_SELECT);
                fetch_people(&mut self.tx, &sql, &[code.as_str()]).await
            }
            Location::Airplane(key) => {
                let sql = format!(
                    r#"{} WHERE p.location_airline = $1 AND p.location_tail = $2 ORDER BY p.person_id COLLATE "C""#,
                    PERSON_SELECT
                );
                fetch_people(&mut self.tx, &sql, &[key.airline_id.as_str(), key.tail_num.as_str()]).await
            }
        }
    }

    async fn crew_of(&mut self, flight: &FlightId) -> CoreResult<Vec<Person>> {
        let sql = format!(r#"{} WHERE pl.commanding_flight = $1 ORDER BY p.person_id COLLATE "C""#, PERSON_SELECT);
        fetch_people(&mut self.tx, &sql, &[flight.as_str()]).await
    }

    async fn active_flight_for(&mut self, key: &AirplaneKey) -> CoreResult<Option<Flight>> {
        let sql = format!(
            "{} WHERE support_airline = $1 AND support_tail = $2 AND status <> 'retired'",
            FLIGHT_SELECT
        );
        Ok(fetch_flights(&mut self.tx, &sql, &[key.airline_id.as_str(), key.tail_num.as_str()])
            .await?
            .into_iter()
            .next())
    }

    async fn insert_airport(&mut self, airport: &Airport) -> CoreResult<()> {
        sqlx::query("INSERT INTO airports (code, name, city, state, country) VALUES ($1, $2, $3, $4, $5)")
            .bind(airport.code.as_str())
            .bind(&airport.name)
            .bind(&airport.city)
            .bind(&airport.state)
            .bind(&airport.country)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn insert_airplane(&mut self, airplane: &Airplane) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO airplanes
                (airline_id, tail_num, seat_capacity, speed, location_airport, plane_type, model, maintenanced, neo)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&airplane.key.airline_id)
        .bind(&airplane.key.tail_num)
        .bind(to_db(airplane.seat_capacity, "seat_capacity")?)
        .bind(to_db(airplane.speed, "speed")?)
        .bind(airplane.parked_at().map(|c| c.as_str()))
        .bind(airplane.plane_type.as_deref())
        .bind(airplane.model.as_deref())
        .bind(airplane.maintenanced)
        .bind(airplane.neo)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn insert_person(&mut self, person: &Person) -> CoreResult<()> {
        let (airport, airline, tail) = location_columns(&person.location);
        sqlx::query(
            r#"
            INSERT INTO persons (person_id, first_name, last_name, location_airport, location_airline, location_tail)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(person.id.as_str())
        .bind(&person.first_name)
        .bind(person.last_name.as_deref())
        .bind(airport)
        .bind(airline)
        .bind(tail)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;

        match &person.role {
            PersonRole::Pilot(pilot) => {
                sqlx::query(
                    "INSERT INTO pilots (person_id, tax_id, experience, commanding_flight) VALUES ($1, $2, $3, $4)",
                )
                .bind(person.id.as_str())
                .bind(&pilot.tax_id)
                .bind(to_db(pilot.experience, "experience")?)
                .bind(pilot.commanding_flight.as_ref().map(|f| f.as_str()))
                .execute(&mut *self.tx)
                .await
                .map_err(db_err)?;
                let licenses: Vec<LicenseType> = pilot.licenses.iter().cloned().collect();
                self.write_pilot_licenses(&person.id, &licenses).await?;
            }
            PersonRole::Passenger(passenger) => {
                sqlx::query("INSERT INTO passengers (person_id, miles, funds) VALUES ($1, $2, $3)")
                    .bind(person.id.as_str())
                    .bind(to_db(passenger.miles, "miles")?)
                    .bind(to_db(passenger.funds, "funds")?)
                    .execute(&mut *self.tx)
                    .await
                    .map_err(db_err)?;
            }
        }
        Ok(())
    }

    async fn insert_route(&mut self, route: &Route) -> CoreResult<()> {
        sqlx::query("INSERT INTO routes (route_id) VALUES ($1)")
            .bind(route.id.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?;

        for (sequence, leg) in route.legs.iter().enumerate() {
            self.write_leg(leg).await?;
            sqlx::query("INSERT INTO route_path (route_id, sequence, leg_id) VALUES ($1, $2, $3)")
                .bind(route.id.as_str())
                .bind(sequence as i32 + 1)
                .bind(&leg.leg_id)
                .execute(&mut *self.tx)
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }

    async fn insert_flight(&mut self, flight: &Flight) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO flights
                (flight_id, route_id, progress, next_time, cost, status, support_airline, support_tail)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(flight.id.as_str())
        .bind(flight.route_id.as_str())
        .bind(to_db(flight.progress, "progress")?)
        .bind(flight.next_time.as_naive())
        .bind(to_db(flight.cost, "cost")?)
        .bind(flight.status.as_str())
        .bind(flight.airplane.as_ref().map(|k| k.airline_id.as_str()))
        .bind(flight.airplane.as_ref().map(|k| k.tail_num.as_str()))
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn save_airplane(&mut self, airplane: &Airplane) -> CoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE airplanes
            SET seat_capacity = $3, speed = $4, location_airport = $5,
                plane_type = $6, model = $7, maintenanced = $8, neo = $9
            WHERE airline_id = $1 AND tail_num = $2
            "#,
        )
        .bind(&airplane.key.airline_id)
        .bind(&airplane.key.tail_num)
        .bind(to_db(airplane.seat_capacity, "seat_capacity")?)
        .bind(to_db(airplane.speed, "speed")?)
        .bind(airplane.parked_at().map(|c| c.as_str()))
        .bind(airplane.plane_type.as_deref())
        .bind(airplane.model.as_deref())
        .bind(airplane.maintenanced)
        .bind(airplane.neo)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("airplane {}", airplane.key)));
        }
        Ok(())
    }

    async fn save_person(&mut self, person: &Person) -> CoreResult<()> {
        let (airport, airline, tail) = location_columns(&person.location);
        let result = sqlx::query(
            r#"
            UPDATE persons
            SET first_name = $2, last_name = $3,
                location_airport = $4, location_airline = $5, location_tail = $6
            WHERE person_id = $1
            "#,
        )
        .bind(person.id.as_str())
        .bind(&person.first_name)
        .bind(person.last_name.as_deref())
        .bind(airport)
        .bind(airline)
        .bind(tail)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("person {}", person.id)));
        }

        let role_rows = match &person.role {
            PersonRole::Pilot(pilot) => {
                let updated = sqlx::query(
                    "UPDATE pilots SET experience = $2, commanding_flight = $3 WHERE person_id = $1",
                )
                .bind(person.id.as_str())
                .bind(to_db(pilot.experience, "experience")?)
                .bind(pilot.commanding_flight.as_ref().map(|f| f.as_str()))
                .execute(&mut *self.tx)
                .await
                .map_err(db_err)?
                .rows_affected();
                if updated > 0 {
                    let licenses: Vec<LicenseType> = pilot.licenses.iter().cloned().collect();
                    self.write_pilot_licenses(&person.id, &licenses).await?;
                }
                updated
            }
            PersonRole::Passenger(passenger) => sqlx::query(
                "UPDATE passengers SET miles = $2, funds = $3 WHERE person_id = $1",
            )
            .bind(person.id.as_str())
            .bind(to_db(passenger.miles, "miles")?)
            .bind(to_db(passenger.funds, "funds")?)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err)?
            .rows_affected(),
        };

        if role_rows == 0 {
            return Err(CoreError::Validation(format!("person {} cannot change role", person.id)));
        }
        Ok(())
    }

    async fn save_flight(&mut self, flight: &Flight) -> CoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE flights
            SET route_id = $2, progress = $3, next_time = $4, cost = $5, status = $6,
                support_airline = $7, support_tail = $8
            WHERE flight_id = $1
            "#,
        )
        .bind(flight.id.as_str())
        .bind(flight.route_id.as_str())
        .bind(to_db(flight.progress, "progress")?)
        .bind(flight.next_time.as_naive())
        .bind(to_db(flight.cost, "cost")?)
        .bind(flight.status.as_str())
        .bind(flight.airplane.as_ref().map(|k| k.airline_id.as_str()))
        .bind(flight.airplane.as_ref().map(|k| k.tail_num.as_str()))
        .execute(&mut *self.tx)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("flight {}", flight.id)));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> CoreResult<()> {
        self.tx.commit().await.map_err(db_err)
    }
}
