use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use aerotrack_core::{
    Airplane, AirplaneKey, AirplaneLocation, Airport, AirportCode, Flight, FlightId, Leg, LicenseType, Location,
    PassengerProfile, Person, PersonId, PersonRole, PilotProfile, Route, RouteId, SimClock,
};
use aerotrack_ops::PilotLicenseRow;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/airport", get(list_airports).post(add_airport))
        .route("/airplane", get(list_airplanes).post(add_airplane))
        .route("/person", get(list_people).post(add_person))
        .route("/pilot", get(list_pilots))
        .route("/pilot/{person_id}/licenses", get(licenses_of))
        .route("/pilot_licenses", get(list_pilot_licenses))
        .route("/route", get(list_routes).post(add_route))
        .route("/flight", get(list_flights))
        .route("/boarded_passengers/{flight_id}", get(boarded_passengers))
        .route("/clock", get(clock))
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AddAirportRequest {
    #[serde(rename = "airportID")]
    pub airport_id: String,
    pub airport_name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Deserialize)]
pub struct AddAirplaneRequest {
    #[serde(rename = "airlineID")]
    pub airline_id: String,
    pub tail_num: String,
    pub seat_capacity: u32,
    pub speed: u32,
    /// Airport the airplane is parked at.
    #[serde(rename = "locationID")]
    pub location_id: String,
    #[serde(default)]
    pub plane_type: Option<String>,
    #[serde(default)]
    pub maintenanced: bool,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub neo: bool,
}

/// A person with a `taxID` is a pilot, everyone else a passenger.
#[derive(Debug, Deserialize)]
pub struct AddPersonRequest {
    #[serde(rename = "personID")]
    pub person_id: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    /// An airport code, or `airline/tail` for someone already aboard.
    #[serde(rename = "locationID")]
    pub location_id: String,
    #[serde(rename = "taxID", default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub experience: u32,
    #[serde(default)]
    pub licenses: Vec<String>,
    #[serde(default)]
    pub miles: u32,
    #[serde(default)]
    pub funds: u32,
}

#[derive(Debug, Deserialize)]
pub struct LegRequest {
    #[serde(rename = "legID")]
    pub leg_id: String,
    pub departure: String,
    pub arrival: String,
    pub distance: u32,
}

#[derive(Debug, Deserialize)]
pub struct AddRouteRequest {
    #[serde(rename = "routeID")]
    pub route_id: String,
    pub legs: Vec<LegRequest>,
}

fn parse_location(raw: &str) -> Result<Location, AppError> {
    match raw.trim().split_once('/') {
        Some((airline, tail)) if !airline.is_empty() && !tail.is_empty() => {
            Ok(Location::Airplane(AirplaneKey::new(airline, tail)))
        }
        Some(_) => Err(AppError::ValidationError(format!("bad airplane location '{}'", raw))),
        None => Ok(Location::Airport(AirportCode::parse(raw)?)),
    }
}

// ============================================================================
// Reference data
// ============================================================================

async fn add_airport(
    State(state): State<AppState>,
    Json(req): Json<AddAirportRequest>,
) -> Result<(StatusCode, Json<Airport>), AppError> {
    let airport = Airport {
        code: AirportCode::parse(&req.airport_id)?,
        name: req.airport_name.trim().to_string(),
        city: req.city,
        state: req.state,
        country: req.country,
    };
    Ok((StatusCode::CREATED, Json(state.ops.add_airport(airport).await?)))
}

async fn list_airports(State(state): State<AppState>) -> Result<Json<Vec<Airport>>, AppError> {
    Ok(Json(state.ops.snapshot().await?.airports))
}

async fn add_airplane(
    State(state): State<AppState>,
    Json(req): Json<AddAirplaneRequest>,
) -> Result<(StatusCode, Json<Airplane>), AppError> {
    let airplane = Airplane {
        key: AirplaneKey::new(req.airline_id.trim(), req.tail_num.trim()),
        seat_capacity: req.seat_capacity,
        speed: req.speed,
        location: AirplaneLocation::Airport(AirportCode::parse(&req.location_id)?),
        plane_type: req.plane_type.filter(|t| !t.trim().is_empty()),
        model: req.model.filter(|m| !m.trim().is_empty()),
        maintenanced: req.maintenanced,
        neo: req.neo,
    };
    Ok((StatusCode::CREATED, Json(state.ops.add_airplane(airplane).await?)))
}

async fn list_airplanes(State(state): State<AppState>) -> Result<Json<Vec<Airplane>>, AppError> {
    Ok(Json(state.ops.snapshot().await?.airplanes))
}

async fn add_person(
    State(state): State<AppState>,
    Json(req): Json<AddPersonRequest>,
) -> Result<(StatusCode, Json<Person>), AppError> {
    let role = match req.tax_id {
        Some(tax_id) => PersonRole::Pilot(PilotProfile {
            tax_id,
            experience: req.experience,
            licenses: req.licenses.iter().map(|l| LicenseType::new(l)).collect(),
            commanding_flight: None,
        }),
        None => PersonRole::Passenger(PassengerProfile {
            miles: req.miles,
            funds: req.funds,
        }),
    };
    let person = Person {
        id: PersonId::new(req.person_id.trim()),
        first_name: req.first_name.trim().to_string(),
        last_name: req.last_name.filter(|n| !n.trim().is_empty()),
        location: parse_location(&req.location_id)?,
        role,
    };
    Ok((StatusCode::CREATED, Json(state.ops.add_person(person).await?)))
}

async fn list_people(State(state): State<AppState>) -> Result<Json<Vec<Person>>, AppError> {
    Ok(Json(state.ops.snapshot().await?.people))
}

async fn list_pilots(State(state): State<AppState>) -> Result<Json<Vec<Person>>, AppError> {
    Ok(Json(state.ops.pilots().await?))
}

async fn licenses_of(
    State(state): State<AppState>,
    Path(person_id): Path<String>,
) -> Result<Json<Vec<LicenseType>>, AppError> {
    Ok(Json(state.ops.licenses_of(&PersonId::new(person_id)).await?))
}

async fn list_pilot_licenses(State(state): State<AppState>) -> Result<Json<Vec<PilotLicenseRow>>, AppError> {
    Ok(Json(state.ops.pilot_licenses().await?))
}

async fn add_route(
    State(state): State<AppState>,
    Json(req): Json<AddRouteRequest>,
) -> Result<(StatusCode, Json<Route>), AppError> {
    let legs = req
        .legs
        .into_iter()
        .map(|leg| -> Result<Leg, AppError> {
            Ok(Leg {
                leg_id: leg.leg_id.trim().to_string(),
                departure: AirportCode::parse(&leg.departure)?,
                arrival: AirportCode::parse(&leg.arrival)?,
                distance: leg.distance,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let route = Route {
        id: RouteId::new(req.route_id.trim()),
        legs,
    };
    Ok((StatusCode::CREATED, Json(state.ops.add_route(route).await?)))
}

async fn list_routes(State(state): State<AppState>) -> Result<Json<Vec<Route>>, AppError> {
    Ok(Json(state.ops.snapshot().await?.routes))
}

async fn list_flights(State(state): State<AppState>) -> Result<Json<Vec<Flight>>, AppError> {
    Ok(Json(state.ops.flights().await?))
}

async fn boarded_passengers(
    State(state): State<AppState>,
    Path(flight_id): Path<String>,
) -> Result<Json<Vec<Person>>, AppError> {
    Ok(Json(state.ops.boarded_passengers(&FlightId::new(flight_id)).await?))
}

async fn clock(State(state): State<AppState>) -> Json<SimClock> {
    Json(state.clock.lock().await.clone())
}
