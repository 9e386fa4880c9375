use axum::{
    extract::State,
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};
use aerotrack_core::{Flight, FlightId, LicenseType, PersonId, RouteId, SimTime};
use aerotrack_ops::{BoardingOutcome, CycleReport, OfferRequest};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/offer_flight", post(offer_flight))
        .route("/flight_takeoff", post(flight_takeoff))
        .route("/flight_landing", post(flight_landing))
        .route("/retire_flight", post(retire_flight))
        .route("/passengers_board", post(passengers_board))
        .route("/passengers_disembark", post(passengers_disembark))
        .route("/assign_pilot", put(assign_pilot))
        .route("/pilot_licenses", post(toggle_license))
        .route("/recycle_crew", post(recycle_crew))
        .route("/simulation_cycle", post(simulation_cycle))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct OfferFlightRequest {
    #[serde(rename = "flightID")]
    pub flight_id: String,
    #[serde(rename = "routeID")]
    pub route_id: String,
    #[serde(rename = "supportAirline", default)]
    pub support_airline: Option<String>,
    #[serde(rename = "supportTail", default)]
    pub support_tail: Option<String>,
    #[serde(default)]
    pub progress: u32,
    #[serde(rename = "nextTime")]
    pub next_time: String,
    pub cost: i64,
}

#[derive(Debug, Deserialize)]
pub struct FlightRequest {
    #[serde(rename = "flightID")]
    pub flight_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignPilotRequest {
    #[serde(rename = "personID")]
    pub person_id: String,
    /// Absent or empty clears the assignment.
    #[serde(rename = "flightID", default)]
    pub flight_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleLicenseRequest {
    #[serde(rename = "personID")]
    pub person_id: String,
    pub license: String,
}

#[derive(Debug, Serialize)]
pub struct LicensesResponse {
    pub person_id: PersonId,
    pub licenses: Vec<LicenseType>,
}

#[derive(Debug, Serialize)]
pub struct MovedResponse {
    pub flight_id: FlightId,
    pub persons: Vec<PersonId>,
}

fn flight_id(raw: &str) -> Result<FlightId, AppError> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(AppError::ValidationError("flightID is required".into()));
    }
    Ok(FlightId::new(id))
}

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

// ============================================================================
// Flight lifecycle
// ============================================================================

async fn offer_flight(
    State(state): State<AppState>,
    Json(req): Json<OfferFlightRequest>,
) -> Result<(StatusCode, Json<Flight>), AppError> {
    let next_time = SimTime::parse(&req.next_time, state.now().await)?;
    let request = OfferRequest {
        flight_id: flight_id(&req.flight_id)?,
        route_id: RouteId::new(req.route_id.trim()),
        support_airline: non_blank(req.support_airline),
        support_tail: non_blank(req.support_tail),
        progress: req.progress,
        next_time,
        cost: req.cost,
    };

    let flight = state.ops.offer_flight(request).await?;
    Ok((StatusCode::CREATED, Json(flight)))
}

async fn flight_takeoff(
    State(state): State<AppState>,
    Json(req): Json<FlightRequest>,
) -> Result<Json<Flight>, AppError> {
    let id = flight_id(&req.flight_id)?;
    let now = state.now().await;
    Ok(Json(state.ops.flight_takeoff(&id, now).await?))
}

async fn flight_landing(
    State(state): State<AppState>,
    Json(req): Json<FlightRequest>,
) -> Result<Json<Flight>, AppError> {
    let id = flight_id(&req.flight_id)?;
    let now = state.now().await;
    Ok(Json(state.ops.flight_landing(&id, now).await?))
}

async fn retire_flight(
    State(state): State<AppState>,
    Json(req): Json<FlightRequest>,
) -> Result<Json<Flight>, AppError> {
    let id = flight_id(&req.flight_id)?;
    Ok(Json(state.ops.retire_flight(&id).await?))
}

// ============================================================================
// Passengers & Crew
// ============================================================================

async fn passengers_board(
    State(state): State<AppState>,
    Json(req): Json<FlightRequest>,
) -> Result<Json<BoardingOutcome>, AppError> {
    let id = flight_id(&req.flight_id)?;
    Ok(Json(state.ops.passengers_board(&id).await?))
}

async fn passengers_disembark(
    State(state): State<AppState>,
    Json(req): Json<FlightRequest>,
) -> Result<Json<MovedResponse>, AppError> {
    let id = flight_id(&req.flight_id)?;
    let persons = state.ops.passengers_disembark(&id).await?;
    Ok(Json(MovedResponse { flight_id: id, persons }))
}

async fn assign_pilot(
    State(state): State<AppState>,
    Json(req): Json<AssignPilotRequest>,
) -> Result<Json<aerotrack_core::Person>, AppError> {
    let person_id = req.person_id.trim();
    if person_id.is_empty() {
        return Err(AppError::ValidationError("personID is required".into()));
    }
    let target = non_blank(req.flight_id).map(FlightId::new);

    let pilot = state
        .ops
        .assign_pilot(&PersonId::new(person_id), target.as_ref())
        .await?;
    Ok(Json(pilot))
}

async fn toggle_license(
    State(state): State<AppState>,
    Json(req): Json<ToggleLicenseRequest>,
) -> Result<Json<LicensesResponse>, AppError> {
    let person_id = PersonId::new(req.person_id.trim());
    let pilot = state.ops.toggle_license(&person_id, &req.license).await?;
    let licenses: Vec<LicenseType> = pilot
        .pilot()
        .map(|profile| profile.licenses.iter().cloned().collect())
        .unwrap_or_default();

    Ok(Json(LicensesResponse { person_id, licenses }))
}

async fn recycle_crew(
    State(state): State<AppState>,
    Json(req): Json<FlightRequest>,
) -> Result<Json<MovedResponse>, AppError> {
    let id = flight_id(&req.flight_id)?;
    let persons = state.ops.recycle_crew(&id).await?;
    Ok(Json(MovedResponse { flight_id: id, persons }))
}

// ============================================================================
// Simulation
// ============================================================================

async fn simulation_cycle(State(state): State<AppState>) -> Result<Json<CycleReport>, AppError> {
    let mut clock = state.clock.lock().await;
    let report = state.ops.simulation_cycle(&mut clock).await?;
    Ok(Json(report))
}
