use axum::{extract::State, routing::get, Json, Router};
use aerotrack_ops::projections::{
    AlternateAirportsRow, FlightsInAirRow, FlightsOnGroundRow, PeopleInAirRow, PeopleOnGroundRow, RouteSummaryRow,
};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/flights_in_the_air", get(flights_in_the_air))
        .route("/flights_on_the_ground", get(flights_on_the_ground))
        .route("/people_in_the_air", get(people_in_the_air))
        .route("/people_on_the_ground", get(people_on_the_ground))
        .route("/route_summary", get(route_summary))
        .route("/alternate_airports", get(alternate_airports))
}

async fn flights_in_the_air(State(state): State<AppState>) -> Result<Json<Vec<FlightsInAirRow>>, AppError> {
    Ok(Json(state.ops.flights_in_the_air().await?))
}

async fn flights_on_the_ground(State(state): State<AppState>) -> Result<Json<Vec<FlightsOnGroundRow>>, AppError> {
    Ok(Json(state.ops.flights_on_the_ground().await?))
}

async fn people_in_the_air(State(state): State<AppState>) -> Result<Json<Vec<PeopleInAirRow>>, AppError> {
    Ok(Json(state.ops.people_in_the_air().await?))
}

async fn people_on_the_ground(State(state): State<AppState>) -> Result<Json<Vec<PeopleOnGroundRow>>, AppError> {
    Ok(Json(state.ops.people_on_the_ground().await?))
}

async fn route_summary(State(state): State<AppState>) -> Result<Json<Vec<RouteSummaryRow>>, AppError> {
    Ok(Json(state.ops.route_summary().await?))
}

async fn alternate_airports(State(state): State<AppState>) -> Result<Json<Vec<AlternateAirportsRow>>, AppError> {
    Ok(Json(state.ops.alternate_airports().await?))
}
