pub mod models;

pub use models::events::{EventEnvelope, FlightEvent};
