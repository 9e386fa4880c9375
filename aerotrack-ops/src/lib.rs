pub mod locks;
pub mod lifecycle;
pub mod crew;
pub mod service;
pub mod cycle;
pub mod registry;
pub mod projections;

pub use crew::BoardingOutcome;
pub use cycle::{CycleFailure, CycleReport};
pub use lifecycle::OfferRequest;
pub use locks::{FlightGuard, FlightLocks};
pub use registry::PilotLicenseRow;
pub use service::{FlightOps, OpsRules};
