pub mod iata;
pub mod location;
pub mod models;
pub mod clock;
pub mod repository;

pub use clock::{SimClock, SimTime};
pub use iata::AirportCode;
pub use location::{AirplaneLocation, Location};
pub use models::{
    Airplane, AirplaneKey, Airport, Flight, FlightId, FlightStatus, Leg, LicenseType,
    PassengerProfile, Person, PersonId, PersonRole, PilotProfile, Route, RouteId,
};
pub use repository::{EntityStore, NetworkSnapshot, StoreTx};

/// Error taxonomy shared by the state machine, the crew manager and the stores.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Malformed input or an unknown reference supplied by the caller.
    #[error("Validation failed: {0}")]
    Validation(String),
    /// The resource is already committed elsewhere.
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Stored entities disagree with the command (e.g. airplane parked elsewhere).
    #[error("Inconsistent state: {0}")]
    InconsistentState(String),
    /// The command is not allowed in the current lifecycle state.
    #[error("Precondition failed: {0}")]
    Precondition(String),
    /// Soft limit reached; nothing could be applied.
    #[error("Capacity reached: {0}")]
    Capacity(String),
    #[error("Not found: {0}")]
    NotFound(String),
    /// Storage or timeout failure. Safe to retry.
    #[error("Transient failure: {0}")]
    Transient(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Transient(_))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(CoreError::Transient("pool timed out".into()).is_retryable());
        assert!(!CoreError::Precondition("no commanding pilot".into()).is_retryable());
        assert!(!CoreError::Validation("bad code".into()).is_retryable());
    }

    #[test]
    fn test_error_messages_carry_reason() {
        let err = CoreError::Precondition("no commanding pilot".into());
        assert_eq!(err.to_string(), "Precondition failed: no commanding pilot");
    }
}
