use serde::{Deserialize, Serialize};
use std::fmt;

use crate::iata::AirportCode;
use crate::models::AirplaneKey;

/// Where a person currently is: inside an airport or aboard an airplane.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Location {
    Airport(AirportCode),
    Airplane(AirplaneKey),
}

impl Location {
    pub fn airport(&self) -> Option<&AirportCode> {
        match self {
            Location::Airport(code) => Some(code),
            Location::Airplane(_) => None,
        }
    }

    pub fn airplane(&self) -> Option<&AirplaneKey> {
        match self {
            Location::Airplane(key) => Some(key),
            Location::Airport(_) => None,
        }
    }

    pub fn is_aboard(&self, key: &AirplaneKey) -> bool {
        self.airplane() == Some(key)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Airport(code) => write!(f, "port:{}", code),
            Location::Airplane(key) => write!(f, "plane:{}", key),
        }
    }
}

/// Where an airplane currently is. Airborne airplanes have no fixed place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AirplaneLocation {
    Airport(AirportCode),
    Airborne,
}

impl AirplaneLocation {
    pub fn airport(&self) -> Option<&AirportCode> {
        match self {
            AirplaneLocation::Airport(code) => Some(code),
            AirplaneLocation::Airborne => None,
        }
    }
}

impl fmt::Display for AirplaneLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AirplaneLocation::Airport(code) => write!(f, "port:{}", code),
            AirplaneLocation::Airborne => f.write_str("airborne"),
        }
    }
}
