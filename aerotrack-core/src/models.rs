use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::clock::SimTime;
use crate::iata::AirportCode;
use crate::location::{AirplaneLocation, Location};
use crate::{CoreError, CoreResult};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Unique flight identifier (e.g. `DL_1174`).
    FlightId
);
string_id!(RouteId);
string_id!(PersonId);

// ============================================================================
// Airports & Airplanes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airport {
    pub code: AirportCode,
    pub name: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

/// Composite airplane key: operating airline plus tail number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AirplaneKey {
    pub airline_id: String,
    pub tail_num: String,
}

impl AirplaneKey {
    pub fn new(airline_id: impl Into<String>, tail_num: impl Into<String>) -> Self {
        Self {
            airline_id: airline_id.into(),
            tail_num: tail_num.into(),
        }
    }
}

impl fmt::Display for AirplaneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.airline_id, self.tail_num)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airplane {
    pub key: AirplaneKey,
    pub seat_capacity: u32,
    pub speed: u32,
    pub location: AirplaneLocation,
    pub plane_type: Option<String>,
    pub model: Option<String>,
    pub maintenanced: bool,
    pub neo: bool,
}

impl Airplane {
    /// Airport the airplane is parked at, `None` while airborne.
    pub fn parked_at(&self) -> Option<&AirportCode> {
        self.location.airport()
    }

    /// License a pilot needs to command this airplane.
    pub fn required_license(&self) -> LicenseType {
        match self.plane_type.as_deref() {
            Some(kind) if !kind.trim().is_empty() => LicenseType::new(kind),
            _ => LicenseType::new(LicenseType::GENERAL),
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.key.airline_id.trim().is_empty() || self.key.tail_num.trim().is_empty() {
            return Err(CoreError::Validation("airline id and tail number are required".into()));
        }
        if self.seat_capacity == 0 {
            return Err(CoreError::Validation(format!("airplane {} needs seat_capacity > 0", self.key)));
        }
        if self.speed == 0 {
            return Err(CoreError::Validation(format!("airplane {} needs speed > 0", self.key)));
        }
        Ok(())
    }
}

// ============================================================================
// People
// ============================================================================

/// Pilot credential. Identity ignores ASCII case, so toggling `cessna` after
/// `Cessna` revokes it. Well known types are spelled canonically; others keep
/// the spelling they were first given.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct LicenseType(String);

impl LicenseType {
    pub const AIRBUS: &'static str = "Airbus";
    pub const BOEING: &'static str = "Boeing";
    pub const GENERAL: &'static str = "general";

    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        for known in [Self::AIRBUS, Self::BOEING, Self::GENERAL] {
            if trimmed.eq_ignore_ascii_case(known) {
                return Self(known.to_string());
            }
        }
        Self(trimmed.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn covers(&self, required: &LicenseType) -> bool {
        self == required
    }

    fn key(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.bytes().map(|b| b.to_ascii_lowercase())
    }
}

impl PartialEq for LicenseType {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for LicenseType {}

impl PartialOrd for LicenseType {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LicenseType {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(other.key())
    }
}

impl std::hash::Hash for LicenseType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for b in self.key() {
            state.write_u8(b);
        }
        state.write_u8(0xff);
    }
}

impl From<String> for LicenseType {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl From<LicenseType> for String {
    fn from(license: LicenseType) -> Self {
        license.0
    }
}

impl fmt::Display for LicenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PilotProfile {
    pub tax_id: String,
    pub experience: u32,
    pub licenses: BTreeSet<LicenseType>,
    pub commanding_flight: Option<FlightId>,
}

impl PilotProfile {
    pub fn is_licensed_for(&self, required: &LicenseType) -> bool {
        self.licenses.iter().any(|held| held.covers(required))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PassengerProfile {
    pub miles: u32,
    pub funds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum PersonRole {
    Pilot(PilotProfile),
    Passenger(PassengerProfile),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub location: Location,
    pub role: PersonRole,
}

impl Person {
    pub fn pilot(&self) -> Option<&PilotProfile> {
        match &self.role {
            PersonRole::Pilot(profile) => Some(profile),
            PersonRole::Passenger(_) => None,
        }
    }

    pub fn pilot_mut(&mut self) -> Option<&mut PilotProfile> {
        match &mut self.role {
            PersonRole::Pilot(profile) => Some(profile),
            PersonRole::Passenger(_) => None,
        }
    }

    pub fn is_pilot(&self) -> bool {
        self.pilot().is_some()
    }

    pub fn is_passenger(&self) -> bool {
        matches!(self.role, PersonRole::Passenger(_))
    }

    pub fn commanding_flight(&self) -> Option<&FlightId> {
        self.pilot().and_then(|p| p.commanding_flight.as_ref())
    }
}

// ============================================================================
// Routes & Flights
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leg {
    pub leg_id: String,
    pub departure: AirportCode,
    pub arrival: AirportCode,
    pub distance: u32,
}

/// Ordered sequence of legs. Static reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub legs: Vec<Leg>,
}

impl Route {
    pub fn leg(&self, progress: u32) -> Option<&Leg> {
        self.legs.get(progress as usize)
    }

    pub fn leg_count(&self) -> u32 {
        self.legs.len() as u32
    }

    pub fn origin(&self) -> Option<&AirportCode> {
        self.legs.first().map(|leg| &leg.departure)
    }

    pub fn length(&self) -> u64 {
        self.legs.iter().map(|leg| u64::from(leg.distance)).sum()
    }

    /// Airport a flight with the given progress is expected to sit at.
    pub fn ground_airport(&self, progress: u32) -> Option<&AirportCode> {
        match self.leg(progress) {
            Some(leg) => Some(&leg.departure),
            None if progress == self.leg_count() => self.legs.last().map(|leg| &leg.arrival),
            None => None,
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.legs.is_empty() {
            return Err(CoreError::Validation(format!("route {} has no legs", self.id)));
        }
        for leg in &self.legs {
            if leg.distance == 0 {
                return Err(CoreError::Validation(format!("leg {} needs distance > 0", leg.leg_id)));
            }
        }
        for pair in self.legs.windows(2) {
            if pair[0].arrival != pair[1].departure {
                return Err(CoreError::Validation(format!(
                    "route {} is not contiguous: leg {} arrives at {} but leg {} departs {}",
                    self.id, pair[0].leg_id, pair[0].arrival, pair[1].leg_id, pair[1].departure
                )));
            }
        }
        Ok(())
    }
}

/// Flight lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightStatus {
    OnGround,
    InAir,
    Retired,
}

impl FlightStatus {
    /// The only legal edges: on_ground→in_air, in_air→on_ground, on_ground→retired.
    pub fn can_transition_to(self, next: FlightStatus) -> bool {
        matches!(
            (self, next),
            (FlightStatus::OnGround, FlightStatus::InAir)
                | (FlightStatus::InAir, FlightStatus::OnGround)
                | (FlightStatus::OnGround, FlightStatus::Retired)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FlightStatus::OnGround => "on_ground",
            FlightStatus::InAir => "in_air",
            FlightStatus::Retired => "retired",
        }
    }

    pub fn parse(raw: &str) -> CoreResult<Self> {
        match raw {
            "on_ground" => Ok(FlightStatus::OnGround),
            "in_air" => Ok(FlightStatus::InAir),
            "retired" => Ok(FlightStatus::Retired),
            other => Err(CoreError::Internal(format!("unknown flight status '{}'", other))),
        }
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    pub id: FlightId,
    pub route_id: RouteId,
    /// Number of legs already flown.
    pub progress: u32,
    pub next_time: SimTime,
    pub cost: u32,
    pub status: FlightStatus,
    pub airplane: Option<AirplaneKey>,
}

impl Flight {
    pub fn is_active(&self) -> bool {
        self.status != FlightStatus::Retired
    }

    pub fn is_complete(&self, route: &Route) -> bool {
        self.progress >= route.leg_count()
    }

    /// Apply a status change along a legal edge.
    pub fn transition(&mut self, next: FlightStatus) -> CoreResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::Precondition(format!(
                "flight {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}
