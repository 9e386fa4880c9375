use chrono::NaiveDateTime;
use uuid::Uuid;

/// Lifecycle notifications emitted after a command commits.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FlightEvent {
    Offered {
        flight_id: String,
        route_id: String,
        airplane: Option<String>,
        next_time: NaiveDateTime,
    },
    TookOff {
        flight_id: String,
        airplane: String,
        departing_from: String,
        arriving_at: String,
        next_time: NaiveDateTime,
    },
    Landed {
        flight_id: String,
        airplane: String,
        airport: String,
        progress: u32,
        complete: bool,
        next_time: NaiveDateTime,
    },
    Retired {
        flight_id: String,
    },
    Boarded {
        flight_id: String,
        passengers: Vec<String>,
        left_behind: usize,
    },
    Disembarked {
        flight_id: String,
        airport: String,
        persons: Vec<String>,
    },
    CrewRecycled {
        flight_id: String,
        pilots: Vec<String>,
    },
    PilotAssigned {
        person_id: String,
        flight_id: Option<String>,
    },
    LicenseToggled {
        person_id: String,
        license: String,
        granted: bool,
    },
    ClockAdvanced {
        now: NaiveDateTime,
        landed: usize,
        failed: usize,
    },
}

impl FlightEvent {
    pub fn name(&self) -> &'static str {
        match self {
            FlightEvent::Offered { .. } => "offered",
            FlightEvent::TookOff { .. } => "took_off",
            FlightEvent::Landed { .. } => "landed",
            FlightEvent::Retired { .. } => "retired",
            FlightEvent::Boarded { .. } => "boarded",
            FlightEvent::Disembarked { .. } => "disembarked",
            FlightEvent::CrewRecycled { .. } => "crew_recycled",
            FlightEvent::PilotAssigned { .. } => "pilot_assigned",
            FlightEvent::LicenseToggled { .. } => "license_toggled",
            FlightEvent::ClockAdvanced { .. } => "clock_advanced",
        }
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub emitted_at: i64,
    #[serde(flatten)]
    pub event: FlightEvent,
}

impl EventEnvelope {
    pub fn new(event: FlightEvent) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            emitted_at: chrono::Utc::now().timestamp(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_flattens_event_tag() {
        let envelope = EventEnvelope::new(FlightEvent::Retired { flight_id: "FL1".into() });
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["event"], "retired");
        assert_eq!(json["flight_id"], "FL1");
        assert!(json["event_id"].is_string());

        let back: EventEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(back.event.name(), "retired");
    }
}
