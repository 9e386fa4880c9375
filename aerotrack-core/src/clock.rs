use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{CoreError, CoreResult};

/// A point in simulated time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimTime(pub NaiveDateTime);

impl SimTime {
    pub fn new(at: NaiveDateTime) -> Self {
        Self(at)
    }

    /// Parse an operator supplied time.
    ///
    /// Accepts full timestamps (`2025-03-01T10:00`, `2025-03-01 10:00:00`) or a
    /// bare time of day (`10:00`), which is placed on `reference`'s date.
    pub fn parse(raw: &str, reference: SimTime) -> CoreResult<Self> {
        let raw = raw.trim();
        for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
            if let Ok(at) = NaiveDateTime::parse_from_str(raw, format) {
                return Ok(Self(at));
            }
        }
        for format in ["%H:%M:%S", "%H:%M"] {
            if let Ok(time) = NaiveTime::parse_from_str(raw, format) {
                return Ok(Self(reference.date().and_time(time)));
            }
        }
        Err(CoreError::Validation(format!("cannot parse time '{}'", raw)))
    }

    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }

    /// `self + delta`, or a Validation error when the result leaves the
    /// representable calendar.
    pub fn plus(self, delta: Duration) -> CoreResult<Self> {
        self.0
            .checked_add_signed(delta)
            .map(Self)
            .ok_or_else(|| CoreError::Validation(format!("{} plus {} is out of range", self, delta)))
    }

    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M"))
    }
}

/// Explicit simulation clock. Passed into each cycle, never global.
#[derive(Debug, Clone, Serialize)]
pub struct SimClock {
    now: SimTime,
    #[serde(skip)]
    tick: Duration,
    cycles: u64,
}

impl SimClock {
    pub fn new(start: SimTime, tick: Duration) -> Self {
        Self {
            now: start,
            tick,
            cycles: 0,
        }
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Advance by one tick and return the new time. On overflow the clock
    /// stays where it was.
    pub fn advance(&mut self) -> CoreResult<SimTime> {
        self.now = self.now.plus(self.tick)?;
        self.cycles += 1;
        tracing::debug!("Simulation clock advanced to {} (cycle {})", self.now, self.cycles);
        Ok(self.now)
    }
}
