use aerotrack_core::{CoreError, CoreResult, SimTime};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Postgres URL. Without one the in-memory store is used.
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            run_migrations: false,
        }
    }
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Initial simulated time, `YYYY-MM-DDTHH:MM:SS`.
    pub start: String,
    pub tick_minutes: i64,
    #[serde(default = "default_turnaround")]
    pub turnaround_minutes: i64,
    #[serde(default = "default_cockpit_capacity")]
    pub cockpit_capacity: usize,
    #[serde(default = "default_store_timeout")]
    pub store_timeout_ms: u64,
    /// Run a cycle every N real seconds. Off when absent.
    pub auto_cycle_seconds: Option<u64>,
}

fn default_turnaround() -> i64 { 60 }
fn default_cockpit_capacity() -> usize { 2 }
fn default_store_timeout() -> u64 { 3000 }

impl SimulationConfig {
    pub fn start_time(&self) -> CoreResult<SimTime> {
        NaiveDateTime::parse_from_str(&self.start, "%Y-%m-%dT%H:%M:%S")
            .map(SimTime::new)
            .map_err(|e| CoreError::Validation(format!("simulation.start '{}': {}", self.start, e)))
    }

    pub fn tick(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.tick_minutes)
    }

    pub fn turnaround(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.turnaround_minutes)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// The clock must move forward each cycle and landings cannot finish in
    /// the past.
    pub fn validate(&self) -> CoreResult<()> {
        if self.tick_minutes <= 0 {
            return Err(CoreError::Validation(format!(
                "simulation.tick_minutes must be positive, got {}",
                self.tick_minutes
            )));
        }
        if self.turnaround_minutes < 0 {
            return Err(CoreError::Validation(format!(
                "simulation.turnaround_minutes must not be negative, got {}",
                self.turnaround_minutes
            )));
        }
        if self.store_timeout_ms == 0 {
            return Err(CoreError::Validation("simulation.store_timeout_ms must be positive".into()));
        }
        self.start_time().map(|_| ())
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `AEROTRACK_SIMULATION__TICK_MINUTES=15`
            .add_source(config::Environment::with_prefix("AEROTRACK").separator("__"))
            .build()?;

        s.try_deserialize::<Self>()?.validated()
    }

    pub fn from_toml(raw: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()?
            .try_deserialize::<Self>()?
            .validated()
    }

    fn validated(self) -> Result<Self, config::ConfigError> {
        self.simulation
            .validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_optional_sections() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 8800

            [simulation]
            start = "2025-03-01T06:00:00"
            tick_minutes = 30
            "#,
        )
        .expect("config parses");

        assert!(config.database.url.is_none());
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.simulation.turnaround_minutes, 60);
        assert_eq!(config.simulation.cockpit_capacity, 2);
        assert_eq!(config.simulation.store_timeout(), Duration::from_millis(3000));
        assert_eq!(config.simulation.start_time().unwrap().to_string(), "2025-03-01 06:00");
    }

    #[test]
    fn test_bad_start_time_is_validation_error() {
        let sim = SimulationConfig {
            start: "yesterday".into(),
            tick_minutes: 30,
            turnaround_minutes: 60,
            cockpit_capacity: 2,
            store_timeout_ms: 100,
            auto_cycle_seconds: None,
        };
        assert!(matches!(sim.start_time(), Err(CoreError::Validation(_))));
    }

    fn sim(tick_minutes: i64, turnaround_minutes: i64) -> SimulationConfig {
        SimulationConfig {
            start: "2025-03-01T06:00:00".into(),
            tick_minutes,
            turnaround_minutes,
            cockpit_capacity: 2,
            store_timeout_ms: 100,
            auto_cycle_seconds: None,
        }
    }

    #[test]
    fn test_non_positive_tick_is_rejected() {
        assert!(matches!(sim(0, 60).validate(), Err(CoreError::Validation(_))));
        assert!(matches!(sim(-15, 60).validate(), Err(CoreError::Validation(_))));
        assert!(sim(1, 0).validate().is_ok());
    }

    #[test]
    fn test_negative_turnaround_is_rejected() {
        assert!(matches!(sim(30, -1).validate(), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_loading_rejects_invalid_simulation_section() {
        let err = Config::from_toml(
            r#"
            [server]
            port = 8800

            [simulation]
            start = "2025-03-01T06:00:00"
            tick_minutes = 0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("tick_minutes"));

        let err = Config::from_toml(
            r#"
            [server]
            port = 8800

            [simulation]
            start = "2025-03-01T06:00:00"
            tick_minutes = 30
            turnaround_minutes = -5
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("turnaround_minutes"));
    }
}
