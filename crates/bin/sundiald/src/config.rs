//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `sundial.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use serde::Deserialize;
use sundial_domain::location::GeoLocation;
use sundial_engine::runtime::EngineConfig;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine tuning.
    pub engine: EngineSection,
    /// Solar coordinates.
    pub location: LocationSection,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Worker pool and queue tuning.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Fixed worker pool size.
    pub workers: usize,
    /// Seconds between queuer scan passes.
    pub scan_interval_secs: u64,
    /// Capacity of the producers-to-dispatcher channel.
    pub dispatch_queue: usize,
    /// Capacity of each worker's private queue.
    pub worker_queue: usize,
    /// Bound on each task join during shutdown, in seconds.
    pub shutdown_timeout_secs: u64,
}

/// Latitude/longitude used for sunrise and sunset schedules.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LocationSection {
    pub latitude: f64,
    pub longitude: f64,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Configuration loading and validation failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration file")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration file")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Config {
    /// Load configuration from `sundial.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if
    /// a value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("sundial.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SUNDIAL_WORKERS")
            && let Ok(workers) = val.parse()
        {
            self.engine.workers = workers;
        }
        if let Ok(val) = std::env::var("SUNDIAL_SCAN_INTERVAL_SECS")
            && let Ok(secs) = val.parse()
        {
            self.engine.scan_interval_secs = secs;
        }
        if let Ok(val) = std::env::var("SUNDIAL_LATITUDE")
            && let Ok(latitude) = val.parse()
        {
            self.location.latitude = latitude;
        }
        if let Ok(val) = std::env::var("SUNDIAL_LONGITUDE")
            && let Ok(longitude) = val.parse()
        {
            self.location.longitude = longitude;
        }
        if let Ok(val) = std::env::var("SUNDIAL_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("SUNDIAL_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.geo_location()?;
        self.engine_config()
            .validate()
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        Ok(())
    }

    /// Validated coordinates for solar schedules.
    ///
    /// # Errors
    ///
    /// Returns a validation error for out-of-range coordinates.
    pub fn geo_location(&self) -> Result<GeoLocation, ConfigError> {
        GeoLocation::new(self.location.latitude, self.location.longitude)
            .map_err(|err| ConfigError::Validation(err.to_string()))
    }

    /// The engine configuration derived from this file.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            workers: self.engine.workers,
            scan_interval: std::time::Duration::from_secs(self.engine.scan_interval_secs),
            dispatch_queue: self.engine.dispatch_queue,
            worker_queue: self.engine.worker_queue,
            location: GeoLocation::new(self.location.latitude, self.location.longitude)
                .unwrap_or_default(),
            shutdown_timeout: std::time::Duration::from_secs(self.engine.shutdown_timeout_secs),
        }
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            workers: 4,
            scan_interval_secs: 2,
            dispatch_queue: 64,
            worker_queue: 16,
            shutdown_timeout_secs: 5,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:sundial.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "sundiald=info,sundial=info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn should_use_defaults_when_file_missing() {
        let config = Config::default();
        assert_eq!(config.engine.workers, 4);
        assert_eq!(config.engine.scan_interval_secs, 2);
        assert_eq!(config.database.url, "sqlite:sundial.db?mode=rwc");
    }

    #[test]
    fn should_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [engine]
            workers = 8

            [location]
            latitude = 48.85
            longitude = 2.35
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.workers, 8);
        assert_eq!(config.engine.scan_interval_secs, 2);
        assert!((config.location.latitude - 48.85).abs() < f64::EPSILON);
    }

    #[test]
    fn should_reject_out_of_range_coordinates() {
        let config: Config = toml::from_str(
            r"
            [location]
            latitude = 95.0
            longitude = 0.0
            ",
        )
        .unwrap();
        assert!(config.geo_location().is_err());
    }

    #[test]
    fn should_build_engine_config_from_sections() {
        let config = Config::default();
        let engine = config.engine_config();
        assert_eq!(engine.workers, 4);
        assert_eq!(engine.scan_interval, std::time::Duration::from_secs(2));
        assert!(engine.validate().is_ok());
    }
}
