//! Runtime settings for the server binary.
//!
//! Settings are layered: built-in defaults, then an optional
//! `skillnest.toml`, then `SKILLNEST__SECTION__KEY` environment variables.
//! A bare `PORT` variable overrides the bind port last. The result is loaded
//! once at startup and passed down explicitly.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

/// Configuration file consulted by [`Settings::load`] when present.
pub const DEFAULT_CONFIG_FILE: &str = "skillnest.toml";

const ENV_PREFIX: &str = "SKILLNEST";
const ENV_SEPARATOR: &str = "__";
const PORT_VARIABLE: &str = "PORT";

/// Errors raised while assembling [`Settings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A source could not be read or deserialised.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// The `.env` file exists but could not be parsed.
    #[error("failed to read .env file: {0}")]
    DotEnv(#[from] dotenvy::Error),

    /// The sources parsed but describe an unusable setup.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Storage implementation selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local store; state is lost on restart.
    Memory,
    /// `PostgreSQL` through a pooled Diesel connection.
    Postgres,
}

/// Top-level settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// HTTP listener settings.
    pub server: ServerSettings,
    /// Storage backend settings.
    pub storage: StorageSettings,
    /// Background reconciliation settings.
    pub reconciliation: ReconciliationSettings,
    /// Log output settings.
    pub logging: LoggingSettings,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Address the server binds to.
    pub bind_address: SocketAddr,
}

/// Storage backend settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Which store to build.
    pub backend: StorageBackend,
    /// Connection URL, required for `postgres`.
    pub database_url: Option<String>,
    /// Maximum pooled connections.
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection before failing transiently.
    pub acquire_timeout_secs: u64,
    /// Apply embedded migrations on startup.
    pub run_migrations: bool,
}

impl StorageSettings {
    /// Returns the connection acquisition timeout.
    #[must_use]
    pub const fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

/// Background reconciliation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconciliationSettings {
    /// Seconds between sweeps; zero disables the sweeper.
    pub interval_secs: u64,
}

impl ReconciliationSettings {
    /// Returns the sweep interval, or `None` when sweeping is disabled.
    #[must_use]
    pub const fn interval(&self) -> Option<Duration> {
        if self.interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.interval_secs))
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Settings {
    /// Loads `.env`, then settings from [`DEFAULT_CONFIG_FILE`] and the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when a source is malformed or the combined
    /// settings are invalid.
    pub fn load() -> Result<Self, SettingsError> {
        load_dotenv()?;
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_sources(Some(Path::new(DEFAULT_CONFIG_FILE)), vars)
    }

    /// Builds settings from an optional file and an explicit variable map.
    ///
    /// A missing file is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when a source is malformed or the combined
    /// settings are invalid.
    pub fn from_sources(
        config_file: Option<&Path>,
        vars: HashMap<String, String>,
    ) -> Result<Self, SettingsError> {
        let port = vars.get(PORT_VARIABLE).cloned();
        let mut builder = Config::builder()
            .set_default("server.bind_address", "0.0.0.0:5000")?
            .set_default("storage.backend", "memory")?
            .set_default("storage.max_connections", 10)?
            .set_default("storage.acquire_timeout_secs", 5)?
            .set_default("storage.run_migrations", true)?
            .set_default("reconciliation.interval_secs", 0)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?;
        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(false));
        }
        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true)
                    .source(Some(vars)),
            )
            .build()?;

        let mut settings: Self = config.try_deserialize()?;
        if let Some(raw) = port {
            let parsed = raw
                .trim()
                .parse::<u16>()
                .map_err(|_| SettingsError::Invalid(format!("PORT is not a port number: {raw}")))?;
            settings.server.bind_address.set_port(parsed);
        }
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        let storage = &self.storage;
        if storage.backend == StorageBackend::Postgres
            && storage
                .database_url
                .as_deref()
                .is_none_or(|url| url.trim().is_empty())
        {
            return Err(SettingsError::Invalid(
                "storage.database_url is required for the postgres backend".to_owned(),
            ));
        }
        if storage.max_connections == 0 {
            return Err(SettingsError::Invalid(
                "storage.max_connections must be positive".to_owned(),
            ));
        }
        if storage.acquire_timeout_secs == 0 {
            return Err(SettingsError::Invalid(
                "storage.acquire_timeout_secs must be positive".to_owned(),
            ));
        }
        Ok(())
    }
}

fn load_dotenv() -> Result<(), SettingsError> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(err.into()),
    }
}
