//! Server settings
//!
//! Layered, later sources win:
//! 1. `config/cst.toml` in the working directory
//! 2. `cst/cst.toml` in the user config directory
//! 3. `CST__`-prefixed environment variables (`CST__SERVER__PORT=9201`)
//!
//! Every key is optional. Out-of-range simulation values fall back to their
//! defaults with a warning.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use cst_core::config::{DriftConfig, FlightConfig, SimulationConfig};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub relay: RelaySettings,
    /// Filter used when `RUST_LOG` is not set
    pub log_level: String,
    pub simulation: SimulationConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            relay: RelaySettings::default(),
            log_level: "info".to_string(),
            simulation: SimulationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9200,
        }
    }
}

impl ServerSettings {
    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// host:port of the serial relay
    pub address: String,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:9300".to_string(),
        }
    }
}

impl Settings {
    /// Load from the standard locations
    pub fn load() -> Result<Self> {
        let user_file = dirs::config_dir().map(|dir| dir.join("cst").join("cst.toml"));
        Self::load_from(PathBuf::from("config/cst.toml"), user_file)
    }

    fn load_from(local: PathBuf, user: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder().add_source(File::from(local).required(false));

        if let Some(user) = user {
            builder = builder.add_source(File::from(user).required(false));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("CST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to read settings")?;

        let mut settings: Settings = config
            .try_deserialize()
            .context("failed to parse settings")?;
        settings.sanitize();
        Ok(settings)
    }

    /// Replace simulation values the models cannot run with by their defaults
    fn sanitize(&mut self) {
        let flight = FlightConfig::default();
        let drift = DriftConfig::default();
        let sim = &mut self.simulation;

        let positive = |v: f64| v.is_finite() && v > 0.0;
        fallback(
            "simulation.flight.climb_rate",
            &mut sim.flight.climb_rate,
            flight.climb_rate,
            positive,
        );
        fallback(
            "simulation.flight.target_altitude",
            &mut sim.flight.target_altitude,
            flight.target_altitude,
            positive,
        );
        fallback(
            "simulation.flight.descent_rate",
            &mut sim.flight.descent_rate,
            flight.descent_rate,
            positive,
        );
        fallback(
            "simulation.drift.max_step",
            &mut sim.drift.max_step,
            drift.max_step,
            |v| v.is_finite() && v >= 0.0,
        );
        fallback(
            "simulation.drift.max_radius",
            &mut sim.drift.max_radius,
            drift.max_radius,
            positive,
        );
        fallback(
            "simulation.drift.reference_latitude",
            &mut sim.drift.reference_latitude,
            drift.reference_latitude,
            |v| (-90.0..=90.0).contains(&v),
        );
        fallback(
            "simulation.drift.reference_longitude",
            &mut sim.drift.reference_longitude,
            drift.reference_longitude,
            |v| (-180.0..=180.0).contains(&v),
        );
    }
}

fn fallback(key: &str, value: &mut f64, default: f64, valid: impl Fn(f64) -> bool) {
    if !valid(*value) {
        warn!("Ignoring {} = {}, using {}", key, value, default);
        *value = default;
    }
}
