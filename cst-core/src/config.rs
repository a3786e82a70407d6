//! Simulation parameters
//!
//! Every field has a default so a partial settings file is enough.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SimulationConfig {
    pub flight: FlightConfig,
    pub drift: DriftConfig,
}

/// Altitude profile parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    /// m/s
    pub climb_rate: f64,
    /// m; crossing it marks apogee, climbing continues
    pub target_altitude: f64,
    /// m/s, used once descent is commanded
    pub descent_rate: f64,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            climb_rate: 10.0,
            target_altitude: 100.0,
            descent_rate: 6.0,
        }
    }
}

/// GPS random walk parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    pub reference_latitude: f64,
    pub reference_longitude: f64,
    /// Upper bound of a single step, m
    pub max_step: f64,
    /// Radius the walk never leaves, m. Keep it to tens of meters:
    /// the flat-earth conversion is not valid further out.
    pub max_radius: f64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            reference_latitude: 40.4168,
            reference_longitude: -3.7038,
            max_step: 1.5,
            max_radius: 25.0,
        }
    }
}
