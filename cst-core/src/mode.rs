//! Operating modes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Data-provenance policy currently governing the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    /// Nothing feeds the snapshot; last-known values stay visible
    #[default]
    Idle,
    /// Every block synthesized by the flight model at 20 Hz
    Simulation,
    /// Every block taken from hardware frames
    LiveHardware,
    /// Hardware IMU, synthesized ancillary sensors, inertial-only session
    HybridUnitTest,
    /// Hardware IMU, synthesized ancillary sensors, full session.
    /// Kept for relays that only speak full frames.
    Normal,
}

impl OperatingMode {
    /// Whether a synthesis loop runs in this mode
    pub fn synthesizes(&self) -> bool {
        matches!(
            self,
            OperatingMode::Simulation | OperatingMode::HybridUnitTest | OperatingMode::Normal
        )
    }

    /// Hardware session this mode needs, if any
    pub fn ingress_scope(&self) -> Option<crate::ingress::IngressScope> {
        use crate::ingress::IngressScope;
        match self {
            OperatingMode::Idle | OperatingMode::Simulation => None,
            OperatingMode::LiveHardware | OperatingMode::Normal => Some(IngressScope::Full),
            OperatingMode::HybridUnitTest => Some(IngressScope::Inertial),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingMode::Idle => "idle",
            OperatingMode::Simulation => "simulation",
            OperatingMode::LiveHardware => "live_hardware",
            OperatingMode::HybridUnitTest => "hybrid_unit_test",
            OperatingMode::Normal => "normal",
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-run overrides accepted by `start_mode`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModeOptions {
    /// Climb rate in m/s
    #[serde(default)]
    pub climb_rate: Option<f64>,
    /// Target altitude in m
    #[serde(default)]
    pub target_altitude: Option<f64>,
}
