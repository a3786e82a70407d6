//! Hardware ingress contract
//!
//! The transport relay is an external collaborator. The engine only needs
//! three kinds of events from it, already parsed into floats, and a way to
//! acquire and release a hardware session.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

/// 3-axis sample as delivered by the relay
pub type Vector3 = nalgebra::Vector3<f64>;

/// IMU sample: accelerometer in g, gyroscope in °/s
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InertialFrame {
    pub accelerometer: Vector3,
    pub gyroscope: Vector3,
}

impl Default for InertialFrame {
    fn default() -> Self {
        Self {
            accelerometer: Vector3::zeros(),
            gyroscope: Vector3::zeros(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BarometricFrame {
    pub temperature: f64,
    pub pressure: f64,
    pub altitude: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GpsFrame {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub satellites: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AirQualityFrame {
    pub co2: f64,
    pub temperature: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnvironmentalFrame {
    pub temperature: f64,
    pub humidity: f64,
    pub uv_index: f64,
}

/// Every sensor at once. Fields absent on the wire are 0.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FullFrame {
    pub barometric: BarometricFrame,
    pub gps: GpsFrame,
    pub inertial: InertialFrame,
    pub air_quality: AirQualityFrame,
    pub environmental: EnvironmentalFrame,
}

/// Something the relay told us
#[derive(Debug, Clone, PartialEq)]
pub enum IngressEvent {
    Status { connected: bool },
    Inertial(InertialFrame),
    Full(FullFrame),
}

/// Which frames a hardware session should carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngressScope {
    /// IMU frames only
    Inertial,
    /// Full frames (and IMU frames if the relay sends them)
    Full,
}

/// An open hardware session.
///
/// Dropping it releases the session on the link side.
pub struct IngressSubscription {
    events: mpsc::UnboundedReceiver<IngressEvent>,
    _release: DropGuard,
}

impl IngressSubscription {
    /// `release` is cancelled when the subscription is dropped
    pub fn new(events: mpsc::UnboundedReceiver<IngressEvent>, release: CancellationToken) -> Self {
        Self {
            events,
            _release: release.drop_guard(),
        }
    }

    /// Next event, or None once the link side has gone away
    pub async fn recv(&mut self) -> Option<IngressEvent> {
        self.events.recv().await
    }
}

/// Transport to the hardware relay
///
/// Implementations must return immediately from `open`; connecting and
/// reading happen in the background and are reported as events.
pub trait HardwareLink: Send + Sync {
    /// Get the name of this link (e.g. "tcp-relay")
    fn name(&self) -> &str;

    /// Request a hardware session
    fn open(&self, scope: IngressScope) -> Result<IngressSubscription>;
}
