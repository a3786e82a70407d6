//! CanSat Telemetry Core Library
//!
//! This crate provides the sensor snapshot model, operating modes and the
//! hardware ingress contract shared by the synthesis engine and its adapters.

pub mod config;
pub mod error;
pub mod ingress;
pub mod mode;
pub mod model;
pub mod units;

pub use config::SimulationConfig;
pub use error::{EngineError, FrameError};
pub use ingress::{HardwareLink, IngressEvent, IngressScope, IngressSubscription};
pub use mode::{ModeOptions, OperatingMode};
pub use model::{BlockUpdate, SensorKind, SensorMask, SensorSnapshot};
