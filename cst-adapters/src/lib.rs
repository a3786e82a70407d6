//! Synthesis models and hardware links for CanSat Telemetry

pub mod drift;
pub mod flight;
pub mod frames;
pub mod loopback;
pub mod math;
pub mod relay;
pub mod synth;

pub use drift::{DriftModel, DriftState};
pub use flight::{FlightModel, FlightPhase, TICK_INTERVAL};
pub use loopback::LoopbackLink;
pub use relay::TcpRelayLink;
pub use synth::Synthesizer;
