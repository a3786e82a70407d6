//! Mode controller
//!
//! Decides, per operating mode, which source owns each sensor block. Each mode
//! variant carries the run state it needs, so a synthesizer only exists while
//! a synthesizing mode is active. Everything here is synchronous; the engine
//! serializes calls under its lock and does the scheduling.

use cst_adapters::frames::{full_frame_blocks, inertial_block};
use cst_adapters::{DriftState, FlightPhase, Synthesizer};
use cst_core::config::SimulationConfig;
use cst_core::error::EngineError;
use cst_core::ingress::IngressEvent;
use cst_core::mode::{ModeOptions, OperatingMode};
use cst_core::model::{BlockUpdate, SensorSnapshot};
use rand::Rng;
use tracing::warn;

/// Active mode and its run state
pub enum ModeState {
    Idle,
    Simulation(Synthesizer),
    LiveHardware,
    HybridUnitTest(Synthesizer),
    Normal(Synthesizer),
}

impl ModeState {
    pub fn mode(&self) -> OperatingMode {
        match self {
            ModeState::Idle => OperatingMode::Idle,
            ModeState::Simulation(_) => OperatingMode::Simulation,
            ModeState::LiveHardware => OperatingMode::LiveHardware,
            ModeState::HybridUnitTest(_) => OperatingMode::HybridUnitTest,
            ModeState::Normal(_) => OperatingMode::Normal,
        }
    }

    fn synthesizer(&self) -> Option<&Synthesizer> {
        match self {
            ModeState::Simulation(s) | ModeState::HybridUnitTest(s) | ModeState::Normal(s) => {
                Some(s)
            }
            ModeState::Idle | ModeState::LiveHardware => None,
        }
    }

    fn synthesizer_mut(&mut self) -> Option<&mut Synthesizer> {
        match self {
            ModeState::Simulation(s) | ModeState::HybridUnitTest(s) | ModeState::Normal(s) => {
                Some(s)
            }
            ModeState::Idle | ModeState::LiveHardware => None,
        }
    }
}

pub struct ModeController {
    config: SimulationConfig,
    state: ModeState,
    drift: DriftState,
}

impl ModeController {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            state: ModeState::Idle,
            drift: DriftState::Uninitialized,
        }
    }

    pub fn mode(&self) -> OperatingMode {
        self.state.mode()
    }

    pub fn drift(&self) -> DriftState {
        self.drift
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Phase of the running flight profile, if any
    pub fn flight_phase(&self) -> Option<FlightPhase> {
        self.state.synthesizer().map(|s| s.flight().phase())
    }

    /// Configuration for one run: the base config with `options` applied
    fn run_config(&self, options: ModeOptions) -> SimulationConfig {
        let mut config = self.config.clone();
        if let Some(rate) = options.climb_rate {
            if rate.is_finite() && rate > 0.0 {
                config.flight.climb_rate = rate;
            } else {
                warn!("Ignoring climb_rate override {}", rate);
            }
        }
        if let Some(target) = options.target_altitude {
            if target.is_finite() && target > 0.0 {
                config.flight.target_altitude = target;
            } else {
                warn!("Ignoring target_altitude override {}", target);
            }
        }
        config
    }

    /// Switch to `mode`. The caller performs stop cleanup first when leaving
    /// a non-idle mode.
    pub fn enter(&mut self, mode: OperatingMode, options: ModeOptions) {
        let config = self.run_config(options);
        if mode.synthesizes() {
            self.drift = DriftState::REFERENCE;
        }
        self.state = match mode {
            OperatingMode::Idle => ModeState::Idle,
            OperatingMode::Simulation => ModeState::Simulation(Synthesizer::new(&config)),
            OperatingMode::LiveHardware => ModeState::LiveHardware,
            OperatingMode::HybridUnitTest => ModeState::HybridUnitTest(Synthesizer::new(&config)),
            OperatingMode::Normal => ModeState::Normal(Synthesizer::new(&config)),
        };
    }

    /// Return to idle.
    ///
    /// Barometric and GPS altitude go to zero, the drift walk goes back to the
    /// reference point, everything else keeps its last value.
    pub fn stop(&mut self, snapshot: &SensorSnapshot) -> Vec<BlockUpdate> {
        self.state = ModeState::Idle;
        self.drift = DriftState::REFERENCE;

        let mut barometric = (*snapshot.sensors.barometric).clone();
        barometric.altitude = barometric.altitude.with_value(0.0);
        let mut gps = (*snapshot.sensors.gps).clone();
        gps.altitude = gps.altitude.with_value(0.0);

        vec![BlockUpdate::Barometric(barometric), BlockUpdate::Gps(gps)]
    }

    /// Synthesis tick. Empty when the mode has no synthesis loop.
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<BlockUpdate> {
        let with_inertial = match self.state {
            ModeState::Simulation(_) => true,
            ModeState::HybridUnitTest(_) | ModeState::Normal(_) => false,
            ModeState::Idle | ModeState::LiveHardware => return Vec::new(),
        };
        let drift = self.drift;
        let Some(synth) = self.state.synthesizer_mut() else {
            return Vec::new();
        };
        let (updates, drift) = synth.tick(drift, with_inertial, rng);
        self.drift = drift;
        updates
    }

    /// Blocks a hardware frame replaces in the current mode
    pub fn on_frame(&self, event: &IngressEvent) -> Vec<BlockUpdate> {
        match (&self.state, event) {
            (_, IngressEvent::Status { .. }) => Vec::new(),

            (ModeState::LiveHardware, IngressEvent::Full(frame)) => full_frame_blocks(frame),
            (ModeState::LiveHardware, IngressEvent::Inertial(frame)) => {
                vec![BlockUpdate::Inertial(inertial_block(frame))]
            }

            // Hardware IMU, synthesized everything else
            (
                ModeState::HybridUnitTest(_) | ModeState::Normal(_),
                IngressEvent::Inertial(frame),
            ) => vec![BlockUpdate::Inertial(inertial_block(frame))],
            (ModeState::HybridUnitTest(_) | ModeState::Normal(_), IngressEvent::Full(frame)) => {
                vec![BlockUpdate::Inertial(inertial_block(&frame.inertial))]
            }

            (ModeState::Idle | ModeState::Simulation(_), _) => Vec::new(),
        }
    }

    /// Start the descent leg of the running flight profile
    pub fn begin_descent(&mut self) -> Result<(), EngineError> {
        let mode = self.mode();
        match self.state.synthesizer_mut() {
            Some(synth) => {
                synth.begin_descent();
                Ok(())
            }
            None => Err(EngineError::NoFlightProfile(mode)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cst_core::ingress::{FullFrame, InertialFrame, Vector3};
    use cst_core::model::SensorKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn imu_frame() -> IngressEvent {
        IngressEvent::Inertial(InertialFrame {
            accelerometer: Vector3::new(0.0, 0.0, -1.0),
            gyroscope: Vector3::new(1.0, 2.0, 3.0),
        })
    }

    #[test]
    fn test_starts_idle() {
        let controller = ModeController::new(SimulationConfig::default());
        assert_eq!(controller.mode(), OperatingMode::Idle);
        assert_eq!(controller.drift(), DriftState::Uninitialized);
        assert_eq!(controller.flight_phase(), None);
    }

    #[test]
    fn test_simulation_tick_produces_every_block() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut controller = ModeController::new(SimulationConfig::default());
        controller.enter(OperatingMode::Simulation, ModeOptions::default());
        assert_eq!(controller.drift(), DriftState::REFERENCE);

        let updates = controller.tick(&mut rng);
        assert_eq!(updates.len(), SensorKind::ALL.len());
        assert!(matches!(controller.drift(), DriftState::At(_)));
        assert_eq!(controller.flight_phase(), Some(FlightPhase::Ascent));
    }

    #[test]
    fn test_hybrid_tick_skips_inertial_and_frame_replaces_only_inertial() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut controller = ModeController::new(SimulationConfig::default());
        controller.enter(OperatingMode::HybridUnitTest, ModeOptions::default());

        let before = SensorSnapshot::at_rest().with_updates(controller.tick(&mut rng));
        let after = before.with_updates(controller.on_frame(&imu_frame()));

        assert!(!after.shares_block(&before, SensorKind::Inertial));
        for kind in [
            SensorKind::Barometric,
            SensorKind::Gps,
            SensorKind::AirQuality,
            SensorKind::Environmental,
        ] {
            assert!(after.shares_block(&before, kind), "{} was replaced", kind);
        }
        assert_eq!(after.sensors.inertial.gyroscope.values(), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_normal_takes_only_inertial_from_full_frames() {
        let mut controller = ModeController::new(SimulationConfig::default());
        controller.enter(OperatingMode::Normal, ModeOptions::default());

        let updates = controller.on_frame(&IngressEvent::Full(FullFrame::default()));
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].kind(), SensorKind::Inertial);
    }

    #[test]
    fn test_live_hardware_full_frame_replaces_everything() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut controller = ModeController::new(SimulationConfig::default());
        controller.enter(OperatingMode::LiveHardware, ModeOptions::default());

        assert!(controller.tick(&mut rng).is_empty());
        let updates = controller.on_frame(&IngressEvent::Full(FullFrame::default()));
        assert_eq!(updates.len(), SensorKind::ALL.len());
    }

    #[test]
    fn test_frames_ignored_when_not_listening() {
        let mut controller = ModeController::new(SimulationConfig::default());
        assert!(controller.on_frame(&imu_frame()).is_empty());

        controller.enter(OperatingMode::Simulation, ModeOptions::default());
        assert!(controller.on_frame(&imu_frame()).is_empty());
        assert!(controller
            .on_frame(&IngressEvent::Status { connected: true })
            .is_empty());
    }

    #[test]
    fn test_stop_zeroes_altitude_and_is_idempotent() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut controller = ModeController::new(SimulationConfig::default());
        controller.enter(OperatingMode::Simulation, ModeOptions::default());

        let mut snapshot = SensorSnapshot::at_rest();
        for _ in 0..40 {
            snapshot = snapshot.with_updates(controller.tick(&mut rng));
        }
        assert!(snapshot.altitude() > 0.0);
        let co2 = snapshot.sensors.air_quality.co2;

        let stopped = snapshot.with_updates(controller.stop(&snapshot));
        assert_eq!(controller.mode(), OperatingMode::Idle);
        assert_eq!(controller.drift(), DriftState::REFERENCE);
        assert_eq!(stopped.altitude(), 0.0);
        assert_eq!(stopped.sensors.gps.altitude.value, 0.0);
        // Other values are left as they were
        assert_eq!(stopped.sensors.gps.latitude, snapshot.sensors.gps.latitude);
        assert_eq!(stopped.sensors.air_quality.co2, co2);
        assert!(stopped.shares_block(&snapshot, SensorKind::Inertial));

        let again = stopped.with_updates(controller.stop(&stopped));
        assert_eq!(controller.mode(), OperatingMode::Idle);
        assert_eq!(again.altitude(), 0.0);
        assert_eq!(again.sensors.gps, stopped.sensors.gps);
    }

    #[test]
    fn test_mode_options_apply_to_one_run() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut controller = ModeController::new(SimulationConfig::default());
        controller.enter(
            OperatingMode::Simulation,
            ModeOptions {
                climb_rate: Some(2.0),
                target_altitude: Some(5.0),
            },
        );

        let mut snapshot = SensorSnapshot::at_rest();
        for _ in 0..20 {
            snapshot = snapshot.with_updates(controller.tick(&mut rng));
        }
        // 1 s at 2 m/s
        assert!((snapshot.altitude() - 2.0).abs() < 1e-9);

        controller.stop(&snapshot);
        controller.enter(OperatingMode::Simulation, ModeOptions::default());
        let snapshot = SensorSnapshot::at_rest().with_updates(controller.tick(&mut rng));
        assert!((snapshot.altitude() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_options_fall_back_to_config() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut controller = ModeController::new(SimulationConfig::default());
        controller.enter(
            OperatingMode::Simulation,
            ModeOptions {
                climb_rate: Some(-3.0),
                target_altitude: Some(f64::NAN),
            },
        );
        let snapshot = SensorSnapshot::at_rest().with_updates(controller.tick(&mut rng));
        assert!((snapshot.altitude() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_begin_descent_needs_a_flight_profile() {
        let mut controller = ModeController::new(SimulationConfig::default());
        assert_eq!(
            controller.begin_descent(),
            Err(EngineError::NoFlightProfile(OperatingMode::Idle))
        );

        controller.enter(OperatingMode::LiveHardware, ModeOptions::default());
        assert_eq!(
            controller.begin_descent(),
            Err(EngineError::NoFlightProfile(OperatingMode::LiveHardware))
        );

        controller.enter(OperatingMode::Normal, ModeOptions::default());
        assert_eq!(controller.begin_descent(), Ok(()));
        assert_eq!(controller.flight_phase(), Some(FlightPhase::Descent));
    }
}
