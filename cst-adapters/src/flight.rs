//! Flight physics model
//!
//! Two independent parts advanced together once per tick:
//! - an altitude profile driven by elapsed simulated time
//! - an orientation integrator that low-pass filters a sinusoidal target
//!   angular velocity and integrates it into a clamped attitude
//!
//! Simulated time advances by exactly [`TICK_INTERVAL`] per tick. The
//! smoothing factor is tuned for that rate; changing one means re-tuning
//! the other.

use crate::math::{clamp, gaussian_noise, rotate_gravity};
use cst_core::config::FlightConfig;
use cst_core::ingress::Vector3;
use rand::Rng;
use serde::Serialize;
use std::f64::consts::TAU;
use std::time::Duration;

/// Synthesis cadence (20 Hz)
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

const TICK_SECONDS: f64 = 0.05;

/// Per-tick exponential smoothing of angular velocity toward its target
pub const SMOOTHING: f64 = 0.15;

/// Attitude envelope, degrees either side of level
pub const ANGLE_LIMIT_DEG: f64 = 15.0;

/// Gyroscope noise, σ in °/s
pub const GYRO_NOISE_DPS: f64 = 0.2;

/// Accelerometer noise, σ in g
pub const ACCEL_NOISE_G: f64 = 0.005;

/// Target angular velocity of one axis: `amplitude · sin(2π·frequency·t + phase)`
struct AxisWave {
    /// °/s
    amplitude: f64,
    /// Hz
    frequency: f64,
    /// rad
    phase: f64,
}

// Detuned so the three axes never line up periodically
const AXIS_WAVES: [AxisWave; 3] = [
    // roll
    AxisWave { amplitude: 9.0, frequency: 0.23, phase: 0.0 },
    // pitch
    AxisWave { amplitude: 7.0, frequency: 0.17, phase: 1.1 },
    // yaw
    AxisWave { amplitude: 11.0, frequency: 0.071, phase: 2.3 },
];

// =============================================================================
// Altitude profile
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightPhase {
    /// Climbing toward the target altitude
    Ascent,
    /// Target altitude crossed; still climbing until descent is commanded
    Apogee,
    /// Descending toward touchdown
    Descent,
}

/// Phase plus the anchors the altitude is computed from
#[derive(Debug, Clone, PartialEq)]
pub struct FlightProfile {
    pub phase: FlightPhase,
    /// m
    pub altitude_at_start: f64,
    /// Simulated seconds at which the current segment was anchored
    pub started_at: f64,
    climb_rate: f64,
    target_altitude: f64,
    descent_rate: f64,
}

/// What happened to the profile on an update
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProfileStep {
    Altitude(f64),
    /// Altitude came back to zero during descent
    Touchdown,
}

impl FlightProfile {
    /// A profile armed on the ground at `now`
    pub fn armed(config: &FlightConfig, now: f64) -> Self {
        Self {
            phase: FlightPhase::Ascent,
            altitude_at_start: 0.0,
            started_at: now,
            climb_rate: config.climb_rate,
            target_altitude: config.target_altitude,
            descent_rate: config.descent_rate,
        }
    }

    pub fn altitude_at(&self, now: f64) -> f64 {
        let dt = (now - self.started_at).max(0.0);
        match self.phase {
            FlightPhase::Ascent | FlightPhase::Apogee => self.altitude_at_start + self.climb_rate * dt,
            FlightPhase::Descent => (self.altitude_at_start - self.descent_rate * dt).max(0.0),
        }
    }

    /// Recompute altitude at `now` and apply phase transitions
    pub fn update(&mut self, now: f64) -> ProfileStep {
        let altitude = self.altitude_at(now);
        match self.phase {
            FlightPhase::Ascent if altitude >= self.target_altitude => {
                self.phase = FlightPhase::Apogee;
            }
            FlightPhase::Descent if altitude <= 0.0 => return ProfileStep::Touchdown,
            _ => {}
        }
        ProfileStep::Altitude(altitude)
    }

    /// Re-anchor at the current altitude and start descending
    pub fn begin_descent(&mut self, now: f64) {
        if self.phase == FlightPhase::Descent {
            return;
        }
        self.altitude_at_start = self.altitude_at(now);
        self.started_at = now;
        self.phase = FlightPhase::Descent;
    }
}

// =============================================================================
// Orientation integrator
// =============================================================================

/// Integrated attitude and filtered angular velocity per axis (roll, pitch, yaw)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AngularState {
    /// degrees
    pub position: [f64; 3],
    /// °/s
    pub velocity: [f64; 3],
}

impl AngularState {
    /// Advance one tick ending at simulated time `t`
    pub fn step(&mut self, t: f64, dt: f64) {
        for (axis, wave) in AXIS_WAVES.iter().enumerate() {
            let target = wave.amplitude * (TAU * wave.frequency * t + wave.phase).sin();
            self.velocity[axis] += SMOOTHING * (target - self.velocity[axis]);
            self.position[axis] = clamp(
                self.position[axis] + self.velocity[axis] * dt,
                -ANGLE_LIMIT_DEG,
                ANGLE_LIMIT_DEG,
            );
        }
    }
}

// =============================================================================
// Combined model
// =============================================================================

/// One tick of synthesized flight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightSample {
    /// m above the launch point
    pub altitude: f64,
    pub phase: FlightPhase,
    /// roll, pitch, yaw in degrees
    pub orientation: [f64; 3],
    /// °/s, noisy
    pub gyroscope: Vector3,
    /// g, noisy
    pub accelerometer: Vector3,
}

pub struct FlightModel {
    config: FlightConfig,
    profile: FlightProfile,
    angular: AngularState,
    ticks: u64,
}

impl FlightModel {
    pub fn new(config: FlightConfig) -> Self {
        let profile = FlightProfile::armed(&config, 0.0);
        Self {
            config,
            profile,
            angular: AngularState::default(),
            ticks: 0,
        }
    }

    /// Simulated seconds since the model was created
    pub fn elapsed(&self) -> f64 {
        self.ticks as f64 * TICK_SECONDS
    }

    pub fn phase(&self) -> FlightPhase {
        self.profile.phase
    }

    pub fn profile(&self) -> &FlightProfile {
        &self.profile
    }

    pub fn angular(&self) -> &AngularState {
        &self.angular
    }

    pub fn altitude(&self) -> f64 {
        self.profile.altitude_at(self.elapsed())
    }

    pub fn begin_descent(&mut self) {
        let now = self.elapsed();
        self.profile.begin_descent(now);
    }

    /// Advance one tick and synthesize IMU readings
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> FlightSample {
        self.ticks += 1;
        let now = self.elapsed();

        let altitude = match self.profile.update(now) {
            ProfileStep::Altitude(altitude) => altitude,
            ProfileStep::Touchdown => {
                tracing::info!("Touchdown at t={:.2}s, restarting flight profile", now);
                self.profile = FlightProfile::armed(&self.config, now);
                self.angular = AngularState::default();
                0.0
            }
        };

        self.angular.step(now, TICK_SECONDS);
        let [roll, pitch, yaw] = self.angular.position;
        let velocity = self.angular.velocity;

        let gyroscope = Vector3::new(
            velocity[0] + GYRO_NOISE_DPS * gaussian_noise(rng),
            velocity[1] + GYRO_NOISE_DPS * gaussian_noise(rng),
            velocity[2] + GYRO_NOISE_DPS * gaussian_noise(rng),
        );

        let gravity = rotate_gravity(roll, pitch, yaw);
        let accelerometer = Vector3::new(
            gravity.x + ACCEL_NOISE_G * gaussian_noise(rng),
            gravity.y + ACCEL_NOISE_G * gaussian_noise(rng),
            gravity.z + ACCEL_NOISE_G * gaussian_noise(rng),
        );

        FlightSample {
            altitude,
            phase: self.profile.phase,
            orientation: self.angular.position,
            gyroscope,
            accelerometer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ticks_for(seconds: f64) -> usize {
        (seconds / TICK_SECONDS).round() as usize
    }

    #[test]
    fn test_tick_interval_matches_tick_seconds() {
        assert_eq!(TICK_INTERVAL.as_secs_f64(), TICK_SECONDS);
    }

    #[test]
    fn test_altitude_after_eight_seconds() {
        let mut model = FlightModel::new(FlightConfig::default());
        let mut rng = StdRng::seed_from_u64(1);
        let mut sample = None;
        for _ in 0..ticks_for(8.0) {
            sample = Some(model.tick(&mut rng));
        }
        let sample = sample.unwrap();
        assert!((sample.altitude - 80.0).abs() < 1e-6, "altitude {}", sample.altitude);
        assert_eq!(sample.phase, FlightPhase::Ascent);
        for angle in sample.orientation {
            assert!(angle.abs() <= ANGLE_LIMIT_DEG);
        }
    }

    #[test]
    fn test_climb_continues_past_target() {
        let mut model = FlightModel::new(FlightConfig::default());
        let mut rng = StdRng::seed_from_u64(2);
        let mut last = 0.0;
        for _ in 0..ticks_for(30.0) {
            let sample = model.tick(&mut rng);
            assert!(sample.altitude > last);
            last = sample.altitude;
        }
        assert!((last - 300.0).abs() < 1e-6);
        assert_eq!(model.phase(), FlightPhase::Apogee);
    }

    #[test]
    fn test_orientation_stays_clamped() {
        let mut model = FlightModel::new(FlightConfig::default());
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..ticks_for(600.0) {
            let sample = model.tick(&mut rng);
            for angle in sample.orientation {
                assert!(angle.abs() <= ANGLE_LIMIT_DEG, "angle {}", angle);
            }
        }
    }

    #[test]
    fn test_orientation_moves_smoothly() {
        // Filtered velocity bounds the per-tick change well below the clamp
        let mut model = FlightModel::new(FlightConfig::default());
        let mut rng = StdRng::seed_from_u64(4);
        let mut previous = [0.0; 3];
        for _ in 0..ticks_for(60.0) {
            let sample = model.tick(&mut rng);
            for axis in 0..3 {
                assert!((sample.orientation[axis] - previous[axis]).abs() < 1.0);
            }
            previous = sample.orientation;
        }
    }

    #[test]
    fn test_accelerometer_tracks_attitude() {
        let mut model = FlightModel::new(FlightConfig::default());
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..ticks_for(20.0) {
            let sample = model.tick(&mut rng);
            let [r, p, y] = sample.orientation;
            let g = rotate_gravity(r, p, y);
            // 10σ of accelerometer noise
            assert!((sample.accelerometer.x - g.x).abs() < 0.05);
            assert!((sample.accelerometer.y - g.y).abs() < 0.05);
            assert!((sample.accelerometer.z - g.z).abs() < 0.05);
        }
    }

    #[test]
    fn test_angular_velocity_is_low_pass_filtered() {
        let mut state = AngularState::default();
        state.step(1.0, TICK_SECONDS);
        let target = AXIS_WAVES[0].amplitude * (TAU * AXIS_WAVES[0].frequency * 1.0).sin();
        assert!((state.velocity[0] - SMOOTHING * target).abs() < 1e-12);
    }

    #[test]
    fn test_descent_then_touchdown_restarts_profile() {
        let config = FlightConfig {
            climb_rate: 10.0,
            target_altitude: 100.0,
            descent_rate: 20.0,
        };
        let mut model = FlightModel::new(config);
        let mut rng = StdRng::seed_from_u64(6);
        for _ in 0..ticks_for(5.0) {
            model.tick(&mut rng);
        }
        model.begin_descent();
        assert_eq!(model.phase(), FlightPhase::Descent);
        assert!((model.altitude() - 50.0).abs() < 1e-6);

        // 50 m at 20 m/s reaches the ground after 2.5 s
        let mut touched_down = false;
        for _ in 0..ticks_for(3.0) {
            let sample = model.tick(&mut rng);
            assert!(sample.altitude >= 0.0);
            if sample.altitude == 0.0 {
                touched_down = true;
                assert_eq!(sample.phase, FlightPhase::Ascent);
                break;
            }
        }
        assert!(touched_down);

        // Climbing again from the ground
        let sample = model.tick(&mut rng);
        assert_eq!(sample.phase, FlightPhase::Ascent);
        assert!((sample.altitude - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_begin_descent_is_idempotent() {
        let mut profile = FlightProfile::armed(&FlightConfig::default(), 0.0);
        profile.begin_descent(4.0);
        let anchored = profile.clone();
        profile.begin_descent(6.0);
        assert_eq!(profile, anchored);
    }

    #[test]
    fn test_profile_marks_apogee_at_target() {
        let mut profile = FlightProfile::armed(&FlightConfig::default(), 0.0);
        assert_eq!(profile.update(9.0), ProfileStep::Altitude(90.0));
        assert_eq!(profile.phase, FlightPhase::Ascent);
        profile.update(10.0);
        assert_eq!(profile.phase, FlightPhase::Apogee);
    }
}
