//! Synthetic sensor blocks for simulated flight
//!
//! Combines the flight model and the GPS drift walk into complete snapshot
//! blocks. The ancillary sensors (barometer, GPS, air quality, environmental)
//! follow the altitude profile with a little Gaussian noise; the inertial
//! block comes straight from the orientation integrator.

use crate::drift::{DriftModel, DriftState};
use crate::flight::{FlightModel, FlightSample};
use crate::math::{gaussian_noise, inclination_deg};
use cst_core::config::SimulationConfig;
use cst_core::model::*;
use cst_core::units::*;
use rand::Rng;

/// Sea-level pressure of the standard atmosphere, hPa
const SEA_LEVEL_PRESSURE: f64 = 1013.25;

/// Sea-level temperature of the standard atmosphere, °C
const SEA_LEVEL_TEMPERATURE: f64 = 15.0;

/// Tropospheric lapse rate, °C/m
const LAPSE_RATE: f64 = 0.0065;

/// Pressure at `altitude` meters (ISA troposphere)
pub fn isa_pressure(altitude: f64) -> f64 {
    SEA_LEVEL_PRESSURE * (1.0 - 2.25577e-5 * altitude).max(0.0).powf(5.25588)
}

/// Temperature at `altitude` meters (ISA troposphere)
pub fn isa_temperature(altitude: f64) -> f64 {
    SEA_LEVEL_TEMPERATURE - LAPSE_RATE * altitude
}

/// Value centered on `mean` with Gaussian spread `sigma`
fn noisy<R: Rng + ?Sized>(rng: &mut R, mean: f64, sigma: f64) -> f64 {
    mean + sigma * gaussian_noise(rng)
}

/// Inertial block for a synthesized flight tick
pub fn inertial_block(sample: &FlightSample) -> InertialBlock {
    let a = sample.accelerometer;
    let w = sample.gyroscope;
    let [roll, pitch, yaw] = sample.orientation;
    InertialBlock {
        accelerometer: Axes::new(a.x, a.y, a.z, Unit::StandardGravity),
        gyroscope: Axes::new(w.x, w.y, w.z, Unit::DegreesPerSecond),
        orientation: Attitude::from_degrees(roll, pitch, yaw),
        inclination: degrees(inclination_deg(a)),
    }
}

/// Produces every block of a simulated vehicle, one tick at a time
pub struct Synthesizer {
    flight: FlightModel,
    drift: DriftModel,
}

impl Synthesizer {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            flight: FlightModel::new(config.flight.clone()),
            drift: DriftModel::from_config(&config.drift),
        }
    }

    pub fn flight(&self) -> &FlightModel {
        &self.flight
    }

    pub fn drift_model(&self) -> &DriftModel {
        &self.drift
    }

    pub fn begin_descent(&mut self) {
        self.flight.begin_descent();
    }

    /// Advance one tick.
    ///
    /// `drift` is the walk position from the previous tick; the new position is
    /// returned alongside the blocks. The inertial block is only produced when
    /// `with_inertial` is set (hybrid modes take it from hardware instead).
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        drift: DriftState,
        with_inertial: bool,
        rng: &mut R,
    ) -> (Vec<BlockUpdate>, DriftState) {
        let sample = self.flight.tick(rng);
        let altitude = sample.altitude;
        let drift = self.drift.step(drift, rng);
        let position = self.drift.coordinates(drift);

        let mut updates = Vec::with_capacity(5);

        updates.push(BlockUpdate::Barometric(BarometricBlock {
            temperature: celsius(noisy(rng, isa_temperature(altitude), 0.05)),
            pressure: hectopascals(noisy(rng, isa_pressure(altitude), 0.02)),
            altitude: meters(altitude),
        }));

        updates.push(BlockUpdate::Gps(GpsBlock {
            latitude: degrees(position.latitude),
            longitude: degrees(position.longitude),
            altitude: meters((altitude + noisy(rng, 0.0, 0.8)).max(0.0)),
            satellites: count(rng.gen_range(9..=12) as f64),
        }));

        if with_inertial {
            updates.push(BlockUpdate::Inertial(inertial_block(&sample)));
        }

        updates.push(BlockUpdate::AirQuality(AirQualityBlock {
            co2: ppm(noisy(rng, 415.0, 4.0)),
            temperature: celsius(noisy(rng, 21.0, 0.1)),
            humidity: percent(noisy(rng, 45.0, 0.5).clamp(0.0, 100.0)),
        }));

        updates.push(BlockUpdate::Environmental(EnvironmentalBlock {
            temperature: celsius(noisy(rng, 19.0, 0.1)),
            humidity: percent(noisy(rng, 50.0, 0.5).clamp(0.0, 100.0)),
            uv_index: uv_index(noisy(rng, 3.0, 0.1).max(0.0)),
        }));

        (updates, drift)
    }
}
