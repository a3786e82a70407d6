//! Integration tests for the Synthesizer

use cst_adapters::math::{coordinates_to_offset, GeoPoint};
use cst_adapters::{DriftState, FlightPhase, Synthesizer};
use cst_core::config::{FlightConfig, SimulationConfig};
use cst_core::model::{SensorKind, SensorSnapshot};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn run(synth: &mut Synthesizer, ticks: usize, rng: &mut StdRng) -> (SensorSnapshot, DriftState) {
    let mut snapshot = SensorSnapshot::at_rest();
    let mut drift = DriftState::REFERENCE;
    for _ in 0..ticks {
        let (updates, next) = synth.tick(drift, true, rng);
        drift = next;
        snapshot = snapshot.with_updates(updates);
    }
    (snapshot, drift)
}

#[test]
fn test_eight_second_flight_scenario() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut synth = Synthesizer::new(&SimulationConfig::default());

    // 8.0 s at 50 ms per tick
    let (snapshot, _) = run(&mut synth, 160, &mut rng);

    assert!(snapshot.is_complete(), "every field should be finite");
    assert!(
        (snapshot.altitude() - 80.0).abs() < 1e-9,
        "altitude should be climb_rate * 8, got {}",
        snapshot.altitude()
    );

    let orientation = &snapshot.sensors.inertial.orientation;
    for axis in [&orientation.roll, &orientation.pitch, &orientation.yaw] {
        assert!(
            axis.value.abs() <= 15.0,
            "orientation axis out of range: {}",
            axis.value
        );
    }
}

#[test]
fn test_climb_continues_past_target() {
    let mut rng = StdRng::seed_from_u64(2);
    let config = SimulationConfig {
        flight: FlightConfig {
            climb_rate: 10.0,
            target_altitude: 20.0,
            ..FlightConfig::default()
        },
        ..SimulationConfig::default()
    };
    let mut synth = Synthesizer::new(&config);

    // 4 s: twice the time needed to reach the target
    let (snapshot, _) = run(&mut synth, 80, &mut rng);
    assert_eq!(synth.flight().phase(), FlightPhase::Apogee);
    assert!(snapshot.altitude() > 20.0);
}

#[test]
fn test_gps_walk_stays_bounded() {
    let mut rng = StdRng::seed_from_u64(3);
    let config = SimulationConfig::default();
    let mut synth = Synthesizer::new(&config);
    let reference = GeoPoint {
        latitude: config.drift.reference_latitude,
        longitude: config.drift.reference_longitude,
    };

    let mut drift = DriftState::REFERENCE;
    for _ in 0..5_000 {
        let (updates, next) = synth.tick(drift, false, &mut rng);
        drift = next;

        let snapshot = SensorSnapshot::at_rest().with_updates(updates);
        let point = GeoPoint {
            latitude: snapshot.sensors.gps.latitude.value,
            longitude: snapshot.sensors.gps.longitude.value,
        };
        let distance = coordinates_to_offset(reference, point).distance();
        assert!(
            distance <= config.drift.max_radius + 1e-6,
            "GPS walked {} m from the reference",
            distance
        );
    }
}

#[test]
fn test_tick_without_inertial_leaves_imu_block_alone() {
    let mut rng = StdRng::seed_from_u64(4);
    let mut synth = Synthesizer::new(&SimulationConfig::default());

    let before = SensorSnapshot::at_rest();
    let (updates, _) = synth.tick(DriftState::REFERENCE, false, &mut rng);
    assert!(updates.iter().all(|u| u.kind() != SensorKind::Inertial));

    let after = before.with_updates(updates);
    assert!(after.shares_block(&before, SensorKind::Inertial));
    assert!(!after.shares_block(&before, SensorKind::Barometric));
}

#[test]
fn test_same_seed_same_flight() {
    let config = SimulationConfig::default();
    let mut a = Synthesizer::new(&config);
    let mut b = Synthesizer::new(&config);

    let (snap_a, drift_a) = run(&mut a, 40, &mut StdRng::seed_from_u64(9));
    let (snap_b, drift_b) = run(&mut b, 40, &mut StdRng::seed_from_u64(9));

    assert_eq!(drift_a, drift_b);
    assert_eq!(snap_a.sensors.inertial, snap_b.sensors.inertial);
    assert_eq!(snap_a.sensors.gps, snap_b.sensors.gps);
}

#[test]
fn test_descent_then_touchdown_restarts_profile() {
    let mut rng = StdRng::seed_from_u64(5);
    let config = SimulationConfig {
        flight: FlightConfig {
            climb_rate: 10.0,
            target_altitude: 10.0,
            descent_rate: 10.0,
        },
        ..SimulationConfig::default()
    };
    let mut synth = Synthesizer::new(&config);

    run(&mut synth, 40, &mut rng); // 2 s, 20 m
    synth.begin_descent();
    assert_eq!(synth.flight().phase(), FlightPhase::Descent);

    // 20 m at 10 m/s is 2 s; give it a few ticks of slack
    run(&mut synth, 45, &mut rng);
    assert_eq!(synth.flight().phase(), FlightPhase::Ascent);
    assert!(synth.flight().altitude() < 10.0);
}
