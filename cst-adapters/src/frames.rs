//! Hardware frames to snapshot blocks
//!
//! Hardware IMUs report no attitude, so roll and pitch are estimated from the
//! accelerometer (valid while the vehicle is not accelerating) and yaw is 0.

use crate::math::{inclination_deg, tilt_from_accel};
use cst_core::ingress::{FullFrame, InertialFrame};
use cst_core::model::*;
use cst_core::units::*;

pub fn inertial_block(frame: &InertialFrame) -> InertialBlock {
    let a = frame.accelerometer;
    let w = frame.gyroscope;
    let (roll, pitch) = tilt_from_accel(a);
    InertialBlock {
        accelerometer: Axes::new(a.x, a.y, a.z, Unit::StandardGravity),
        gyroscope: Axes::new(w.x, w.y, w.z, Unit::DegreesPerSecond),
        orientation: Attitude::from_degrees(roll, pitch, 0.0),
        inclination: degrees(inclination_deg(a)),
    }
}

/// One block per sensor kind
pub fn full_frame_blocks(frame: &FullFrame) -> Vec<BlockUpdate> {
    let FullFrame {
        barometric,
        gps,
        inertial,
        air_quality,
        environmental,
    } = frame;

    vec![
        BlockUpdate::Barometric(BarometricBlock {
            temperature: celsius(barometric.temperature),
            pressure: hectopascals(barometric.pressure),
            altitude: meters(barometric.altitude),
        }),
        BlockUpdate::Gps(GpsBlock {
            latitude: degrees(gps.latitude),
            longitude: degrees(gps.longitude),
            altitude: meters(gps.altitude),
            satellites: count(gps.satellites),
        }),
        BlockUpdate::Inertial(inertial_block(inertial)),
        BlockUpdate::AirQuality(AirQualityBlock {
            co2: ppm(air_quality.co2),
            temperature: celsius(air_quality.temperature),
            humidity: percent(air_quality.humidity),
        }),
        BlockUpdate::Environmental(EnvironmentalBlock {
            temperature: celsius(environmental.temperature),
            humidity: percent(environmental.humidity),
            uv_index: uv_index(environmental.uv_index),
        }),
    ]
}
