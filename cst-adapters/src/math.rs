//! Vector and orientation math shared by the synthesis models
//!
//! Angles are degrees at every public boundary; radians only inside.

use cst_core::ingress::Vector3;
use nalgebra::Rotation3;
use rand::Rng;
use std::f64::consts::PI;

/// Meters per degree of latitude (and of longitude at the equator)
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Denominators smaller than this are treated as 1
const MIN_DENOMINATOR: f64 = 1e-6;

pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

pub fn deg_to_rad(deg: f64) -> f64 {
    deg * PI / 180.0
}

pub fn rad_to_deg(rad: f64) -> f64 {
    rad * 180.0 / PI
}

/// Standard-normal sample (Box-Muller)
pub fn gaussian_noise<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // 1 - [0, 1) keeps u1 away from zero so ln() stays finite
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Accelerometer reading (g) of a motionless IMU at the given attitude.
///
/// Rotation is `Rz(yaw) · Ry(pitch) · Rx(roll)` applied to `[0, 0, -1]`.
/// The composition order is fixed; off-axis signs depend on it.
pub fn rotate_gravity(roll_deg: f64, pitch_deg: f64, yaw_deg: f64) -> Vector3 {
    let attitude = Rotation3::from_euler_angles(
        deg_to_rad(roll_deg),
        deg_to_rad(pitch_deg),
        deg_to_rad(yaw_deg),
    );
    attitude * Vector3::new(0.0, 0.0, -1.0)
}

/// Roll and pitch (degrees) that `rotate_gravity` maps to `accel` at zero yaw
pub fn tilt_from_accel(accel: Vector3) -> (f64, f64) {
    // At zero yaw: x = -sin(p)cos(r), y = sin(r), z = -cos(p)cos(r)
    let roll = accel.y.atan2((accel.x * accel.x + accel.z * accel.z).sqrt());
    let pitch = if accel.x == 0.0 && accel.z == 0.0 {
        0.0
    } else {
        (-accel.x).atan2(-accel.z)
    };
    (rad_to_deg(roll), rad_to_deg(pitch))
}

/// Angle between the measured gravity vector and the Z axis, degrees
pub fn inclination_deg(accel: Vector3) -> f64 {
    let horizontal = (accel.x * accel.x + accel.y * accel.y).sqrt();
    let vertical = accel.z.abs();
    let vertical = if vertical < MIN_DENOMINATOR { 1.0 } else { vertical };
    rad_to_deg((horizontal / vertical).atan())
}

/// Latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Planar offset from a reference point in meters (east, north)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Offset {
    pub east: f64,
    pub north: f64,
}

impl Offset {
    pub const ORIGIN: Offset = Offset { east: 0.0, north: 0.0 };

    pub fn distance(&self) -> f64 {
        self.east.hypot(self.north)
    }
}

fn meters_per_degree_longitude(reference: GeoPoint) -> f64 {
    METERS_PER_DEGREE * deg_to_rad(reference.latitude).cos()
}

/// Flat-earth conversion, only valid for offsets of tens of meters
pub fn offset_to_coordinates(reference: GeoPoint, offset: Offset) -> GeoPoint {
    GeoPoint {
        latitude: reference.latitude + offset.north / METERS_PER_DEGREE,
        longitude: reference.longitude + offset.east / meters_per_degree_longitude(reference),
    }
}

/// Inverse of [`offset_to_coordinates`]
pub fn coordinates_to_offset(reference: GeoPoint, point: GeoPoint) -> Offset {
    Offset {
        east: (point.longitude - reference.longitude) * meters_per_degree_longitude(reference),
        north: (point.latitude - reference.latitude) * METERS_PER_DEGREE,
    }
}
