//! Bounded random walk for simulated GPS position
//!
//! The walk lives in meters around a fixed reference point and is converted
//! to latitude/longitude only when read. State is passed in and handed back;
//! nothing here is global.

use crate::math::{offset_to_coordinates, GeoPoint, Offset};
use cst_core::config::DriftConfig;
use rand::Rng;
use std::f64::consts::TAU;

/// Last published position of the walk
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DriftState {
    /// No fix yet; reads as 0/0
    #[default]
    Uninitialized,
    At(Offset),
}

impl DriftState {
    /// Walk origin: the reference point itself
    pub const REFERENCE: DriftState = DriftState::At(Offset::ORIGIN);

    pub fn offset(&self) -> Option<Offset> {
        match self {
            DriftState::Uninitialized => None,
            DriftState::At(offset) => Some(*offset),
        }
    }
}

/// Take one step of at most `max_step` meters in a random direction.
///
/// A step that leaves the `max_radius` circle is pulled radially back onto
/// it, so every call moves the point.
pub fn next_offset<R: Rng + ?Sized>(
    previous: Offset,
    max_step: f64,
    max_radius: f64,
    rng: &mut R,
) -> Offset {
    let heading = rng.gen::<f64>() * TAU;
    let step = rng.gen::<f64>() * max_step;

    let (sin, cos) = heading.sin_cos();
    let mut next = Offset {
        east: previous.east + step * cos,
        north: previous.north + step * sin,
    };

    let distance = next.distance();
    if distance > max_radius {
        // A non-positive radius pins the walk to the reference point
        let scale = if max_radius > 0.0 { max_radius / distance } else { 0.0 };
        next.east *= scale;
        next.north *= scale;
    }
    next
}

/// The walk parameters
#[derive(Debug, Clone, PartialEq)]
pub struct DriftModel {
    pub reference: GeoPoint,
    pub max_step: f64,
    pub max_radius: f64,
}

impl DriftModel {
    pub fn from_config(config: &DriftConfig) -> Self {
        Self {
            reference: GeoPoint {
                latitude: config.reference_latitude,
                longitude: config.reference_longitude,
            },
            max_step: config.max_step,
            max_radius: config.max_radius,
        }
    }

    /// Advance the walk. An uninitialized walk starts from the reference point.
    pub fn step<R: Rng + ?Sized>(&self, state: DriftState, rng: &mut R) -> DriftState {
        let previous = state.offset().unwrap_or(Offset::ORIGIN);
        DriftState::At(next_offset(previous, self.max_step, self.max_radius, rng))
    }

    /// Coordinates for `state`; `(0, 0)` until the walk has a position
    pub fn coordinates(&self, state: DriftState) -> GeoPoint {
        match state {
            DriftState::Uninitialized => GeoPoint::default(),
            DriftState::At(offset) => offset_to_coordinates(self.reference, offset),
        }
    }
}

impl Default for DriftModel {
    fn default() -> Self {
        Self::from_config(&DriftConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::coordinates_to_offset;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_walk_never_leaves_radius() {
        let model = DriftModel::default();
        let mut rng = StdRng::seed_from_u64(42);
        let mut state = DriftState::REFERENCE;
        for _ in 0..10_000 {
            state = model.step(state, &mut rng);
            let d = state.offset().unwrap().distance();
            assert!(d <= model.max_radius + 1e-9, "distance {} escaped", d);
        }
    }

    #[test]
    fn test_walk_reaches_boundary_with_large_steps() {
        // Steps larger than the radius always land on the circle
        let mut rng = StdRng::seed_from_u64(3);
        let mut offset = Offset::ORIGIN;
        let mut on_boundary = 0;
        for _ in 0..200 {
            offset = next_offset(offset, 50.0, 10.0, &mut rng);
            assert!(offset.distance() <= 10.0 + 1e-9);
            if (offset.distance() - 10.0).abs() < 1e-9 {
                on_boundary += 1;
            }
        }
        assert!(on_boundary > 0);
    }

    #[test]
    fn test_non_positive_radius_stays_at_origin() {
        let mut rng = StdRng::seed_from_u64(5);
        for radius in [0.0, -3.0] {
            let mut offset = Offset::ORIGIN;
            for _ in 0..100 {
                offset = next_offset(offset, 1.5, radius, &mut rng);
                assert_eq!(offset, Offset::ORIGIN, "radius {}", radius);
            }
        }
    }

    #[test]
    fn test_single_step_is_bounded_by_max_step() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..1000 {
            let next = next_offset(Offset::ORIGIN, 1.5, 25.0, &mut rng);
            assert!(next.distance() <= 1.5 + 1e-12);
        }
    }

    #[test]
    fn test_uninitialized_reads_zero_zero() {
        let model = DriftModel::default();
        assert_eq!(
            model.coordinates(DriftState::Uninitialized),
            GeoPoint::default()
        );
    }

    #[test]
    fn test_reference_reads_reference_point() {
        let model = DriftModel::default();
        assert_eq!(model.coordinates(DriftState::REFERENCE), model.reference);
    }

    #[test]
    fn test_uninitialized_step_starts_at_reference() {
        let model = DriftModel::default();
        let mut rng = StdRng::seed_from_u64(1);
        let state = model.step(DriftState::Uninitialized, &mut rng);
        let point = model.coordinates(state);
        let offset = coordinates_to_offset(model.reference, point);
        assert!(offset.distance() <= model.max_step + 1e-6);
    }
}
