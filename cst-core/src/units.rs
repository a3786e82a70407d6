//! Unit-tagged sensor readings
//!
//! Every leaf of a snapshot is a [`Reading`]: a value paired with the unit it
//! was measured in. Units serialize as their conventional symbol so consumers
//! can label axes without a lookup table.
//!
//! All readings serialize with 4 decimal places to reduce JSON payload size.

use serde::{Deserialize, Serialize};

/// Round f64 to 4 decimal places for compact JSON serialization
fn round4<S: serde::Serializer>(val: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64((*val * 10000.0).round() / 10000.0)
}

/// Physical unit attached to a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "°C")]
    Celsius,
    #[serde(rename = "hPa")]
    Hectopascals,
    #[serde(rename = "m")]
    Meters,
    #[serde(rename = "°")]
    Degrees,
    #[serde(rename = "count")]
    Count,
    /// Multiples of standard gravity
    #[serde(rename = "g")]
    StandardGravity,
    #[serde(rename = "°/s")]
    DegreesPerSecond,
    #[serde(rename = "ppm")]
    PartsPerMillion,
    /// Relative humidity, 0-100
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "UV")]
    UvIndex,
}

impl Unit {
    /// Symbol used in serialized output
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Celsius => "°C",
            Unit::Hectopascals => "hPa",
            Unit::Meters => "m",
            Unit::Degrees => "°",
            Unit::Count => "count",
            Unit::StandardGravity => "g",
            Unit::DegreesPerSecond => "°/s",
            Unit::PartsPerMillion => "ppm",
            Unit::Percent => "%",
            Unit::UvIndex => "UV",
        }
    }
}

/// A single measured value with its unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(serialize_with = "round4")]
    pub value: f64,
    pub unit: Unit,
}

impl Reading {
    pub const fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// A zero reading in the given unit (the rest value of every field)
    pub const fn zero(unit: Unit) -> Self {
        Self::new(0.0, unit)
    }

    /// Same unit, different value
    pub fn with_value(self, value: f64) -> Self {
        Self { value, ..self }
    }

    /// NaN and infinities never reach a published snapshot
    pub fn is_finite(&self) -> bool {
        self.value.is_finite()
    }
}

pub fn celsius(value: f64) -> Reading {
    Reading::new(value, Unit::Celsius)
}

pub fn hectopascals(value: f64) -> Reading {
    Reading::new(value, Unit::Hectopascals)
}

pub fn meters(value: f64) -> Reading {
    Reading::new(value, Unit::Meters)
}

pub fn degrees(value: f64) -> Reading {
    Reading::new(value, Unit::Degrees)
}

pub fn count(value: f64) -> Reading {
    Reading::new(value, Unit::Count)
}

pub fn g_force(value: f64) -> Reading {
    Reading::new(value, Unit::StandardGravity)
}

pub fn degrees_per_second(value: f64) -> Reading {
    Reading::new(value, Unit::DegreesPerSecond)
}

pub fn ppm(value: f64) -> Reading {
    Reading::new(value, Unit::PartsPerMillion)
}

pub fn percent(value: f64) -> Reading {
    Reading::new(value, Unit::Percent)
}

pub fn uv_index(value: f64) -> Reading {
    Reading::new(value, Unit::UvIndex)
}
