//! Sensor snapshot data model
//!
//! A [`SensorSnapshot`] is the unit of truth handed to every consumer. It always
//! carries all five sensor blocks; a block is replaced as a whole by whichever
//! source owns it and is otherwise shared (by `Arc`) with the previous snapshot.
//!
//! Inertial axes follow the IMU body frame:
//! - X: forward
//! - Y: left
//! - Z: up (a level vehicle at rest reads -1 g on Z)

use crate::units::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Kind of sensor feeding one snapshot block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Barometric,
    Gps,
    Inertial,
    AirQuality,
    Environmental,
}

impl SensorKind {
    pub const ALL: [SensorKind; 5] = [
        SensorKind::Barometric,
        SensorKind::Gps,
        SensorKind::Inertial,
        SensorKind::AirQuality,
        SensorKind::Environmental,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Barometric => "barometric",
            SensorKind::Gps => "gps",
            SensorKind::Inertial => "inertial",
            SensorKind::AirQuality => "air_quality",
            SensorKind::Environmental => "environmental",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        SensorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown sensor kind: {}", s))
    }
}

// === Sensor Blocks ===

/// Barometric altimeter (pressure, temperature, derived altitude)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarometricBlock {
    pub temperature: Reading,
    pub pressure: Reading,
    pub altitude: Reading,
}

impl Default for BarometricBlock {
    fn default() -> Self {
        Self {
            temperature: Reading::zero(Unit::Celsius),
            pressure: Reading::zero(Unit::Hectopascals),
            altitude: Reading::zero(Unit::Meters),
        }
    }
}

/// GPS fix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsBlock {
    pub latitude: Reading,
    pub longitude: Reading,
    pub altitude: Reading,
    pub satellites: Reading,
}

impl Default for GpsBlock {
    fn default() -> Self {
        Self {
            latitude: Reading::zero(Unit::Degrees),
            longitude: Reading::zero(Unit::Degrees),
            altitude: Reading::zero(Unit::Meters),
            satellites: Reading::zero(Unit::Count),
        }
    }
}

/// Three body axes sharing one unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Axes {
    pub x: Reading,
    pub y: Reading,
    pub z: Reading,
}

impl Axes {
    pub fn new(x: f64, y: f64, z: f64, unit: Unit) -> Self {
        Self {
            x: Reading::new(x, unit),
            y: Reading::new(y, unit),
            z: Reading::new(z, unit),
        }
    }

    pub fn values(&self) -> [f64; 3] {
        [self.x.value, self.y.value, self.z.value]
    }
}

/// Roll/pitch/yaw attitude in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attitude {
    pub roll: Reading,
    pub pitch: Reading,
    pub yaw: Reading,
}

impl Attitude {
    pub fn from_degrees(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self {
            roll: degrees(roll),
            pitch: degrees(pitch),
            yaw: degrees(yaw),
        }
    }
}

/// Inertial measurement unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InertialBlock {
    /// Specific force, g
    pub accelerometer: Axes,
    /// Angular rate, °/s
    pub gyroscope: Axes,
    pub orientation: Attitude,
    /// Tilt of the measured gravity vector away from the Z axis
    pub inclination: Reading,
}

impl Default for InertialBlock {
    fn default() -> Self {
        Self {
            accelerometer: Axes::new(0.0, 0.0, 0.0, Unit::StandardGravity),
            gyroscope: Axes::new(0.0, 0.0, 0.0, Unit::DegreesPerSecond),
            orientation: Attitude::from_degrees(0.0, 0.0, 0.0),
            inclination: Reading::zero(Unit::Degrees),
        }
    }
}

/// CO2 / air quality sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityBlock {
    pub co2: Reading,
    pub temperature: Reading,
    pub humidity: Reading,
}

impl Default for AirQualityBlock {
    fn default() -> Self {
        Self {
            co2: Reading::zero(Unit::PartsPerMillion),
            temperature: Reading::zero(Unit::Celsius),
            humidity: Reading::zero(Unit::Percent),
        }
    }
}

/// External environmental sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalBlock {
    pub temperature: Reading,
    pub humidity: Reading,
    pub uv_index: Reading,
}

impl Default for EnvironmentalBlock {
    fn default() -> Self {
        Self {
            temperature: Reading::zero(Unit::Celsius),
            humidity: Reading::zero(Unit::Percent),
            uv_index: Reading::zero(Unit::UvIndex),
        }
    }
}

/// A complete replacement for one sensor block
#[derive(Debug, Clone, PartialEq)]
pub enum BlockUpdate {
    Barometric(BarometricBlock),
    Gps(GpsBlock),
    Inertial(InertialBlock),
    AirQuality(AirQualityBlock),
    Environmental(EnvironmentalBlock),
}

impl BlockUpdate {
    pub fn kind(&self) -> SensorKind {
        match self {
            BlockUpdate::Barometric(_) => SensorKind::Barometric,
            BlockUpdate::Gps(_) => SensorKind::Gps,
            BlockUpdate::Inertial(_) => SensorKind::Inertial,
            BlockUpdate::AirQuality(_) => SensorKind::AirQuality,
            BlockUpdate::Environmental(_) => SensorKind::Environmental,
        }
    }
}

// === Snapshot ===

/// All sensor blocks; each one shared with the snapshot it was carried over from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sensors {
    pub barometric: Arc<BarometricBlock>,
    pub gps: Arc<GpsBlock>,
    pub inertial: Arc<InertialBlock>,
    pub air_quality: Arc<AirQualityBlock>,
    pub environmental: Arc<EnvironmentalBlock>,
}

impl Default for Sensors {
    fn default() -> Self {
        Self {
            barometric: Arc::new(BarometricBlock::default()),
            gps: Arc::new(GpsBlock::default()),
            inertial: Arc::new(InertialBlock::default()),
            air_quality: Arc::new(AirQualityBlock::default()),
            environmental: Arc::new(EnvironmentalBlock::default()),
        }
    }
}

/// Full, self-consistent sensor state published per update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSnapshot {
    /// Instant of synthesis
    pub timestamp: DateTime<Utc>,
    pub sensors: Sensors,
}

impl SensorSnapshot {
    /// The snapshot before any source has reported: every value at zero
    pub fn at_rest() -> Self {
        Self {
            timestamp: Utc::now(),
            sensors: Sensors::default(),
        }
    }

    /// Build the next snapshot.
    ///
    /// Updated blocks are replaced whole, the rest are shared with `self`, and
    /// the timestamp is refreshed even when `updates` is empty.
    pub fn with_updates<I>(&self, updates: I) -> SensorSnapshot
    where
        I: IntoIterator<Item = BlockUpdate>,
    {
        let mut sensors = self.sensors.clone();
        for update in updates {
            match update {
                BlockUpdate::Barometric(b) => sensors.barometric = Arc::new(b),
                BlockUpdate::Gps(b) => sensors.gps = Arc::new(b),
                BlockUpdate::Inertial(b) => sensors.inertial = Arc::new(b),
                BlockUpdate::AirQuality(b) => sensors.air_quality = Arc::new(b),
                BlockUpdate::Environmental(b) => sensors.environmental = Arc::new(b),
            }
        }
        SensorSnapshot {
            timestamp: Utc::now(),
            sensors,
        }
    }

    /// True when both snapshots hold the very same block allocation for `kind`
    pub fn shares_block(&self, other: &SensorSnapshot, kind: SensorKind) -> bool {
        let (a, b) = (&self.sensors, &other.sensors);
        match kind {
            SensorKind::Barometric => Arc::ptr_eq(&a.barometric, &b.barometric),
            SensorKind::Gps => Arc::ptr_eq(&a.gps, &b.gps),
            SensorKind::Inertial => Arc::ptr_eq(&a.inertial, &b.inertial),
            SensorKind::AirQuality => Arc::ptr_eq(&a.air_quality, &b.air_quality),
            SensorKind::Environmental => Arc::ptr_eq(&a.environmental, &b.environmental),
        }
    }

    /// Flattened `(path, reading)` leaves of one block, e.g. `accelerometer.x`
    pub fn fields(&self, kind: SensorKind) -> Vec<(&'static str, Reading)> {
        let s = &self.sensors;
        match kind {
            SensorKind::Barometric => vec![
                ("temperature", s.barometric.temperature),
                ("pressure", s.barometric.pressure),
                ("altitude", s.barometric.altitude),
            ],
            SensorKind::Gps => vec![
                ("latitude", s.gps.latitude),
                ("longitude", s.gps.longitude),
                ("altitude", s.gps.altitude),
                ("satellites", s.gps.satellites),
            ],
            SensorKind::Inertial => {
                let i = &s.inertial;
                vec![
                    ("accelerometer.x", i.accelerometer.x),
                    ("accelerometer.y", i.accelerometer.y),
                    ("accelerometer.z", i.accelerometer.z),
                    ("gyroscope.x", i.gyroscope.x),
                    ("gyroscope.y", i.gyroscope.y),
                    ("gyroscope.z", i.gyroscope.z),
                    ("orientation.roll", i.orientation.roll),
                    ("orientation.pitch", i.orientation.pitch),
                    ("orientation.yaw", i.orientation.yaw),
                    ("inclination", i.inclination),
                ]
            }
            SensorKind::AirQuality => vec![
                ("co2", s.air_quality.co2),
                ("temperature", s.air_quality.temperature),
                ("humidity", s.air_quality.humidity),
            ],
            SensorKind::Environmental => vec![
                ("temperature", s.environmental.temperature),
                ("humidity", s.environmental.humidity),
                ("uv_index", s.environmental.uv_index),
            ],
        }
    }

    /// Every leaf of every block is a finite value
    pub fn is_complete(&self) -> bool {
        SensorKind::ALL
            .iter()
            .all(|kind| self.fields(*kind).iter().all(|(_, r)| r.is_finite()))
    }

    /// Barometric altitude, the altitude the session resets on stop
    pub fn altitude(&self) -> f64 {
        self.sensors.barometric.altitude.value
    }
}

// === Sensor Masking for Selective Output ===

/// Specifies which sensor blocks to include in serialized output
///
/// Lets a chart that only plots GPS skip the rest of the snapshot.
#[derive(Debug, Clone, Default)]
pub struct SensorMask {
    kinds: HashSet<SensorKind>,
    include_all: bool,
}

impl SensorMask {
    /// Create a mask that includes all blocks
    pub fn all() -> Self {
        Self {
            kinds: HashSet::new(),
            include_all: true,
        }
    }

    /// Create a mask from a comma-separated list of sensor kinds.
    /// Unknown names are ignored.
    pub fn parse(kinds: &str) -> Self {
        let kinds: HashSet<SensorKind> = kinds
            .split(',')
            .filter_map(|s| s.parse().ok())
            .collect();

        Self {
            kinds,
            include_all: false,
        }
    }

    /// Check if a block should be included
    pub fn includes(&self, kind: SensorKind) -> bool {
        self.include_all || self.kinds.contains(&kind)
    }

    /// Check if all blocks should be included
    pub fn is_all(&self) -> bool {
        self.include_all
    }
}

impl FromStr for SensorMask {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl SensorSnapshot {
    /// Serialize this snapshot respecting the given mask
    ///
    /// If mask is None or includes all blocks, serialize everything.
    /// The timestamp is always present.
    pub fn to_json_filtered(&self, mask: Option<&SensorMask>) -> serde_json::Result<String> {
        let mask = match mask {
            Some(m) if !m.is_all() => m,
            _ => return serde_json::to_string(self),
        };

        let s = &self.sensors;
        let mut sensors = serde_json::Map::new();
        for kind in SensorKind::ALL {
            if !mask.includes(kind) {
                continue;
            }
            let block = match kind {
                SensorKind::Barometric => serde_json::to_value(&s.barometric)?,
                SensorKind::Gps => serde_json::to_value(&s.gps)?,
                SensorKind::Inertial => serde_json::to_value(&s.inertial)?,
                SensorKind::AirQuality => serde_json::to_value(&s.air_quality)?,
                SensorKind::Environmental => serde_json::to_value(&s.environmental)?,
            };
            sensors.insert(kind.as_str().to_string(), block);
        }

        let mut map = serde_json::Map::new();
        map.insert(
            "timestamp".to_string(),
            serde_json::to_value(self.timestamp)?,
        );
        map.insert("sensors".to_string(), serde_json::Value::Object(sensors));
        serde_json::to_string(&map)
    }
}
