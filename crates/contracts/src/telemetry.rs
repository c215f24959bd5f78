//! Vehicle telemetry labels
//!
//! Per-frame scalar/vector labels recorded next to the camera frames.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Rotation, Vector3};

/// One telemetry column: dataset name and number of values per row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryField {
    pub name: &'static str,
    pub width: usize,
}

const fn vector(name: &'static str) -> TelemetryField {
    TelemetryField { name, width: 3 }
}

const fn scalar(name: &'static str) -> TelemetryField {
    TelemetryField { name, width: 1 }
}

/// Recorded telemetry columns, in dataset declaration order
pub const TELEMETRY_FIELDS: [TelemetryField; 12] = [
    vector("acceleration"),
    vector("velocity"),
    scalar("speed"),
    vector("location"),
    vector("rotation"),
    scalar("brake"),
    scalar("gear"),
    scalar("hand_brake"),
    scalar("manual_gear_shift"),
    scalar("reverse"),
    scalar("steer"),
    scalar("throttle"),
];

/// A single telemetry value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TelemetryValue {
    Scalar(f64),
    Vector([f64; 3]),
}

impl TelemetryValue {
    /// Number of values carried
    pub fn width(&self) -> usize {
        match self {
            TelemetryValue::Scalar(_) => 1,
            TelemetryValue::Vector(_) => 3,
        }
    }

    /// Values as a slice, in column order
    pub fn as_slice(&self) -> &[f64] {
        match self {
            TelemetryValue::Scalar(v) => std::slice::from_ref(v),
            TelemetryValue::Vector(v) => v,
        }
    }
}

impl From<f64> for TelemetryValue {
    fn from(value: f64) -> Self {
        TelemetryValue::Scalar(value)
    }
}

impl From<Vector3> for TelemetryValue {
    fn from(value: Vector3) -> Self {
        TelemetryValue::Vector(value.to_array())
    }
}

impl From<Rotation> for TelemetryValue {
    fn from(value: Rotation) -> Self {
        TelemetryValue::Vector(value.to_array())
    }
}

/// Field name -> value, one row of telemetry
pub type TelemetryRecord = BTreeMap<String, TelemetryValue>;

/// Vehicle control state as applied during the frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleControl {
    pub throttle: f64,
    pub steer: f64,
    pub brake: f64,
    pub hand_brake: bool,
    pub reverse: bool,
    pub manual_gear_shift: bool,
    pub gear: i32,
}

/// Telemetry sampled from the ego vehicle and its IMU/GNSS sensors
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleTelemetry {
    /// IMU compass heading (rad)
    pub compass: f64,

    /// GNSS latitude (deg)
    pub latitude: f64,

    /// GNSS longitude (deg)
    pub longitude: f64,

    /// IMU accelerometer (m/s²)
    pub acceleration: Vector3,

    /// Velocity (m/s)
    pub velocity: Vector3,

    /// Location (m)
    pub location: Vector3,

    /// Rotation (deg)
    pub rotation: Rotation,

    /// Applied control
    pub control: VehicleControl,
}

impl VehicleTelemetry {
    /// Speed (m/s), magnitude of the velocity vector
    pub fn speed(&self) -> f64 {
        self.velocity.length()
    }

    /// Flatten into the recorded label set
    ///
    /// Compass and GNSS are sampled but not part of the recorded columns.
    pub fn to_record(&self) -> TelemetryRecord {
        let c = &self.control;
        let flag = |b: bool| if b { 1.0 } else { 0.0 };

        let mut record = TelemetryRecord::new();
        record.insert("acceleration".into(), self.acceleration.into());
        record.insert("velocity".into(), self.velocity.into());
        record.insert("speed".into(), self.speed().into());
        record.insert("location".into(), self.location.into());
        record.insert("rotation".into(), self.rotation.into());
        record.insert("brake".into(), c.brake.into());
        record.insert("gear".into(), f64::from(c.gear).into());
        record.insert("hand_brake".into(), flag(c.hand_brake).into());
        record.insert("manual_gear_shift".into(), flag(c.manual_gear_shift).into());
        record.insert("reverse".into(), flag(c.reverse).into());
        record.insert("steer".into(), c.steer.into());
        record.insert("throttle".into(), c.throttle.into());
        record
    }
}
