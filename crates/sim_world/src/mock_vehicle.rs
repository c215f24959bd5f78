//! Mock ego vehicle
//!
//! Deterministic kinematics sampled once per synchronized frame: speed ramps
//! toward a cruise speed depending on the driving style, steering follows a
//! slow sine, pose is integrated with the step's delta.

use contracts::{
    DrivingStyle, Rotation, Vector3, VehicleControl, VehicleTelemetry, WorldSnapshot,
};

const GRAVITY: f64 = 9.81;

/// Steering period (seconds)
const STEER_PERIOD_S: f64 = 8.0;

/// Origin used to derive the simulated GNSS fix (deg)
const GNSS_ORIGIN: (f64, f64) = (49.0, 8.0);

/// Meters per degree of latitude
const METERS_PER_DEGREE: f64 = 111_320.0;

#[derive(Debug, Clone)]
pub struct MockVehicle {
    cruise_speed: f64,
    max_accel: f64,
    max_steer: f64,
    speed: f64,
    yaw_deg: f64,
    location: Vector3,
}

impl MockVehicle {
    pub fn new(style: DrivingStyle) -> Self {
        let (cruise_speed, max_accel, max_steer) = match style {
            DrivingStyle::Aggressive => (16.0, 4.0, 0.5),
            DrivingStyle::Cautious => (8.0, 1.5, 0.25),
        };
        Self {
            cruise_speed,
            max_accel,
            max_steer,
            speed: 0.0,
            yaw_deg: 0.0,
            location: Vector3::default(),
        }
    }

    /// Advance the vehicle by the snapshot's step and sample its telemetry
    pub fn sample(&mut self, snapshot: &WorldSnapshot) -> VehicleTelemetry {
        let dt = snapshot.delta_seconds.max(0.0);
        let t = snapshot.elapsed_seconds;

        let steer = self.max_steer * (std::f64::consts::TAU * t / STEER_PERIOD_S).sin();

        let gap = self.cruise_speed - self.speed;
        let accel = if dt > 0.0 {
            (gap / dt).clamp(-self.max_accel, self.max_accel)
        } else {
            0.0
        };
        let throttle = (accel / self.max_accel).clamp(0.0, 1.0);
        let brake = (-accel / self.max_accel).clamp(0.0, 1.0);

        self.speed = (self.speed + accel * dt).max(0.0);
        // yaw rate proportional to steer and speed
        self.yaw_deg += steer * self.speed * dt * 10.0;
        let yaw = self.yaw_deg.to_radians();
        let velocity = Vector3::new(self.speed * yaw.cos(), self.speed * yaw.sin(), 0.0);
        self.location = Vector3::new(
            self.location.x + velocity.x * dt,
            self.location.y + velocity.y * dt,
            self.location.z,
        );

        VehicleTelemetry {
            compass: yaw.rem_euclid(std::f64::consts::TAU),
            latitude: GNSS_ORIGIN.0 - self.location.y / METERS_PER_DEGREE,
            longitude: GNSS_ORIGIN.1
                + self.location.x / (METERS_PER_DEGREE * GNSS_ORIGIN.0.to_radians().cos()),
            acceleration: Vector3::new(accel * yaw.cos(), accel * yaw.sin(), GRAVITY),
            velocity,
            location: self.location,
            rotation: Rotation {
                pitch: 0.0,
                yaw: self.yaw_deg,
                roll: 0.0,
            },
            control: VehicleControl {
                throttle,
                steer,
                brake,
                hand_brake: false,
                reverse: false,
                manual_gear_shift: false,
                gear: if self.speed > 0.0 { 1 } else { 0 },
            },
        }
    }
}
