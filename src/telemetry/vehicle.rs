//! # Vehicle Data Sources
//!
//! Read-only view of the flight controller state the encoder reports.
//! Estimation, battery monitoring and ranging live elsewhere; the encoder
//! queries them through [`VehicleData`] once per scheduling decision.

/// Vehicle attitude in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Attitude {
    /// Roll, -180 to 180, right wing down positive
    pub roll_deg: f32,
    /// Pitch, -90 to 90, nose up positive
    pub pitch_deg: f32,
    /// Heading, 0 to 360
    pub yaw_deg: f32,
}

/// Estimated velocity in m/s, north-east-down frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity {
    pub north: f32,
    pub east: f32,
    pub down: f32,
}

impl Velocity {
    /// Horizontal speed over ground
    pub fn horizontal(&self) -> f32 {
        self.north.hypot(self.east)
    }

    /// Climb rate, up positive
    pub fn climb(&self) -> f32 {
        -self.down
    }
}

/// GPS fix quality as reported by the receiver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum FixType {
    #[default]
    NoGps,
    NoFix,
    Fix2D,
    Fix3D,
    Fix3DDgps,
    Fix3DRtk,
}

impl FixType {
    /// Wire value: 0 no GPS, 1 no fix, 2 2D, 3 any 3D fix
    pub fn wire_value(self) -> u8 {
        match self {
            FixType::NoGps => 0,
            FixType::NoFix => 1,
            FixType::Fix2D => 2,
            FixType::Fix3D | FixType::Fix3DDgps | FixType::Fix3DRtk => 3,
        }
    }

    pub fn has_3d_fix(self) -> bool {
        self >= FixType::Fix3D
    }
}

/// GPS receiver state
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GpsFix {
    /// Latitude in 1e-7 degrees
    pub lat_e7: i32,
    /// Longitude in 1e-7 degrees
    pub lon_e7: i32,
    /// Altitude above mean sea level in cm
    pub alt_msl_cm: i32,
    /// Ground speed in m/s
    pub ground_speed: f32,
    /// Course over ground in degrees
    ///
    /// Not transmitted: the hub and S.Port course items carry the attitude
    /// yaw (see [`payload::course_deg`](super::payload::course_deg)).
    pub course_deg: f32,
    pub satellites: u8,
    pub hdop: f32,
    pub vdop: f32,
    pub fix: FixType,
}

/// Battery monitor reading
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BatteryState {
    /// Pack voltage in volts
    pub voltage: f32,
    /// Current draw in amperes
    pub current_amps: f32,
    /// Capacity used in mAh
    pub consumed_mah: f32,
    /// Remaining capacity, 0-100%
    pub remaining_pct: u8,
}

/// Position relative to home
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HomeInfo {
    /// Horizontal distance to home in meters
    pub distance_m: f32,
    /// Bearing from home in degrees
    pub bearing_deg: f32,
}

/// Simple / super simple flight mode flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SimpleMode {
    #[default]
    Off,
    Simple,
    SuperSimple,
}

impl SimpleMode {
    pub fn wire_value(self) -> u8 {
        match self {
            SimpleMode::Off => 0,
            SimpleMode::Simple => 1,
            SimpleMode::SuperSimple => 2,
        }
    }
}

/// Arming and failsafe flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArmingState {
    pub armed: bool,
    pub simple_mode: SimpleMode,
    pub land_complete: bool,
    pub battery_failsafe: bool,
    pub ekf_failsafe: bool,
}

/// Read-only data sources consumed by the encoder
#[cfg_attr(test, mockall::automock)]
pub trait VehicleData {
    fn attitude(&self) -> Attitude;

    fn velocity(&self) -> Velocity;

    fn gps(&self) -> GpsFix;

    fn battery(&self) -> BatteryState;

    /// Altitude above home in meters
    fn relative_altitude_m(&self) -> f32;

    /// Distance sensor reading in cm, 0 when out of range or absent
    fn rangefinder_cm(&self) -> u16;

    /// `None` until a home position is set
    fn home(&self) -> Option<HomeInfo>;

    fn arming(&self) -> ArmingState;
}

/// Plain snapshot of vehicle state
///
/// Useful when the caller copies estimator outputs once per loop, and in tests.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StaticVehicle {
    pub attitude: Attitude,
    pub velocity: Velocity,
    pub gps: GpsFix,
    pub battery: BatteryState,
    pub relative_altitude_m: f32,
    pub rangefinder_cm: u16,
    pub home: Option<HomeInfo>,
    pub arming: ArmingState,
}

impl VehicleData for StaticVehicle {
    fn attitude(&self) -> Attitude {
        self.attitude
    }

    fn velocity(&self) -> Velocity {
        self.velocity
    }

    fn gps(&self) -> GpsFix {
        self.gps
    }

    fn battery(&self) -> BatteryState {
        self.battery
    }

    fn relative_altitude_m(&self) -> f32 {
        self.relative_altitude_m
    }

    fn rangefinder_cm(&self) -> u16 {
        self.rangefinder_cm
    }

    fn home(&self) -> Option<HomeInfo> {
        self.home
    }

    fn arming(&self) -> ArmingState {
        self.arming
    }
}
