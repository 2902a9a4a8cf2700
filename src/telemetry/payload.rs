//! # Payload Builders
//!
//! Turn vehicle state into the 32-bit passthrough words and the split
//! values of the legacy hub / S.Port sensors. Every function reads the
//! data sources once and is otherwise pure.

use crate::config::VehicleConfig;
use crate::frsky::packer::{
    degrees_to_ddmm, fields, pack, pack_flag, prep_number, scaled, scaled_signed, split_decimal,
};

use super::vehicle::{GpsFix, VehicleData};

/// Latitude flag on the GPS coordinate word (southern hemisphere)
const COORD_NEGATIVE: u32 = 0x4000_0000;

/// Marks the GPS coordinate word as longitude
const COORD_LONGITUDE: u32 = 0x8000_0000;

/// Number of parameters in the parameter cycle
pub const PARAM_COUNT: u8 = 4;

/// GPS status word: satellites, fix, HDOP, VDOP, MSL altitude
pub fn gps_status<V: VehicleData + ?Sized>(vehicle: &V) -> u32 {
    let gps = vehicle.gps();

    pack(u32::from(gps.satellites), fields::GPS_SATS)
        | pack(u32::from(gps.fix.wire_value()), fields::GPS_FIX)
        // DOPs in tenths
        | pack(u32::from(prep_number(scaled_signed(gps.hdop, 10.0), 2, 1)), fields::GPS_HDOP)
        | pack(u32::from(prep_number(scaled_signed(gps.vdop, 10.0), 2, 1)), fields::GPS_VDOP)
        // altitude in dm
        | pack(
            u32::from(prep_number(scaled_signed(gps.alt_msl_cm as f32, 0.1), 2, 2)),
            fields::GPS_ALT_MSL,
        )
}

/// Battery word: voltage in dV, current in dA, consumed mAh
pub fn battery<V: VehicleData + ?Sized>(vehicle: &V) -> u32 {
    let battery = vehicle.battery();
    let current_da = scaled(battery.current_amps, 10.0).min(i32::MAX as u32) as i32;

    pack(scaled(battery.voltage, 10.0), fields::BATT_VOLTAGE)
        | pack(u32::from(prep_number(current_da, 2, 1)), fields::BATT_CURRENT)
        | pack(scaled(battery.consumed_mah, 1.0), fields::BATT_CONSUMED_MAH)
}

/// Autopilot status word
///
/// The control mode is sent one-based so that 0 means "unknown".
pub fn autopilot_status<V: VehicleData + ?Sized>(vehicle: &V, flight_mode: u8) -> u32 {
    let arming = vehicle.arming();

    pack(u32::from(flight_mode) + 1, fields::AP_CONTROL_MODE)
        | pack(u32::from(arming.simple_mode.wire_value()), fields::AP_SIMPLE_MODE)
        | pack_flag(arming.land_complete, fields::AP_LAND_COMPLETE)
        | pack_flag(arming.armed, fields::AP_ARMED)
        | pack_flag(arming.battery_failsafe, fields::AP_BATT_FAILSAFE)
        | pack_flag(arming.ekf_failsafe, fields::AP_EKF_FAILSAFE)
}

/// Home word: distance in m, altitude above home in dm, bearing in 3° steps
///
/// Zero until a home position is known.
pub fn home<V: VehicleData + ?Sized>(vehicle: &V) -> u32 {
    let Some(home) = vehicle.home() else {
        return 0;
    };
    let altitude_dm = scaled_signed(vehicle.relative_altitude_m(), 10.0);
    let bearing = home.bearing_deg.rem_euclid(360.0);

    pack(u32::from(prep_number(scaled_signed(home.distance_m, 1.0), 3, 2)), fields::HOME_DISTANCE)
        | pack(u32::from(prep_number(altitude_dm, 3, 2)), fields::HOME_ALT)
        | pack(scaled(bearing, 1.0 / 3.0), fields::HOME_BEARING)
}

/// Velocity and yaw word: climb rate and ground speed in dm/s, yaw in 0.2° steps
pub fn velocity_yaw<V: VehicleData + ?Sized>(vehicle: &V) -> u32 {
    let velocity = vehicle.velocity();
    let yaw = vehicle.attitude().yaw_deg.rem_euclid(360.0);

    pack(u32::from(prep_number(scaled_signed(velocity.climb(), 10.0), 2, 1)), fields::VEL_VERTICAL)
        | pack(
            u32::from(prep_number(scaled_signed(velocity.horizontal(), 10.0), 2, 1)),
            fields::VEL_HORIZONTAL,
        )
        | pack(scaled(yaw, 5.0), fields::VEL_YAW)
}

/// Attitude and range word: roll and pitch in 0.2° steps offset to be
/// positive, range finder distance in cm
pub fn attitude_range<V: VehicleData + ?Sized>(vehicle: &V) -> u32 {
    let attitude = vehicle.attitude();

    pack(scaled(attitude.roll_deg + 180.0, 5.0), fields::ATT_ROLL)
        | pack(scaled(attitude.pitch_deg + 90.0, 5.0), fields::ATT_PITCH)
        | pack(
            u32::from(prep_number(i32::from(vehicle.rangefinder_cm()), 3, 1)),
            fields::ATT_RANGE,
        )
}

/// GPS coordinate word, latitude or longitude in minutes × 10000
///
/// Bit 31 marks longitude, bit 30 a negative (south / west) value.
pub fn gps_coordinate<V: VehicleData + ?Sized>(vehicle: &V, latitude: bool) -> u32 {
    let gps = vehicle.gps();
    let (value, flags) = if latitude {
        (gps.lat_e7, 0)
    } else {
        (gps.lon_e7, COORD_LONGITUDE)
    };

    let minutes = (value.unsigned_abs() / 100) * 6;
    let sign = if value < 0 { COORD_NEGATIVE } else { 0 };
    (minutes & !(COORD_LONGITUDE | COORD_NEGATIVE)) | flags | sign
}

/// Climb rate in cm/s, two's complement
pub fn vario<V: VehicleData + ?Sized>(vehicle: &V) -> u32 {
    scaled_signed(vehicle.velocity().climb(), 100.0) as u32
}

/// Altitude above home in cm, two's complement
pub fn altitude<V: VehicleData + ?Sized>(vehicle: &V) -> u32 {
    scaled_signed(vehicle.relative_altitude_m(), 100.0) as u32
}

/// Battery voltage in cV
pub fn vfas<V: VehicleData + ?Sized>(vehicle: &V) -> u32 {
    scaled(vehicle.battery().voltage, 100.0)
}

/// Parameter word: id in the top 8 bits, value in the low 24
pub fn parameter(param_id: u8, config: &VehicleConfig) -> u32 {
    let value = match param_id {
        1 => u32::from(config.mav_type),
        2 => scaled(config.fs_batt_voltage, 100.0),
        3 => scaled(config.fs_batt_mah, 1.0),
        4 => scaled(config.pack_capacity_mah, 1.0),
        _ => 0,
    };
    (u32::from(param_id) << 24) | (value & 0xFF_FFFF)
}

/// Cycles through parameter ids 1..=PARAM_COUNT
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParamCycle {
    last: u8,
}

impl ParamCycle {
    pub fn next_id(&mut self) -> u8 {
        self.last = self.last % PARAM_COUNT + 1;
        self.last
    }
}

/// GPS values in the hub's split decimal layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LegacyGps {
    /// Latitude `dddmm`
    pub lat_ddmm: u16,
    /// Latitude minute decimals `.mmmm`
    pub lat_mmmm: u16,
    /// `'N'` or `'S'`
    pub lat_ns: u8,
    pub lon_ddmm: u16,
    pub lon_mmmm: u16,
    /// `'E'` or `'W'`
    pub lon_ew: u8,
    pub speed_m: i16,
    pub speed_cm: i16,
    pub alt_m: i16,
    pub alt_cm: i16,
}

impl LegacyGps {
    pub fn from_fix(gps: &GpsFix) -> Self {
        let (lat_ddmm, lat_mmmm) = split_coordinate(gps.lat_e7);
        let (lon_ddmm, lon_mmmm) = split_coordinate(gps.lon_e7);
        let (alt_m, alt_cm) = split_decimal(gps.alt_msl_cm as f32 * 0.01, 2);
        let (speed_m, speed_cm) = split_decimal(gps.ground_speed, 2);

        Self {
            lat_ddmm,
            lat_mmmm,
            lat_ns: if gps.lat_e7 < 0 { b'S' } else { b'N' },
            lon_ddmm,
            lon_mmmm,
            lon_ew: if gps.lon_e7 < 0 { b'W' } else { b'E' },
            speed_m,
            speed_cm,
            alt_m,
            alt_cm,
        }
    }
}

fn split_coordinate(value_e7: i32) -> (u16, u16) {
    let ddmm = degrees_to_ddmm(f64::from(value_e7) / 1e7);
    let whole = ddmm.trunc();
    (whole as u16, ((ddmm - whole) * 10_000.0) as u16)
}

/// Hub "TEMP2" encoding of the GPS state: satellites × 10 + fix
pub fn gps_sats_and_fix(gps: &GpsFix) -> u16 {
    u16::from(gps.satellites) * 10 + u16::from(gps.fix.wire_value())
}

/// Heading in whole degrees, 0-359
///
/// Taken from the attitude yaw rather than the GPS course over ground, so it
/// is valid while hovering.
pub fn course_deg<V: VehicleData + ?Sized>(vehicle: &V) -> u16 {
    (vehicle.attitude().yaw_deg.rem_euclid(360.0) as u16) % 360
}
