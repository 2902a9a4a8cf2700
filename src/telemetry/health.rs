//! # Sensor Health
//!
//! The health mask uses the MAVLink `SYS_STATUS` sensor bits: a set bit means
//! the subsystem is present but not working. While any bit is set, the
//! announcer produces one status text naming the most important failure,
//! at most once per [`ANNOUNCE_INTERVAL_MS`].

/// MAVLink `MAV_SYS_STATUS_SENSOR_*` bits
pub mod sensor {
    pub const GYRO_3D: u32 = 0x01;
    pub const ACCEL_3D: u32 = 0x02;
    pub const MAG_3D: u32 = 0x04;
    pub const ABSOLUTE_PRESSURE: u32 = 0x08;
    pub const DIFFERENTIAL_PRESSURE: u32 = 0x10;
    pub const GPS: u32 = 0x20;
    pub const OPTICAL_FLOW: u32 = 0x40;
    pub const VISION_POSITION: u32 = 0x80;
    pub const LASER_POSITION: u32 = 0x100;
    pub const RC_RECEIVER: u32 = 0x1_0000;
    pub const GEOFENCE: u32 = 0x10_0000;
    pub const AHRS: u32 = 0x20_0000;
    pub const TERRAIN: u32 = 0x40_0000;
    pub const LOGGING: u32 = 0x100_0000;
}

/// Minimum time between two health announcements
pub const ANNOUNCE_INTERVAL_MS: u64 = 5_000;

/// Failures in reporting order, same wording as the ground station
const HEALTH_MESSAGES: [(u32, &str); 11] = [
    (sensor::GYRO_3D, "Bad Gyro Health"),
    (sensor::ACCEL_3D, "Bad Accel Health"),
    (sensor::MAG_3D, "Bad Compass Health"),
    (sensor::ABSOLUTE_PRESSURE, "Bad Baro Health"),
    (sensor::LASER_POSITION, "Bad LiDAR Health"),
    (sensor::OPTICAL_FLOW, "Bad OptFlow Health"),
    (sensor::TERRAIN, "Bad or No Terrain Data"),
    (sensor::GEOFENCE, "Geofence Breach"),
    (sensor::AHRS, "Bad AHRS"),
    (sensor::RC_RECEIVER, "No RC Receiver"),
    (sensor::LOGGING, "Bad Logging"),
];

/// Text describing the most important failure in `mask`
pub fn describe(mask: u32) -> Option<&'static str> {
    HEALTH_MESSAGES
        .iter()
        .find(|(bit, _)| mask & bit != 0)
        .map(|&(_, text)| text)
}

/// Rate-limited health announcer
#[derive(Debug, Clone, Default)]
pub struct HealthAnnouncer {
    last_announce_ms: Option<u64>,
}

impl HealthAnnouncer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Message to queue now, if any
    ///
    /// The interval only restarts when something is announced, so a failure
    /// that appears after a quiet period is reported immediately.
    pub fn poll(&mut self, mask: u32, now_ms: u64) -> Option<&'static str> {
        if let Some(last) = self.last_announce_ms {
            if now_ms.saturating_sub(last) < ANNOUNCE_INTERVAL_MS {
                return None;
            }
        }

        let text = describe(mask)?;
        self.last_announce_ms = Some(now_ms);
        Some(text)
    }
}
