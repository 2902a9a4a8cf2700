//! FrSky S.Port (polled) driver
//!
//! The receiver polls each physical sensor id in turn with `0x7E <id>`. When
//! the id is one this encoder emulates, exactly one data frame is sent back
//! before the receiver moves on. Sensors carrying several values rotate
//! through them with one counter per sensor id.

use tracing::{debug, trace};

use super::{transmit, LinkState};
use crate::error::{Result, TelemetryError};
use crate::frsky::codec::FrameCodec;
use crate::frsky::packer::{scaled, split_decimal};
use crate::frsky::protocol::{hub_id, sensor_id, SPORT_POLLED_FORMAT, SPORT_START_STOP};
use crate::serial::Transport;
use crate::telemetry::payload::{self, LegacyGps};
use crate::telemetry::vehicle::VehicleData;

/// Cycles through the `len` values served under one sensor id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundRobin {
    len: u8,
    next: u8,
}

impl RoundRobin {
    pub const fn new(len: u8) -> Self {
        Self { len, next: 0 }
    }

    /// Index to serve now; the cycle is exactly `len` calls long
    pub fn advance(&mut self) -> u8 {
        let index = self.next;
        self.next = (self.next + 1) % self.len.max(1);
        index
    }
}

#[derive(Debug, Clone)]
pub struct SportDriver {
    codec: FrameCodec,
    /// Last byte was a poll start
    poll_started: bool,
    fas: RoundRobin,
    gps: RoundRobin,
    vario: RoundRobin,
    sp2ur: RoundRobin,
    /// GPS values, refreshed at the start of each GPS cycle
    gps_snapshot: LegacyGps,
    /// Altitude before / after point, refreshed at the start of each vario cycle
    nav_alt: (i16, i16),
}

impl Default for SportDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SportDriver {
    pub fn new() -> Self {
        Self {
            codec: FrameCodec::new(SPORT_POLLED_FORMAT),
            poll_started: false,
            fas: RoundRobin::new(3),
            gps: RoundRobin::new(11),
            vario: RoundRobin::new(2),
            sp2ur: RoundRobin::new(2),
            gps_snapshot: LegacyGps::default(),
            nav_alt: (0, 0),
        }
    }

    /// Answer every poll received since the last tick
    pub fn tick<T, V>(&mut self, transport: &mut T, vehicle: &V, state: &LinkState) -> usize
    where
        T: Transport + ?Sized,
        V: VehicleData + ?Sized,
    {
        let mut sent = 0;

        while let Some(byte) = transport.read_byte() {
            if byte == SPORT_START_STOP {
                self.poll_started = true;
                continue;
            }
            if !self.poll_started {
                continue;
            }
            self.poll_started = false;

            match self.respond(byte, vehicle, state) {
                Ok((id, value)) => {
                    trace!("Poll 0x{:02X}: item 0x{:04X} = {}", byte, id, value);
                    let frame = self.codec.frame_word32(id, value);
                    if transmit(transport, &frame) {
                        sent += 1;
                    }
                }
                Err(e) => debug!("Poll ignored: {}", e),
            }
        }

        sent
    }

    /// Data item to send for a poll of `sensor`
    ///
    /// # Errors
    ///
    /// Returns `UnknownPollId` for sensor ids this encoder does not emulate
    pub fn respond<V: VehicleData + ?Sized>(
        &mut self,
        sensor: u8,
        vehicle: &V,
        state: &LinkState,
    ) -> Result<(u16, u32)> {
        let (id, value) = match sensor {
            sensor_id::FAS => {
                let battery = vehicle.battery();
                match self.fas.advance() {
                    0 => (hub_id::FUEL, u32::from(battery.remaining_pct)),
                    1 => (hub_id::VFAS, scaled(battery.voltage, 10.0)),
                    _ => (hub_id::CURRENT, scaled(battery.current_amps, 10.0)),
                }
            }
            sensor_id::GPS => {
                let index = self.gps.advance();
                if index == 0 {
                    self.gps_snapshot = LegacyGps::from_fix(&vehicle.gps());
                }
                let gps = &self.gps_snapshot;
                match index {
                    0 => (hub_id::GPS_LAT_BP, u32::from(gps.lat_ddmm)),
                    1 => (hub_id::GPS_LAT_AP, u32::from(gps.lat_mmmm)),
                    2 => (hub_id::GPS_LAT_NS, u32::from(gps.lat_ns)),
                    3 => (hub_id::GPS_LONG_BP, u32::from(gps.lon_ddmm)),
                    4 => (hub_id::GPS_LONG_AP, u32::from(gps.lon_mmmm)),
                    5 => (hub_id::GPS_LONG_EW, u32::from(gps.lon_ew)),
                    6 => (hub_id::GPS_SPEED_BP, gps.speed_m as u32),
                    7 => (hub_id::GPS_SPEED_AP, u32::from(gps.speed_cm as u16)),
                    8 => (hub_id::GPS_ALT_BP, gps.alt_m as u32),
                    9 => (hub_id::GPS_ALT_AP, u32::from(gps.alt_cm as u16)),
                    _ => (hub_id::GPS_COURSE_BP, u32::from(payload::course_deg(vehicle))),
                }
            }
            sensor_id::VARIO => {
                let index = self.vario.advance();
                if index == 0 {
                    self.nav_alt = split_decimal(vehicle.relative_altitude_m(), 2);
                }
                match index {
                    0 => (hub_id::BARO_ALT_BP, self.nav_alt.0 as u32),
                    _ => (hub_id::BARO_ALT_AP, u32::from(self.nav_alt.1 as u16)),
                }
            }
            sensor_id::SP2UR => match self.sp2ur.advance() {
                0 => (hub_id::TEMP2, u32::from(payload::gps_sats_and_fix(&vehicle.gps()))),
                _ => (hub_id::TEMP1, u32::from(state.flight_mode)),
            },
            other => return Err(TelemetryError::UnknownPollId(other)),
        };

        Ok((u16::from(id), value))
    }
}
