//! FrSky D (hub) driver
//!
//! Pushes two batches of 16-bit data items: a fast batch of GPS and
//! altitude values and a slow batch of status values. Two-part values are
//! sent as consecutive before-point / after-point items.

use tracing::trace;

use super::{transmit, LinkState};
use crate::config::HubConfig;
use crate::frsky::codec::FrameCodec;
use crate::frsky::packer::{scaled, split_decimal};
use crate::frsky::protocol::{hub_id, HUB_FORMAT};
use crate::serial::Transport;
use crate::telemetry::payload::{self, LegacyGps};
use crate::telemetry::vehicle::VehicleData;

#[derive(Debug, Clone)]
pub struct HubDriver {
    codec: FrameCodec,
    fast_interval_ms: u64,
    slow_interval_ms: u64,
    last_fast_ms: Option<u64>,
    last_slow_ms: Option<u64>,
}

fn is_due(last_ms: Option<u64>, interval_ms: u64, now_ms: u64) -> bool {
    last_ms.map_or(true, |last| now_ms.saturating_sub(last) >= interval_ms)
}

impl HubDriver {
    pub fn new(config: &HubConfig) -> Self {
        Self {
            codec: FrameCodec::new(HUB_FORMAT),
            fast_interval_ms: config.fast_interval_ms,
            slow_interval_ms: config.slow_interval_ms,
            last_fast_ms: None,
            last_slow_ms: None,
        }
    }

    /// Send whichever batches are due, returning the frame count
    pub fn tick<T, V>(&mut self, transport: &mut T, vehicle: &V, state: &LinkState, now_ms: u64) -> usize
    where
        T: Transport + ?Sized,
        V: VehicleData + ?Sized,
    {
        let mut items = Vec::new();

        if is_due(self.last_slow_ms, self.slow_interval_ms, now_ms) {
            self.last_slow_ms = Some(now_ms);
            slow_items(vehicle, state, &mut items);
        }

        if is_due(self.last_fast_ms, self.fast_interval_ms, now_ms) {
            self.last_fast_ms = Some(now_ms);
            fast_items(vehicle, &mut items);
        }

        if items.is_empty() {
            return 0;
        }

        let sent = items
            .into_iter()
            .filter(|&(id, value)| {
                let frame = self.codec.frame_word16(id, value);
                transmit(transport, &frame)
            })
            .count();
        trace!("Hub batch: {} items sent", sent);
        sent
    }
}

/// Status values, sent every slow interval
fn slow_items<V: VehicleData + ?Sized>(vehicle: &V, state: &LinkState, items: &mut Vec<(u8, u16)>) {
    let battery = vehicle.battery();

    items.push((hub_id::TEMP1, u16::from(state.flight_mode)));
    items.push((hub_id::TEMP2, payload::gps_sats_and_fix(&vehicle.gps())));
    items.push((hub_id::FUEL, u16::from(battery.remaining_pct)));
    items.push((hub_id::VFAS, scaled(battery.voltage, 10.0).min(u32::from(u16::MAX)) as u16));
    items.push((hub_id::CURRENT, scaled(battery.current_amps, 10.0).min(u32::from(u16::MAX)) as u16));
}

/// Position values, sent every fast interval
///
/// GPS items are only sent with a 3D fix.
fn fast_items<V: VehicleData + ?Sized>(vehicle: &V, items: &mut Vec<(u8, u16)>) {
    let fix = vehicle.gps();
    if fix.fix.has_3d_fix() {
        let gps = LegacyGps::from_fix(&fix);
        items.extend([
            (hub_id::GPS_LAT_BP, gps.lat_ddmm),
            (hub_id::GPS_LAT_AP, gps.lat_mmmm),
            (hub_id::GPS_LAT_NS, u16::from(gps.lat_ns)),
            (hub_id::GPS_LONG_BP, gps.lon_ddmm),
            (hub_id::GPS_LONG_AP, gps.lon_mmmm),
            (hub_id::GPS_LONG_EW, u16::from(gps.lon_ew)),
            (hub_id::GPS_SPEED_BP, gps.speed_m as u16),
            (hub_id::GPS_SPEED_AP, gps.speed_cm as u16),
            (hub_id::GPS_ALT_BP, gps.alt_m as u16),
            (hub_id::GPS_ALT_AP, gps.alt_cm as u16),
            (hub_id::GPS_COURSE_BP, payload::course_deg(vehicle)),
        ]);
    }

    let (alt_m, alt_cm) = split_decimal(vehicle.relative_altitude_m(), 2);
    items.push((hub_id::BARO_ALT_BP, alt_m as u16));
    items.push((hub_id::BARO_ALT_AP, alt_cm as u16));
}
