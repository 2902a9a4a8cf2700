//! FrSky S.Port passthrough driver
//!
//! Pushes at most one frame per tick, picked in this order:
//!
//! 1. A group forced by a health mask change
//! 2. The next status text chunk
//! 3. The longitude word owed after a latitude word
//! 4. Whatever group the scheduler selects

use tracing::debug;

use super::{transmit, LinkState};
use crate::config::IntervalConfig;
use crate::error::Result;
use crate::frsky::codec::FrameCodec;
use crate::frsky::protocol::{data_id, SPORT_PUSH_FORMAT};
use crate::serial::Transport;
use crate::telemetry::health::HealthAnnouncer;
use crate::telemetry::payload::{self, ParamCycle};
use crate::telemetry::scheduler::{TelemetryGroup, TelemetryScheduler};
use crate::telemetry::status_text::{OverflowPolicy, Severity, StatusTextQueue};
use crate::telemetry::vehicle::VehicleData;

#[derive(Debug, Clone)]
pub struct PassthroughDriver {
    codec: FrameCodec,
    scheduler: TelemetryScheduler,
    queue: StatusTextQueue,
    health: HealthAnnouncer,
    params: ParamCycle,
    longitude_pending: bool,
}

impl PassthroughDriver {
    pub fn new(intervals: &IntervalConfig, text_repeats: u8, overflow: OverflowPolicy) -> Self {
        Self {
            codec: FrameCodec::new(SPORT_PUSH_FORMAT),
            scheduler: TelemetryScheduler::new(intervals.schedule()),
            queue: StatusTextQueue::new(text_repeats, overflow),
            health: HealthAnnouncer::new(),
            params: ParamCycle::default(),
            longitude_pending: false,
        }
    }

    /// # Errors
    ///
    /// Returns `QueueFull` when the message was dropped
    pub fn enqueue_status(&mut self, text: &str, severity: Severity) -> Result<()> {
        self.queue.enqueue(text, severity)
    }

    pub fn queue(&self) -> &StatusTextQueue {
        &self.queue
    }

    pub fn scheduler(&self) -> &TelemetryScheduler {
        &self.scheduler
    }

    /// Push one frame if anything is due, returning the frame count
    pub fn tick<T, V>(&mut self, transport: &mut T, vehicle: &V, state: &LinkState, now_ms: u64) -> usize
    where
        T: Transport + ?Sized,
        V: VehicleData + ?Sized,
    {
        if transport.tx_space() < SPORT_PUSH_FORMAT.max_frame_len() {
            return 0;
        }

        if let Some(text) = self.health.poll(state.health_mask, now_ms) {
            if let Err(e) = self.queue.enqueue(text, Severity::Critical) {
                debug!("Health text dropped ({}): {}", e, text);
            }
        }
        self.scheduler.observe_health(state.health_mask);

        let Some((id, value)) = self.next_item(vehicle, state, now_ms) else {
            return 0;
        };

        let frame = self.codec.frame_word32(id, value);
        usize::from(transmit(transport, &frame))
    }

    fn next_item<V: VehicleData + ?Sized>(
        &mut self,
        vehicle: &V,
        state: &LinkState,
        now_ms: u64,
    ) -> Option<(u16, u32)> {
        if !self.scheduler.has_forced() {
            if let Some(chunk) = self.queue.next_chunk() {
                return Some((data_id::DIY_FIRST, chunk));
            }
            if self.longitude_pending {
                self.longitude_pending = false;
                return Some((data_id::GPS_LONG_LATI_FIRST, payload::gps_coordinate(vehicle, false)));
            }
        }

        let group = self.scheduler.select(now_ms)?;
        Some((group.data_id(), self.group_word(group, vehicle, state)))
    }

    fn group_word<V: VehicleData + ?Sized>(
        &mut self,
        group: TelemetryGroup,
        vehicle: &V,
        state: &LinkState,
    ) -> u32 {
        match group {
            TelemetryGroup::AutopilotStatus => payload::autopilot_status(vehicle, state.flight_mode),
            TelemetryGroup::GpsPosition => {
                self.longitude_pending = true;
                payload::gps_coordinate(vehicle, true)
            }
            TelemetryGroup::GpsStatus => payload::gps_status(vehicle),
            TelemetryGroup::Battery => payload::battery(vehicle),
            TelemetryGroup::Vfas => payload::vfas(vehicle),
            TelemetryGroup::AttitudeRange => payload::attitude_range(vehicle),
            TelemetryGroup::VelocityYaw => payload::velocity_yaw(vehicle),
            TelemetryGroup::Home => payload::home(vehicle),
            TelemetryGroup::Vario => payload::vario(vehicle),
            TelemetryGroup::BaroAltitude => payload::altitude(vehicle),
            TelemetryGroup::Parameters => payload::parameter(self.params.next_id(), &state.vehicle),
        }
    }
}
