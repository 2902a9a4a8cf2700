//! # Protocol Drivers
//!
//! One driver per wire protocol, chosen once when the [`Encoder`] is built:
//!
//! - [`HubDriver`]: FrSky D receivers, pushes two batches on fixed cadences
//! - [`SportDriver`]: FrSky X receivers, answers each poll with one frame
//! - [`PassthroughDriver`]: pushes one multiplexed frame per tick
//!
//! The encoder is the control surface the flight controller talks to. It
//! owns the transport and the vehicle data source; `tick()` is called at a
//! fixed rate and never blocks or returns an error.

pub mod hub;
pub mod passthrough;
pub mod sport;

pub use hub::HubDriver;
pub use passthrough::PassthroughDriver;
pub use sport::SportDriver;

use tracing::{debug, info, trace};

use crate::config::{Config, VehicleConfig};
use crate::error::{Result, TelemetryError};
use crate::frsky::protocol::Protocol;
use crate::serial::Transport;
use crate::telemetry::status_text::Severity;
use crate::telemetry::vehicle::VehicleData;

/// Flight controller state pushed through the control surface
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkState {
    /// Zero-based flight mode number
    pub flight_mode: u8,
    /// MAVLink `SYS_STATUS` sensor error bits
    pub health_mask: u32,
    pub vehicle: VehicleConfig,
}

/// Active protocol driver
#[derive(Debug)]
pub enum Driver {
    Hub(HubDriver),
    Sport(SportDriver),
    Passthrough(PassthroughDriver),
}

impl Driver {
    pub fn new(protocol: Protocol, config: &Config) -> Self {
        match protocol {
            Protocol::Hub => Driver::Hub(HubDriver::new(&config.hub)),
            Protocol::Sport => Driver::Sport(SportDriver::new()),
            Protocol::Passthrough => Driver::Passthrough(PassthroughDriver::new(
                &config.intervals,
                config.telemetry.text_repeats,
                config.telemetry.queue_overflow,
            )),
        }
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            Driver::Hub(_) => Protocol::Hub,
            Driver::Sport(_) => Protocol::Sport,
            Driver::Passthrough(_) => Protocol::Passthrough,
        }
    }
}

/// Write one complete frame, or nothing
///
/// A frame that does not fit in the transmit space is abandoned; the next
/// tick starts a fresh one.
pub(crate) fn transmit<T: Transport + ?Sized>(transport: &mut T, frame: &[u8]) -> bool {
    if transport.tx_space() < frame.len() {
        debug!("No room for {} byte frame, dropped", frame.len());
        return false;
    }

    let written = transport.write(frame);
    if written < frame.len() {
        debug!("Frame cut short after {} of {} bytes", written, frame.len());
        return false;
    }

    trace!("Frame out: {:02X?}", frame);
    true
}

/// Telemetry encoder bound to one transport and one protocol
///
/// # Examples
///
/// ```
/// use frsky_telem::config::Config;
/// use frsky_telem::driver::Encoder;
/// use frsky_telem::frsky::protocol::Protocol;
/// use frsky_telem::serial::LinkBuffer;
/// use frsky_telem::telemetry::status_text::Severity;
/// use frsky_telem::telemetry::vehicle::StaticVehicle;
///
/// let config = Config::default();
/// let mut encoder = Encoder::new(
///     LinkBuffer::default(),
///     Protocol::Passthrough,
///     StaticVehicle::default(),
///     &config,
/// )?;
///
/// encoder.enqueue_status("Armed", Severity::Info);
/// assert_eq!(encoder.tick(0), 1);
/// assert_eq!(&encoder.transport_mut().take_outbound()[..2], &[0x7E, 0x1B]);
/// # Ok::<(), frsky_telem::error::TelemetryError>(())
/// ```
#[derive(Debug)]
pub struct Encoder<T: Transport, V: VehicleData> {
    transport: T,
    vehicle: V,
    driver: Driver,
    state: LinkState,
    frames_sent: u64,
}

impl<T: Transport, V: VehicleData> Encoder<T, V> {
    /// Bind the encoder to a transport and protocol
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` if the configuration fails validation
    /// - `TransportUnavailable` if the transport is not ready
    pub fn new(transport: T, protocol: Protocol, vehicle: V, config: &Config) -> Result<Self> {
        config.validate()?;

        if !transport.is_ready() {
            return Err(TelemetryError::TransportUnavailable);
        }

        info!("Telemetry encoder started ({} protocol)", protocol);

        Ok(Self {
            transport,
            vehicle,
            driver: Driver::new(protocol, config),
            state: LinkState {
                vehicle: config.vehicle.clone(),
                ..LinkState::default()
            },
            frames_sent: 0,
        })
    }

    /// Queue a status text for the ground station
    ///
    /// Only the passthrough protocol has a text channel; other protocols and
    /// a full queue drop the message.
    pub fn enqueue_status(&mut self, text: &str, severity: Severity) {
        match &mut self.driver {
            Driver::Passthrough(driver) => {
                if let Err(e) = driver.enqueue_status(text, severity) {
                    debug!("Status text dropped ({}): {}", e, text);
                }
            }
            other => debug!(
                "Status text dropped, {} protocol has no text channel: {}",
                other.protocol(),
                text
            ),
        }
    }

    pub fn set_flight_mode(&mut self, mode: u8) {
        self.state.flight_mode = mode;
    }

    pub fn set_health_mask(&mut self, mask: u32) {
        self.state.health_mask = mask;
    }

    /// Run one scheduling step at time `now_ms`
    ///
    /// Returns the number of frames written.
    pub fn tick(&mut self, now_ms: u64) -> usize {
        if !self.transport.is_ready() {
            trace!("Transport not ready, tick skipped");
            return 0;
        }

        let sent = match &mut self.driver {
            Driver::Hub(driver) => {
                driver.tick(&mut self.transport, &self.vehicle, &self.state, now_ms)
            }
            Driver::Sport(driver) => driver.tick(&mut self.transport, &self.vehicle, &self.state),
            Driver::Passthrough(driver) => {
                driver.tick(&mut self.transport, &self.vehicle, &self.state, now_ms)
            }
        };

        self.frames_sent += sent as u64;
        sent
    }

    pub fn protocol(&self) -> Protocol {
        self.driver.protocol()
    }

    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    pub fn state(&self) -> &LinkState {
        &self.state
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn vehicle_mut(&mut self) -> &mut V {
        &mut self.vehicle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frsky::decoder::{decode_sport_frame, split_frames};
    use crate::frsky::protocol::{data_id, sensor_id, SPORT_PUSH_FORMAT, SPORT_START_STOP};
    use crate::serial::transport::MockTransport;
    use crate::serial::LinkBuffer;
    use crate::telemetry::vehicle::*;

    fn mock_vehicle() -> MockVehicleData {
        let mut vehicle = MockVehicleData::new();
        vehicle.expect_attitude().return_const(Attitude::default());
        vehicle.expect_velocity().return_const(Velocity::default());
        vehicle.expect_gps().return_const(GpsFix {
            fix: FixType::Fix3D,
            satellites: 9,
            ..GpsFix::default()
        });
        vehicle.expect_battery().return_const(BatteryState {
            voltage: 16.8,
            ..BatteryState::default()
        });
        vehicle.expect_relative_altitude_m().return_const(0.0f32);
        vehicle.expect_rangefinder_cm().return_const(0u16);
        vehicle.expect_home().return_const(None::<HomeInfo>);
        vehicle.expect_arming().return_const(ArmingState::default());
        vehicle
    }

    fn passthrough_encoder() -> Encoder<LinkBuffer, MockVehicleData> {
        Encoder::new(
            LinkBuffer::new(256),
            Protocol::Passthrough,
            mock_vehicle(),
            &Config::default(),
        )
        .unwrap()
    }

    fn sent_words(encoder: &mut Encoder<LinkBuffer, MockVehicleData>) -> Vec<(u16, u32)> {
        let out = encoder.transport_mut().take_outbound();
        split_frames(&SPORT_PUSH_FORMAT, &out)
            .into_iter()
            .map(|frame| decode_sport_frame(&SPORT_PUSH_FORMAT, frame).unwrap())
            .collect()
    }

    #[test]
    fn test_new_rejects_unready_transport() {
        let mut transport = MockTransport::new();
        transport.expect_is_ready().return_const(false);

        let result = Encoder::new(transport, Protocol::Hub, mock_vehicle(), &Config::default());
        assert!(matches!(result, Err(TelemetryError::TransportUnavailable)));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = Config::default();
        config.telemetry.text_repeats = 0;

        let result = Encoder::new(LinkBuffer::default(), Protocol::Sport, mock_vehicle(), &config);
        assert!(matches!(result, Err(TelemetryError::InvalidConfig(_))));
    }

    #[test]
    fn test_tick_is_noop_when_transport_down() {
        let mut encoder = passthrough_encoder();
        encoder.transport_mut().set_ready(false);

        assert_eq!(encoder.tick(0), 0);
        assert_eq!(encoder.transport().outbound_len(), 0);
        assert_eq!(encoder.frames_sent(), 0);
    }

    #[test]
    fn test_tick_never_writes_to_unready_transport() {
        let mut transport = MockTransport::new();
        let mut ready = true;
        transport.expect_is_ready().returning(move || std::mem::replace(&mut ready, false));
        transport.expect_write().never();

        let mut encoder =
            Encoder::new(transport, Protocol::Passthrough, mock_vehicle(), &Config::default())
                .unwrap();
        assert_eq!(encoder.tick(0), 0);
    }

    #[test]
    fn test_protocol_fixed_at_construction() {
        let encoder = passthrough_encoder();
        assert_eq!(encoder.protocol(), Protocol::Passthrough);
        assert!(matches!(encoder.driver(), Driver::Passthrough(_)));
    }

    #[test]
    fn test_status_text_before_telemetry() {
        let mut encoder = passthrough_encoder();
        encoder.enqueue_status("Hi", Severity::Info);

        for now in 0..3 {
            assert_eq!(encoder.tick(now), 1);
        }
        encoder.tick(3);

        let words = sent_words(&mut encoder);
        assert_eq!(words.len(), 4);
        for &(id, _) in &words[..3] {
            assert_eq!(id, data_id::DIY_FIRST);
        }
        assert_eq!(words[3].0, data_id::DIY_FIRST + 1);
        assert_eq!(encoder.frames_sent(), 4);
    }

    #[test]
    fn test_flight_mode_reaches_autopilot_status() {
        let mut encoder = passthrough_encoder();
        encoder.set_flight_mode(4);
        encoder.tick(0);

        let words = sent_words(&mut encoder);
        assert_eq!(words, vec![(data_id::DIY_FIRST + 1, 5)]);
    }

    #[test]
    fn test_health_change_sends_status_next_tick() {
        let mut encoder = passthrough_encoder();
        // drain the never-sent groups first
        for now in 0..20 {
            encoder.tick(now);
        }
        encoder.transport_mut().take_outbound();

        encoder.set_health_mask(0x04);
        assert_eq!(encoder.tick(20), 1);
        let words = sent_words(&mut encoder);
        assert_eq!(words[0].0, data_id::DIY_FIRST + 1);

        // the health text follows
        encoder.tick(21);
        let words = sent_words(&mut encoder);
        assert_eq!(words[0].0, data_id::DIY_FIRST);
    }

    #[test]
    fn test_status_text_ignored_without_text_channel() {
        let mut encoder = Encoder::new(
            LinkBuffer::default(),
            Protocol::Hub,
            mock_vehicle(),
            &Config::default(),
        )
        .unwrap();
        encoder.enqueue_status("ignored", Severity::Warning);
        assert!(encoder.tick(0) > 0);
    }

    #[test]
    fn test_sport_encoder_answers_poll() {
        let mut encoder = Encoder::new(
            LinkBuffer::default(),
            Protocol::Sport,
            mock_vehicle(),
            &Config::default(),
        )
        .unwrap();

        assert_eq!(encoder.tick(0), 0);
        encoder
            .transport_mut()
            .push_inbound(&[SPORT_START_STOP, sensor_id::FAS]);
        assert_eq!(encoder.tick(1), 1);
        assert_eq!(encoder.transport().outbound_len(), 8);
    }

    #[test]
    fn test_vehicle_and_state_accessors() {
        let mut encoder = Encoder::new(
            LinkBuffer::default(),
            Protocol::Passthrough,
            StaticVehicle::default(),
            &Config::default(),
        )
        .unwrap();
        encoder.vehicle_mut().rangefinder_cm = 120;
        encoder.set_health_mask(0x01);
        encoder.set_flight_mode(2);

        assert_eq!(encoder.state().health_mask, 0x01);
        assert_eq!(encoder.state().flight_mode, 2);
        assert_eq!(encoder.state().vehicle, VehicleConfig::default());
    }
}
