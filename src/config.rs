//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field has a default, so an empty file is a valid
//! configuration for a passthrough link on `/dev/ttyS1`.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, TelemetryError};
use crate::frsky::protocol::Protocol;
use crate::telemetry::scheduler::TelemetryGroup;
use crate::telemetry::status_text::OverflowPolicy;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    pub telemetry: TelemetryConfig,
    pub vehicle: VehicleConfig,
    pub intervals: IntervalConfig,
    pub hub: HubConfig,
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    /// Overrides the protocol's native baud rate
    #[serde(default)]
    pub baud_rate: Option<u32>,
}

/// Encoder behaviour
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TelemetryConfig {
    #[serde(default = "default_protocol")]
    pub protocol: Protocol,

    /// Times each status text chunk is sent
    #[serde(default = "default_text_repeats")]
    pub text_repeats: u8,

    #[serde(default)]
    pub queue_overflow: OverflowPolicy,

    #[serde(default = "default_tick_rate_hz")]
    pub tick_rate_hz: u32,
}

/// Static vehicle parameters reported by the parameter group
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct VehicleConfig {
    /// MAVLink `MAV_TYPE`
    #[serde(default = "default_mav_type")]
    pub mav_type: u8,

    /// Battery failsafe voltage in volts
    #[serde(default = "default_fs_batt_voltage")]
    pub fs_batt_voltage: f32,

    /// Battery failsafe remaining capacity in mAh
    #[serde(default = "default_fs_batt_mah")]
    pub fs_batt_mah: f32,

    #[serde(default = "default_pack_capacity_mah")]
    pub pack_capacity_mah: f32,
}

/// Minimum interval per passthrough group, in milliseconds
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct IntervalConfig {
    #[serde(default = "default_autopilot_status_ms")]
    pub autopilot_status_ms: u64,
    #[serde(default = "default_gps_position_ms")]
    pub gps_position_ms: u64,
    #[serde(default = "default_gps_status_ms")]
    pub gps_status_ms: u64,
    #[serde(default = "default_battery_ms")]
    pub battery_ms: u64,
    #[serde(default = "default_vfas_ms")]
    pub vfas_ms: u64,
    #[serde(default = "default_attitude_range_ms")]
    pub attitude_range_ms: u64,
    #[serde(default = "default_velocity_yaw_ms")]
    pub velocity_yaw_ms: u64,
    #[serde(default = "default_home_ms")]
    pub home_ms: u64,
    #[serde(default = "default_vario_ms")]
    pub vario_ms: u64,
    #[serde(default = "default_baro_altitude_ms")]
    pub baro_altitude_ms: u64,
    #[serde(default = "default_parameters_ms")]
    pub parameters_ms: u64,
}

/// Hub cadences
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HubConfig {
    #[serde(default = "default_hub_fast_interval_ms")]
    pub fast_interval_ms: u64,

    #[serde(default = "default_hub_slow_interval_ms")]
    pub slow_interval_ms: u64,
}

/// Logging outputs besides stderr
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct LoggingConfig {
    /// Also write logs to this file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyS1".to_string() }

fn default_protocol() -> Protocol { Protocol::Passthrough }
fn default_text_repeats() -> u8 { crate::telemetry::status_text::DEFAULT_REPEATS }
fn default_tick_rate_hz() -> u32 { 1000 }

fn default_mav_type() -> u8 { 2 }
fn default_fs_batt_voltage() -> f32 { 10.5 }
fn default_fs_batt_mah() -> f32 { 0.0 }
fn default_pack_capacity_mah() -> f32 { 3300.0 }

fn default_autopilot_status_ms() -> u64 { 500 }
fn default_gps_position_ms() -> u64 { 1000 }
fn default_gps_status_ms() -> u64 { 1000 }
fn default_battery_ms() -> u64 { 1000 }
fn default_vfas_ms() -> u64 { 1000 }
fn default_attitude_range_ms() -> u64 { 100 }
fn default_velocity_yaw_ms() -> u64 { 500 }
fn default_home_ms() -> u64 { 500 }
fn default_vario_ms() -> u64 { 200 }
fn default_baro_altitude_ms() -> u64 { 1000 }
fn default_parameters_ms() -> u64 { 1000 }

fn default_hub_fast_interval_ms() -> u64 { 200 }
fn default_hub_slow_interval_ms() -> u64 { 1000 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: None,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            protocol: default_protocol(),
            text_repeats: default_text_repeats(),
            queue_overflow: OverflowPolicy::default(),
            tick_rate_hz: default_tick_rate_hz(),
        }
    }
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            mav_type: default_mav_type(),
            fs_batt_voltage: default_fs_batt_voltage(),
            fs_batt_mah: default_fs_batt_mah(),
            pack_capacity_mah: default_pack_capacity_mah(),
        }
    }
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            autopilot_status_ms: default_autopilot_status_ms(),
            gps_position_ms: default_gps_position_ms(),
            gps_status_ms: default_gps_status_ms(),
            battery_ms: default_battery_ms(),
            vfas_ms: default_vfas_ms(),
            attitude_range_ms: default_attitude_range_ms(),
            velocity_yaw_ms: default_velocity_yaw_ms(),
            home_ms: default_home_ms(),
            vario_ms: default_vario_ms(),
            baro_altitude_ms: default_baro_altitude_ms(),
            parameters_ms: default_parameters_ms(),
        }
    }
}

impl IntervalConfig {
    /// Configured interval of one group
    pub fn interval_ms(&self, group: TelemetryGroup) -> u64 {
        match group {
            TelemetryGroup::AutopilotStatus => self.autopilot_status_ms,
            TelemetryGroup::GpsPosition => self.gps_position_ms,
            TelemetryGroup::GpsStatus => self.gps_status_ms,
            TelemetryGroup::Battery => self.battery_ms,
            TelemetryGroup::Vfas => self.vfas_ms,
            TelemetryGroup::AttitudeRange => self.attitude_range_ms,
            TelemetryGroup::VelocityYaw => self.velocity_yaw_ms,
            TelemetryGroup::Home => self.home_ms,
            TelemetryGroup::Vario => self.vario_ms,
            TelemetryGroup::BaroAltitude => self.baro_altitude_ms,
            TelemetryGroup::Parameters => self.parameters_ms,
        }
    }

    /// `(group, interval)` pairs for every group
    pub fn schedule(&self) -> impl Iterator<Item = (TelemetryGroup, u64)> + '_ {
        TelemetryGroup::ALL
            .into_iter()
            .map(|group| (group, self.interval_ms(group)))
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            fast_interval_ms: default_hub_fast_interval_ms(),
            slow_interval_ms: default_hub_slow_interval_ms(),
        }
    }
}

/// Baud rates the receivers accept
const ALLOWED_BAUD_RATES: [u32; 3] = [9_600, 57_600, 115_200];

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use frsky_telem::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Baud rate to open the port at
    pub fn baud_rate(&self) -> u32 {
        self.serial
            .baud_rate
            .unwrap_or_else(|| self.telemetry.protocol.default_baud_rate())
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first value out of range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if let Some(baud) = self.serial.baud_rate {
            if !ALLOWED_BAUD_RATES.contains(&baud) {
                return Err(invalid("baud_rate must be one of: 9600, 57600, 115200"));
            }
        }

        if !(1..=10).contains(&self.telemetry.text_repeats) {
            return Err(invalid("text_repeats must be between 1 and 10"));
        }

        if self.telemetry.tick_rate_hz == 0 || self.telemetry.tick_rate_hz > 1000 {
            return Err(invalid("tick_rate_hz must be between 1 and 1000"));
        }

        if self.vehicle.fs_batt_voltage < 0.0
            || self.vehicle.fs_batt_mah < 0.0
            || self.vehicle.pack_capacity_mah < 0.0
        {
            return Err(invalid("vehicle failsafe and capacity values cannot be negative"));
        }

        for (group, interval) in self.intervals.schedule() {
            if interval == 0 || interval > 60_000 {
                return Err(invalid(format!(
                    "interval for {:?} must be between 1 and 60000 ms",
                    group
                )));
            }
        }

        if self.hub.fast_interval_ms == 0 || self.hub.fast_interval_ms > 60_000 {
            return Err(invalid("hub fast_interval_ms must be between 1 and 60000"));
        }

        if self.hub.slow_interval_ms < self.hub.fast_interval_ms
            || self.hub.slow_interval_ms > 60_000
        {
            return Err(invalid(
                "hub slow_interval_ms must be between fast_interval_ms and 60000",
            ));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> TelemetryError {
    TelemetryError::InvalidConfig(message.into())
}
