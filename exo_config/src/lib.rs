#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the hip admittance controller.
//!
//! `Config` and sub-structs are deserialized from TOML and validated before
//! anything touches the hardware. Validation rejects out-of-domain values
//! instead of clamping them, so a bad config is visible, not silently fixed.
use serde::Deserialize;

/// Device addressing. The core never interprets these; the CLI hands them
/// to the concrete sensor/actuator implementations.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Device {
    /// Serial device carrying load-cell frames (one ASCII weight per line).
    pub serial_port: String,
    /// Baud rate, informational; the port must already be configured.
    pub baud: u32,
    /// CAN interface name for the motor driver.
    pub can_interface: String,
    /// Motor node id on the bus.
    pub motor_id: u8,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            serial_port: "/dev/ttyUSB0".into(),
            baud: 115_200,
            can_interface: "can0".into(),
            motor_id: 1,
        }
    }
}

/// Control loop rate and safety band.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Control {
    /// Tick rate in Hz.
    pub frequency_hz: u32,
    /// Hard clamp on the commanded velocity magnitude (rad/s). Hardware
    /// protection; applied after the admittance law, never bypassed.
    pub velocity_limit: f64,
    /// Velocity-mode damping gain handed to the actuator at startup.
    pub kd: f64,
    /// Wait after zeroing the motor position before calibration (ms).
    pub zero_settle_ms: u64,
}

impl Default for Control {
    fn default() -> Self {
        Self {
            frequency_hz: 1000,
            velocity_limit: 1.0,
            kd: 3.0,
            zero_settle_ms: 3000,
        }
    }
}

/// Virtual dynamics coefficients and the torque filter gain.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Admittance {
    /// Virtual mass (kg·m²). Must be > 0.
    pub mass: f64,
    /// Virtual damping (N·m·s/rad). Must be >= 0.
    pub damping: f64,
    /// Virtual stiffness (N·m/rad). Must be >= 0.
    pub stiffness: f64,
    /// EMA smoothing factor for the torque signal, in [0, 1].
    pub filter_alpha: f64,
}

impl Default for Admittance {
    fn default() -> Self {
        Self {
            mass: 0.001,
            damping: 0.2,
            stiffness: 20.0,
            filter_alpha: 0.1,
        }
    }
}

/// Load-cell geometry and read deadline.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Sensor {
    /// Lever arm from the load cell to the joint axis (m); the sensor
    /// implementation converts reported weight to torque with this.
    pub arm_length_m: f64,
    /// Max wait per raw read (ms). A miss is treated like a bad frame.
    pub read_timeout_ms: u64,
}

impl Default for Sensor {
    fn default() -> Self {
        Self {
            arm_length_m: 0.15,
            read_timeout_ms: 150,
        }
    }
}

/// Tare window taken before the loop starts.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Calibration {
    /// Number of raw samples averaged into the offset.
    pub samples: u32,
    /// Spacing between samples (ms).
    pub interval_ms: u64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            samples: 1000,
            interval_ms: 5,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub device: Device,
    pub control: Control,
    pub admittance: Admittance,
    pub sensor: Sensor,
    pub calibration: Calibration,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    /// Domain checks for everything the control side consumes. Errors name
    /// the offending field so the operator can fix the TOML directly.
    pub fn validate(&self) -> eyre::Result<()> {
        if self.control.frequency_hz == 0 {
            eyre::bail!("control.frequency_hz must be > 0");
        }
        if !(self.control.velocity_limit.is_finite() && self.control.velocity_limit > 0.0) {
            eyre::bail!("control.velocity_limit must be finite and > 0");
        }
        if !(self.control.kd.is_finite() && self.control.kd >= 0.0) {
            eyre::bail!("control.kd must be finite and >= 0");
        }
        if !(self.admittance.mass.is_finite() && self.admittance.mass > 0.0) {
            eyre::bail!("admittance.mass must be finite and > 0");
        }
        if !(self.admittance.damping.is_finite() && self.admittance.damping >= 0.0) {
            eyre::bail!("admittance.damping must be finite and >= 0");
        }
        if !(self.admittance.stiffness.is_finite() && self.admittance.stiffness >= 0.0) {
            eyre::bail!("admittance.stiffness must be finite and >= 0");
        }
        if !(self.admittance.filter_alpha.is_finite()
            && (0.0..=1.0).contains(&self.admittance.filter_alpha))
        {
            eyre::bail!("admittance.filter_alpha must be within [0, 1]");
        }
        if !(self.sensor.arm_length_m.is_finite() && self.sensor.arm_length_m > 0.0) {
            eyre::bail!("sensor.arm_length_m must be finite and > 0");
        }
        if self.sensor.read_timeout_ms == 0 {
            eyre::bail!("sensor.read_timeout_ms must be >= 1");
        }
        if self.calibration.samples == 0 {
            eyre::bail!("calibration.samples must be >= 1");
        }
        Ok(())
    }
}
