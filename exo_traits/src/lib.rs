pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Joint state snapshot produced by the actuator once per control tick.
///
/// The control side treats this as read-only; `current` is informational
/// (thermal monitoring, logging) and never feeds the control law.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JointState {
    /// Joint angle in radians, relative to the zeroed position.
    pub position: f64,
    /// Joint angular velocity in rad/s.
    pub velocity: f64,
    /// Phase current in amperes.
    pub current: f64,
}

/// Torque sensor seam (load cell behind a serial link, or a simulation).
///
/// `read_raw` blocks up to `timeout` for one sample in newton-metres.
/// Implementations report malformed frames and I/O failures through the
/// boxed error; the control side classifies them.
pub trait TorqueSensor {
    fn read_raw(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>>;
}

/// Motor actuator seam (CAN motor driver, or a simulation).
///
/// The control loop owns the actuator exclusively for a session:
/// `connect` / `zero_position` / `set_velocity_gains` run once at startup,
/// `read_state` and `command_velocity` run once per tick, `disconnect`
/// runs unconditionally at teardown.
pub trait Actuator {
    /// Establish the link. `Ok(false)` means the transport is up but the
    /// motor did not respond.
    fn connect(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
    /// Define the current mechanical position as zero.
    fn zero_position(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    /// Configure the velocity-mode damping gain.
    fn set_velocity_gains(
        &mut self,
        kd: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn read_state(&mut self) -> Result<JointState, Box<dyn std::error::Error + Send + Sync>>;
    fn command_velocity(
        &mut self,
        velocity: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn disconnect(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
